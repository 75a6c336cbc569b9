//! Input plumbing: window events are queued as they arrive and drained once per
//! frame through a [`BindingTable`], so no command ever runs inside a callback.

use std::collections::{HashMap, VecDeque};

use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Viewer commands that can be bound to keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    ToggleWireframe,
    TogglePoints,
    Screenshot,
    CaptureVideo,
    TogglePause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key {
        code: KeyCode,
        state: KeyState,
        repeat: bool,
    },
    CursorMoved {
        x: f64,
        y: f64,
    },
    MouseButton {
        button: MouseButton,
        pressed: bool,
    },
    /// Vertical scroll; positive values scroll up.
    Scroll {
        dy: f64,
    },
    Resized {
        width: u32,
        height: u32,
    },
}

impl InputEvent {
    pub fn from_window_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(code) => Some(Self::Key {
                    code,
                    state: match event.state {
                        ElementState::Pressed => KeyState::Pressed,
                        ElementState::Released => KeyState::Released,
                    },
                    repeat: event.repeat,
                }),
                PhysicalKey::Unidentified(_) => None,
            },
            WindowEvent::CursorMoved { position, .. } => Some(Self::CursorMoved {
                x: position.x,
                y: position.y,
            }),
            WindowEvent::MouseInput { state, button, .. } => Some(Self::MouseButton {
                button: *button,
                pressed: *state == ElementState::Pressed,
            }),
            WindowEvent::MouseWheel { delta, .. } => {
                let dy = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y as f64,
                    MouseScrollDelta::PixelDelta(position) => position.y,
                };
                Some(Self::Scroll { dy })
            }
            WindowEvent::Resized(size) => Some(Self::Resized {
                width: size.width,
                height: size.height,
            }),
            _ => None,
        }
    }
}

/// What the application should do in response to one input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Command(Command),
    Rotate { dx: f64, dy: f64 },
    Zoom { zoom_in: bool },
    Resize { width: u32, height: u32 },
}

#[derive(Debug, Default)]
pub struct InputQueue {
    events: VecDeque<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = InputEvent> + '_ {
        self.events.drain(..)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub key: KeyCode,
    pub on: KeyState,
    pub command: Command,
}

#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    bindings: HashMap<(KeyCode, KeyState), Command>,
}

impl BindingTable {
    pub fn new(bindings: impl IntoIterator<Item = Binding>) -> Self {
        let bindings = bindings
            .into_iter()
            .map(|binding| ((binding.key, binding.on), binding.command))
            .collect();
        Self { bindings }
    }

    /// W/P toggle on press; S, V and Space fire on release.
    pub fn defaults() -> Self {
        Self::new([
            Binding {
                key: KeyCode::KeyW,
                on: KeyState::Pressed,
                command: Command::ToggleWireframe,
            },
            Binding {
                key: KeyCode::KeyP,
                on: KeyState::Pressed,
                command: Command::TogglePoints,
            },
            Binding {
                key: KeyCode::KeyS,
                on: KeyState::Released,
                command: Command::Screenshot,
            },
            Binding {
                key: KeyCode::KeyV,
                on: KeyState::Released,
                command: Command::CaptureVideo,
            },
            Binding {
                key: KeyCode::Space,
                on: KeyState::Released,
                command: Command::TogglePause,
            },
        ])
    }

    pub fn lookup(&self, key: KeyCode, state: KeyState) -> Option<Command> {
        self.bindings.get(&(key, state)).copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[derive(Debug, Default)]
struct DragState {
    position: Option<(f64, f64)>,
    left_pressed: bool,
}

/// Turns raw input events into [`Action`]s using the binding table and drag state.
#[derive(Debug)]
pub struct InputDispatcher {
    bindings: BindingTable,
    drag: DragState,
}

impl InputDispatcher {
    pub fn new(bindings: BindingTable) -> Self {
        Self {
            bindings,
            drag: DragState::default(),
        }
    }

    pub fn dispatch(&mut self, event: InputEvent) -> Option<Action> {
        match event {
            InputEvent::Key {
                code,
                state,
                repeat,
            } => {
                if repeat {
                    return None;
                }
                self.bindings.lookup(code, state).map(Action::Command)
            }
            InputEvent::CursorMoved { x, y } => {
                let previous = self.drag.position.replace((x, y));
                match previous {
                    Some((px, py)) if self.drag.left_pressed => Some(Action::Rotate {
                        dx: x - px,
                        dy: y - py,
                    }),
                    _ => None,
                }
            }
            InputEvent::MouseButton { button, pressed } => {
                if button == MouseButton::Left {
                    self.drag.left_pressed = pressed;
                }
                None
            }
            InputEvent::Scroll { dy } => {
                if dy == 0.0 {
                    None
                } else {
                    Some(Action::Zoom { zoom_in: dy > 0.0 })
                }
            }
            InputEvent::Resized { width, height } => {
                if width == 0 || height == 0 {
                    None
                } else {
                    Some(Action::Resize { width, height })
                }
            }
        }
    }
}

/// Maps a human key name (`"W"`, `"Space"`, `"F5"`, `"Left"`) to a physical key code.
pub fn parse_key_name(name: &str) -> Option<KeyCode> {
    let trimmed = name.trim();
    let mut chars = trimmed.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        return single_char_key(ch.to_ascii_uppercase());
    }

    let normalized = trimmed.to_ascii_lowercase();
    let code = match normalized.as_str() {
        "space" => KeyCode::Space,
        "enter" | "return" => KeyCode::Enter,
        "escape" | "esc" => KeyCode::Escape,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "left" => KeyCode::ArrowLeft,
        "right" => KeyCode::ArrowRight,
        "up" => KeyCode::ArrowUp,
        "down" => KeyCode::ArrowDown,
        "f1" => KeyCode::F1,
        "f2" => KeyCode::F2,
        "f3" => KeyCode::F3,
        "f4" => KeyCode::F4,
        "f5" => KeyCode::F5,
        "f6" => KeyCode::F6,
        "f7" => KeyCode::F7,
        "f8" => KeyCode::F8,
        "f9" => KeyCode::F9,
        "f10" => KeyCode::F10,
        "f11" => KeyCode::F11,
        "f12" => KeyCode::F12,
        _ => return None,
    };
    Some(code)
}

fn single_char_key(ch: char) -> Option<KeyCode> {
    let code = match ch {
        'A' => KeyCode::KeyA,
        'B' => KeyCode::KeyB,
        'C' => KeyCode::KeyC,
        'D' => KeyCode::KeyD,
        'E' => KeyCode::KeyE,
        'F' => KeyCode::KeyF,
        'G' => KeyCode::KeyG,
        'H' => KeyCode::KeyH,
        'I' => KeyCode::KeyI,
        'J' => KeyCode::KeyJ,
        'K' => KeyCode::KeyK,
        'L' => KeyCode::KeyL,
        'M' => KeyCode::KeyM,
        'N' => KeyCode::KeyN,
        'O' => KeyCode::KeyO,
        'P' => KeyCode::KeyP,
        'Q' => KeyCode::KeyQ,
        'R' => KeyCode::KeyR,
        'S' => KeyCode::KeyS,
        'T' => KeyCode::KeyT,
        'U' => KeyCode::KeyU,
        'V' => KeyCode::KeyV,
        'W' => KeyCode::KeyW,
        'X' => KeyCode::KeyX,
        'Y' => KeyCode::KeyY,
        'Z' => KeyCode::KeyZ,
        '0' => KeyCode::Digit0,
        '1' => KeyCode::Digit1,
        '2' => KeyCode::Digit2,
        '3' => KeyCode::Digit3,
        '4' => KeyCode::Digit4,
        '5' => KeyCode::Digit5,
        '6' => KeyCode::Digit6,
        '7' => KeyCode::Digit7,
        '8' => KeyCode::Digit8,
        '9' => KeyCode::Digit9,
        ' ' => KeyCode::Space,
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, state: KeyState) -> InputEvent {
        InputEvent::Key {
            code,
            state,
            repeat: false,
        }
    }

    #[test]
    fn default_bindings_produce_all_commands() {
        let mut dispatcher = InputDispatcher::new(BindingTable::defaults());
        let cases = [
            (KeyCode::KeyW, KeyState::Pressed, Command::ToggleWireframe),
            (KeyCode::KeyP, KeyState::Pressed, Command::TogglePoints),
            (KeyCode::KeyS, KeyState::Released, Command::Screenshot),
            (KeyCode::KeyV, KeyState::Released, Command::CaptureVideo),
            (KeyCode::Space, KeyState::Released, Command::TogglePause),
        ];
        for (code, state, command) in cases {
            assert_eq!(
                dispatcher.dispatch(key(code, state)),
                Some(Action::Command(command))
            );
        }
    }

    #[test]
    fn screenshot_fires_on_release_only() {
        let mut dispatcher = InputDispatcher::new(BindingTable::defaults());
        assert_eq!(dispatcher.dispatch(key(KeyCode::KeyS, KeyState::Pressed)), None);
        assert!(dispatcher
            .dispatch(key(KeyCode::KeyS, KeyState::Released))
            .is_some());
    }

    #[test]
    fn repeats_are_ignored() {
        let mut dispatcher = InputDispatcher::new(BindingTable::defaults());
        let event = InputEvent::Key {
            code: KeyCode::KeyW,
            state: KeyState::Pressed,
            repeat: true,
        };
        assert_eq!(dispatcher.dispatch(event), None);
    }

    #[test]
    fn drag_rotates_only_while_left_button_held() {
        let mut dispatcher = InputDispatcher::new(BindingTable::defaults());
        assert_eq!(
            dispatcher.dispatch(InputEvent::CursorMoved { x: 10.0, y: 10.0 }),
            None
        );
        assert_eq!(
            dispatcher.dispatch(InputEvent::CursorMoved { x: 20.0, y: 5.0 }),
            None
        );
        dispatcher.dispatch(InputEvent::MouseButton {
            button: MouseButton::Left,
            pressed: true,
        });
        assert_eq!(
            dispatcher.dispatch(InputEvent::CursorMoved { x: 25.0, y: 9.0 }),
            Some(Action::Rotate { dx: 5.0, dy: 4.0 })
        );
        dispatcher.dispatch(InputEvent::MouseButton {
            button: MouseButton::Left,
            pressed: false,
        });
        assert_eq!(
            dispatcher.dispatch(InputEvent::CursorMoved { x: 30.0, y: 9.0 }),
            None
        );
    }

    #[test]
    fn scroll_and_resize_map_to_actions() {
        let mut dispatcher = InputDispatcher::new(BindingTable::default());
        assert_eq!(
            dispatcher.dispatch(InputEvent::Scroll { dy: 1.0 }),
            Some(Action::Zoom { zoom_in: true })
        );
        assert_eq!(
            dispatcher.dispatch(InputEvent::Scroll { dy: -2.5 }),
            Some(Action::Zoom { zoom_in: false })
        );
        assert_eq!(dispatcher.dispatch(InputEvent::Scroll { dy: 0.0 }), None);
        assert_eq!(
            dispatcher.dispatch(InputEvent::Resized {
                width: 0,
                height: 600
            }),
            None
        );
        assert_eq!(
            dispatcher.dispatch(InputEvent::Resized {
                width: 1024,
                height: 768
            }),
            Some(Action::Resize {
                width: 1024,
                height: 768
            })
        );
    }

    #[test]
    fn custom_table_replaces_defaults() {
        let table = BindingTable::new([Binding {
            key: KeyCode::KeyF,
            on: KeyState::Pressed,
            command: Command::ToggleWireframe,
        }]);
        let mut dispatcher = InputDispatcher::new(table);
        assert_eq!(dispatcher.dispatch(key(KeyCode::KeyW, KeyState::Pressed)), None);
        assert_eq!(
            dispatcher.dispatch(key(KeyCode::KeyF, KeyState::Pressed)),
            Some(Action::Command(Command::ToggleWireframe))
        );
    }

    #[test]
    fn queue_drains_in_arrival_order() {
        let mut queue = InputQueue::new();
        queue.push(InputEvent::Scroll { dy: 1.0 });
        queue.push(InputEvent::Scroll { dy: -1.0 });
        let drained: Vec<_> = queue.drain().collect();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0], InputEvent::Scroll { dy: 1.0 });
        assert_eq!(queue.drain().count(), 0);
    }

    #[test]
    fn parses_key_names() {
        assert_eq!(parse_key_name("w"), Some(KeyCode::KeyW));
        assert_eq!(parse_key_name("Space"), Some(KeyCode::Space));
        assert_eq!(parse_key_name("F12"), Some(KeyCode::F12));
        assert_eq!(parse_key_name("7"), Some(KeyCode::Digit7));
        assert_eq!(parse_key_name("hyper"), None);
    }
}
