use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::camera::Camera;
use crate::capture::{
    CaptureController, CaptureError, CaptureSize, FrameRenderer, FrameStep, ReadbackImage,
};
use crate::clock::{BoxedTimeSource, FrameClock, FrameTime, SystemTimeSource};
use crate::gpu::{FrameError, GpuState};
use crate::input::{Action, Command, InputDispatcher, InputEvent, InputQueue};
use crate::types::{PolygonFill, RendererConfig, RunPolicy};

/// The part of the application a capture renders through: GPU state plus the
/// clock that every rendered frame, on-screen or not, advances.
struct Stage {
    gpu: GpuState,
    clock: FrameClock,
    time_source: BoxedTimeSource,
}

impl Stage {
    fn next_frame(&mut self, step: FrameStep) -> FrameTime {
        let now = self.time_source.now_millis();
        match step {
            FrameStep::Live => self.clock.tick(now),
            FrameStep::Fixed(step) => self.clock.step(now, step),
        }
    }
}

impl FrameRenderer for Stage {
    fn render_offscreen(
        &mut self,
        camera: &Camera,
        size: CaptureSize,
        step: FrameStep,
    ) -> Result<ReadbackImage, CaptureError> {
        let frame = self.next_frame(step);
        Ok(self.gpu.render_offscreen(camera, size, &frame)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopControl {
    Continue,
    Exit,
}

/// Everything the event loop drives: window, stage, camera, input and captures.
struct Application {
    window: Arc<Window>,
    stage: Stage,
    camera: Camera,
    capture: CaptureController,
    queue: InputQueue,
    dispatcher: InputDispatcher,
    run: RunPolicy,
    presented_frames: u64,
}

impl Application {
    fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let size = window.inner_size();
        let gpu = GpuState::new(window.clone(), size, config)?;
        let size = gpu.size();

        let mut time_source: BoxedTimeSource = Box::new(SystemTimeSource::new());
        let clock = FrameClock::with_stall_threshold(time_source.now_millis(), config.stall_threshold);
        let camera = Camera::new(
            size.width as f32 / size.height.max(1) as f32,
            config.fov_y_degrees.to_radians(),
        )
        .with_distance(config.camera_distance);

        Ok(Self {
            window,
            stage: Stage {
                gpu,
                clock,
                time_source,
            },
            camera,
            capture: CaptureController::new(config.capture.clone()),
            queue: InputQueue::new(),
            dispatcher: InputDispatcher::new(config.bindings.clone()),
            run: config.run,
            presented_frames: 0,
        })
    }

    fn queue_event(&mut self, event: &WindowEvent) {
        if let Some(input) = InputEvent::from_window_event(event) {
            self.queue.push(input);
        }
    }

    /// Drains input queued since the last frame, renders, presents, and runs
    /// a scripted capture once the first frame is on screen.
    fn redraw(&mut self) -> Result<LoopControl> {
        self.process_input()?;

        let frame = self.stage.next_frame(FrameStep::Live);
        match self.stage.gpu.render_to_surface(&self.camera, &frame) {
            Ok(()) => self.presented_frames += 1,
            Err(FrameError::Surface(err)) => match err {
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                    tracing::debug!(error = ?err, "surface stale; reconfiguring");
                    self.stage.gpu.recover_surface();
                }
                wgpu::SurfaceError::OutOfMemory => {
                    return Err(anyhow!("surface out of memory"));
                }
                wgpu::SurfaceError::Timeout => {
                    tracing::warn!("surface timeout; retrying next frame");
                }
                other => {
                    tracing::warn!(error = ?other, "surface error; retrying next frame");
                }
            },
            Err(FrameError::Gpu(err)) => return Err(err).context("frame rejected by the GPU"),
        }

        if self.presented_frames == 1 {
            match self.run {
                RunPolicy::Interactive => {}
                RunPolicy::Screenshot => {
                    self.run_command(Command::Screenshot)?;
                    return Ok(LoopControl::Exit);
                }
                RunPolicy::Video => {
                    self.run_command(Command::CaptureVideo)?;
                    return Ok(LoopControl::Exit);
                }
            }
        }
        Ok(LoopControl::Continue)
    }

    fn process_input(&mut self) -> Result<()> {
        let actions: Vec<Action> = self
            .queue
            .drain()
            .filter_map(|event| self.dispatcher.dispatch(event))
            .collect();
        for action in actions {
            self.apply(action)?;
        }
        Ok(())
    }

    fn apply(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Command(command) => self.run_command(command)?,
            Action::Rotate { dx, dy } => self.camera.rotate(dx, dy),
            Action::Zoom { zoom_in } => self.camera.zoom(zoom_in),
            Action::Resize { width, height } => {
                self.stage.gpu.resize(PhysicalSize::new(width, height));
                let size = self.stage.gpu.size();
                self.camera
                    .set_aspect_ratio(size.width as f32 / size.height.max(1) as f32);
            }
        }
        Ok(())
    }

    fn run_command(&mut self, command: Command) -> Result<()> {
        match command {
            Command::ToggleWireframe => self.toggle_polygon_fill(PolygonFill::Wireframe),
            Command::TogglePoints => self.toggle_polygon_fill(PolygonFill::Points),
            Command::TogglePause => {
                let paused = self.stage.clock.toggle_pause();
                tracing::info!(paused, "pause toggled");
            }
            Command::Screenshot => {
                let path = self
                    .capture
                    .screenshot(&mut self.stage, &mut self.camera)
                    .context("screenshot failed")?;
                tracing::info!(path = %path.display(), "screenshot saved");
            }
            Command::CaptureVideo => {
                let frames = self
                    .capture
                    .record_video(&mut self.stage, &mut self.camera)
                    .context("video capture failed")?;
                tracing::info!(
                    dir = %self.capture.settings().video_dir.display(),
                    frames = frames.len(),
                    "video frames saved"
                );
            }
        }
        Ok(())
    }

    fn toggle_polygon_fill(&mut self, mode: PolygonFill) {
        let next = self.stage.gpu.polygon_fill().toggle(mode);
        self.stage.gpu.set_polygon_fill(next);
    }
}

/// Opens the viewer window and drives the `winit` event loop until the window
/// closes, a scripted capture finishes, or a fatal error occurs.
pub(crate) fn run(config: &RendererConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to initialise event loop")?;
    let (width, height) = config.window_size;
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(width, height))
        .build(&event_loop)
        .context("failed to create viewer window")?;
    let window = Arc::new(window);

    let mut app = Application::new(window, config)?;
    app.window.request_redraw();

    let mut fatal: Option<anyhow::Error> = None;
    event_loop
        .run(|event, elwt| {
            if elwt.exiting() {
                return;
            }
            elwt.set_control_flow(ControlFlow::Wait);

            match event {
                Event::WindowEvent { window_id, event } if window_id == app.window.id() => {
                    match event {
                        WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                            elwt.exit();
                        }
                        WindowEvent::RedrawRequested => match app.redraw() {
                            Ok(LoopControl::Continue) => {}
                            Ok(LoopControl::Exit) => elwt.exit(),
                            Err(err) => {
                                tracing::error!(error = %format!("{err:#}"), "stopping viewer");
                                fatal = Some(err);
                                elwt.exit();
                            }
                        },
                        other => app.queue_event(&other),
                    }
                }
                Event::AboutToWait => {
                    app.window.request_redraw();
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))?;

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
