use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use renderer::{parse_key_name, Antialiasing, Binding, BindingTable, Command, KeyState};
use viewconfig::{AntialiasSetting, BindingEntry, CommandName, KeyTrigger};

/// Resolves configured key names into a binding table.
///
/// Unknown keys are an error, as are two entries that resolve to the same key
/// and trigger under different spellings (`Enter` and `Return`).
pub fn binding_table(entries: &[BindingEntry]) -> Result<BindingTable> {
    let mut bindings = Vec::with_capacity(entries.len());
    let mut seen = HashMap::new();
    for entry in entries {
        let key = parse_key_name(&entry.key).ok_or_else(|| {
            anyhow!(
                "unknown key '{}' bound to {:?}; use a letter, digit, Space, Enter, Escape, Tab, arrows or F1-F12",
                entry.key,
                entry.command
            )
        })?;
        let on = map_trigger(entry.on);
        if let Some(previous) = seen.insert((key, on), entry.key.as_str()) {
            bail!(
                "key '{}' and '{}' name the same key on {:?}; bind it only once",
                previous,
                entry.key,
                entry.on
            );
        }
        bindings.push(Binding {
            key,
            on,
            command: map_command(entry.command),
        });
    }
    let table = BindingTable::new(bindings);
    tracing::debug!(bindings = table.len(), "resolved key bindings");
    Ok(table)
}

fn map_trigger(trigger: KeyTrigger) -> KeyState {
    match trigger {
        KeyTrigger::Press => KeyState::Pressed,
        KeyTrigger::Release => KeyState::Released,
    }
}

fn map_command(command: CommandName) -> Command {
    match command {
        CommandName::ToggleWireframe => Command::ToggleWireframe,
        CommandName::TogglePoints => Command::TogglePoints,
        CommandName::Screenshot => Command::Screenshot,
        CommandName::CaptureVideo => Command::CaptureVideo,
        CommandName::TogglePause => Command::TogglePause,
    }
}

pub fn map_antialias(setting: AntialiasSetting) -> Antialiasing {
    match setting {
        AntialiasSetting::Auto => Antialiasing::Auto,
        AntialiasSetting::Off => Antialiasing::Off,
        other => match other.samples() {
            Some(samples) if samples > 1 => Antialiasing::Samples(samples),
            _ => Antialiasing::Off,
        },
    }
}
