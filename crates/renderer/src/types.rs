use std::path::PathBuf;
use std::time::Duration;

use crate::capture::CaptureSettings;
use crate::clock::DEFAULT_STALL_THRESHOLD;
use crate::input::BindingTable;
use crate::texture::CubemapFaces;

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count up to 4x supported by the surface format.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the target.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

/// Rasterisation mode of the cube. The skybox is always filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolygonFill {
    #[default]
    Fill,
    Wireframe,
    Points,
}

impl PolygonFill {
    /// Switches to `mode`, or back to fill if `mode` is already active.
    pub fn toggle(self, mode: PolygonFill) -> PolygonFill {
        if self == mode {
            PolygonFill::Fill
        } else {
            mode
        }
    }
}

/// Image assets drawn by the scene.
#[derive(Debug, Clone, Default)]
pub struct SceneAssets {
    /// Texture applied to the cube; a white placeholder is used when absent.
    pub texture: Option<PathBuf>,
    /// Skybox faces; the background is cleared to white when absent.
    pub skybox: Option<CubemapFaces>,
}

/// What the application does once the window is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPolicy {
    /// Render until the window is closed.
    #[default]
    Interactive,
    /// Write one screenshot after the first presented frame, then exit.
    Screenshot,
    /// Record the configured video frames after the first presented frame, then exit.
    Video,
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub title: String,
    /// Initial window size in physical pixels.
    pub window_size: (u32, u32),
    pub vsync: bool,
    pub antialiasing: Antialiasing,
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    pub camera_distance: f32,
    /// Frame deltas longer than this are treated as a stall and dropped.
    pub stall_threshold: Duration,
    pub capture: CaptureSettings,
    pub scene: SceneAssets,
    pub bindings: BindingTable,
    pub run: RunPolicy,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            title: "Skyview".to_string(),
            window_size: (800, 600),
            vsync: true,
            antialiasing: Antialiasing::default(),
            fov_y_degrees: 50.0,
            camera_distance: 6.0,
            stall_threshold: DEFAULT_STALL_THRESHOLD,
            capture: CaptureSettings::default(),
            scene: SceneAssets::default(),
            bindings: BindingTable::defaults(),
            run: RunPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_the_active_mode_returns_to_fill() {
        let fill = PolygonFill::Fill;
        let wire = fill.toggle(PolygonFill::Wireframe);
        assert_eq!(wire, PolygonFill::Wireframe);
        assert_eq!(wire.toggle(PolygonFill::Wireframe), PolygonFill::Fill);
        assert_eq!(wire.toggle(PolygonFill::Points), PolygonFill::Points);
    }

    #[test]
    fn defaults_match_viewer_constants() {
        let config = RendererConfig::default();
        assert_eq!(config.window_size, (800, 600));
        assert_eq!(config.stall_threshold, Duration::from_millis(200));
        assert_eq!(config.capture.video_frames, 48);
        assert_eq!(config.bindings.len(), 5);
        assert_eq!(config.run, RunPolicy::Interactive);
    }
}
