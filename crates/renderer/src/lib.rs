//! Renderer crate for Skyview, a small interactive 3D viewer.
//!
//! The crate opens a window, draws a cubemap skybox behind a textured spinning
//! cube, and can capture the scene to PNG at a fixed resolution. The overall
//! flow is:
//!
//! ```text
//!   skyview CLI
//!        │ RendererConfig
//!        ▼
//!   Renderer::run ──▶ Application ──▶ winit event loop
//!                        │   ▲                │
//!          InputQueue ◀──┘   │                └─▶ redraw()
//!                            │                      ├─▶ FrameClock::tick
//!                            │                      ├─▶ GpuState::render_to_surface
//!                            └── CaptureController ◀┘   (screenshot / video)
//! ```
//!
//! `Application` owns the window, GPU state, camera, clock, input queue and
//! capture controller. Input is queued as it arrives and drained once per
//! frame; captures render offscreen and never disturb the live view.

pub mod camera;
pub mod capture;
pub mod clock;
mod compile;
mod gpu;
pub mod input;
pub mod texture;
mod types;
mod window;

use anyhow::Result;

pub use camera::{AspectOverride, Camera};
pub use capture::{
    CaptureController, CaptureError, CaptureSettings, CaptureSize, FrameRenderer, FrameStep,
    PixelLayout, ReadbackImage, RowOrigin,
};
pub use clock::{FrameClock, FrameTime, ManualTimeSource, SystemTimeSource, TimeSource};
pub use gpu::GpuError;
pub use input::{
    parse_key_name, Action, Binding, BindingTable, Command, InputDispatcher, InputEvent,
    InputQueue, KeyState,
};
pub use texture::{CubeFace, CubemapFaces, DecodedImage, TextureError};
pub use types::{Antialiasing, PolygonFill, RendererConfig, RunPolicy, SceneAssets};

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Opens the viewer window and blocks until it closes.
    ///
    /// Returns an error if start-up fails (no adapter, unreadable assets) or
    /// if a frame or capture fails while running.
    pub fn run(&mut self) -> Result<()> {
        tracing::info!(
            title = %self.config.title,
            width = self.config.window_size.0,
            height = self.config.window_size.1,
            run = ?self.config.run,
            "starting viewer"
        );
        window::run(&self.config)
    }
}
