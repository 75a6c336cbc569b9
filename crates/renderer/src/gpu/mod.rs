//! GPU side of the viewer.
//!
//! - `context` owns the wgpu instance/adapter/device/surface wiring, picks the
//!   surface format, MSAA sample count and optional polygon-mode features.
//! - `targets` holds the window-sized attachments and the single-use
//!   offscreen target used by captures.
//! - `pipeline` builds the skybox pipeline and one cube pipeline per
//!   supported polygon mode.
//! - `upload` executes texture upload plans; `readback` copies a target back
//!   to the CPU.
//! - `error` wraps wgpu error scopes so every frame and capture can fail
//!   loudly instead of through the uncaptured-error handler.
//! - `state` glues everything together behind `GpuState`.

mod context;
mod error;
mod pipeline;
mod readback;
mod state;
mod targets;
mod uniforms;
mod upload;

pub use error::GpuError;
pub(crate) use state::{FrameError, GpuState};
