/// GPU failures surfaced through error scopes or readback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GpuError {
    #[error("GPU validation error: {0}")]
    Validation(String),
    #[error("GPU out of memory: {0}")]
    OutOfMemory(String),
    #[error("internal GPU error: {0}")]
    Internal(String),
    #[error("readback failed: {0}")]
    Readback(String),
}

impl From<wgpu::Error> for GpuError {
    fn from(value: wgpu::Error) -> Self {
        match value {
            wgpu::Error::Validation { description, .. } => Self::Validation(description),
            wgpu::Error::OutOfMemory { source } => Self::OutOfMemory(source.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Captures every validation and out-of-memory error raised between
/// [`ErrorScope::push`] and [`ErrorScope::finish`].
pub(crate) struct ErrorScope<'a> {
    device: &'a wgpu::Device,
}

impl<'a> ErrorScope<'a> {
    pub fn push(device: &'a wgpu::Device) -> Self {
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        Self { device }
    }

    /// Pops both scopes; the first error found wins.
    pub fn finish(self) -> Result<(), GpuError> {
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        match validation.or(out_of_memory) {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}
