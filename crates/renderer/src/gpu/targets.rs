use winit::dpi::PhysicalSize;

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

fn extent(size: PhysicalSize<u32>) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width.max(1),
        height: size.height.max(1),
        depth_or_array_layers: 1,
    }
}

pub(crate) struct MultisampleTarget {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl MultisampleTarget {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: extent(size),
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

impl Drop for MultisampleTarget {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}

pub(crate) struct DepthTarget {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl DepthTarget {
    pub fn new(device: &wgpu::Device, size: PhysicalSize<u32>, sample_count: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth target"),
            size: extent(size),
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

impl Drop for DepthTarget {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}

/// Depth plus optional MSAA colour attachments sized to one surface.
pub(crate) struct FrameAttachments {
    pub multisample: Option<MultisampleTarget>,
    pub depth: DepthTarget,
}

impl FrameAttachments {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let multisample = if sample_count > 1 {
            Some(MultisampleTarget::new(device, format, size, sample_count))
        } else {
            None
        };
        Self {
            multisample,
            depth: DepthTarget::new(device, size, sample_count),
        }
    }

    /// Returns the view to render into and the resolve target, if any.
    pub fn color_views<'a>(
        &'a self,
        output: &'a wgpu::TextureView,
    ) -> (&'a wgpu::TextureView, Option<&'a wgpu::TextureView>) {
        match self.multisample.as_ref() {
            Some(msaa) => (&msaa.view, Some(output)),
            None => (output, None),
        }
    }
}

/// Single-use render destination for captures.
///
/// Every texture is destroyed when this is dropped, whether or not the
/// render and readback succeeded.
pub(crate) struct OffscreenTarget {
    pub color: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub attachments: FrameAttachments,
}

impl OffscreenTarget {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("capture color target"),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            color,
            color_view,
            attachments: FrameAttachments::new(device, format, size, sample_count),
        }
    }
}

impl Drop for OffscreenTarget {
    fn drop(&mut self) {
        self.color.destroy();
    }
}
