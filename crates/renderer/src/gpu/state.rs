use std::sync::Arc;

use anyhow::{Context, Result};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::camera::Camera;
use crate::capture::{CaptureSize, ReadbackImage};
use crate::clock::FrameTime;
use crate::types::{PolygonFill, RendererConfig};

use super::context::GpuContext;
use super::error::{ErrorScope, GpuError};
use super::pipeline::{cube_mesh, PipelineLayouts, ScenePipelines};
use super::readback::read_texture;
use super::targets::{FrameAttachments, OffscreenTarget};
use super::uniforms::SceneUniforms;
use super::upload::{load_cubemap, load_texture_2d, placeholder_texture, GpuTexture};

/// Background colour when no skybox is configured.
const CLEAR_COLOR: wgpu::Color = wgpu::Color::WHITE;

/// Why an on-screen frame was not presented.
#[derive(Debug, thiserror::Error)]
pub(crate) enum FrameError {
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// A texture kept alive next to the bind group that references it.
struct BoundTexture {
    _texture: GpuTexture,
    bind_group: wgpu::BindGroup,
}

/// Owns every GPU resource of the viewer: device, surface, pipelines, scene
/// buffers, textures and the window-sized attachments.
pub(crate) struct GpuState {
    context: GpuContext,
    pipelines: ScenePipelines,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    mesh_texture: BoundTexture,
    skybox: Option<BoundTexture>,
    attachments: FrameAttachments,
    polygon_fill: PolygonFill,
}

impl GpuState {
    pub(crate) fn new(
        window: Arc<Window>,
        size: PhysicalSize<u32>,
        config: &RendererConfig,
    ) -> Result<Self> {
        let context = GpuContext::new(window, size, config.antialiasing, config.vsync)?;
        let device = &context.device;
        let queue = &context.queue;

        let scope = ErrorScope::push(device);

        let layouts = PipelineLayouts::new(device);
        let pipelines = ScenePipelines::new(
            device,
            &layouts,
            context.surface_format,
            context.sample_count,
            context.polygon_support,
        );

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene uniforms"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene uniform bind group"),
            layout: &layouts.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let (vertices, indices) = cube_mesh();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cube vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cube indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let texture = match &config.scene.texture {
            Some(path) => load_texture_2d(device, queue, path)
                .with_context(|| format!("failed to load texture {}", path.display()))?,
            None => {
                tracing::info!("no texture configured; using white placeholder");
                placeholder_texture(device, queue)
            }
        };
        let mesh_texture = BoundTexture {
            bind_group: layouts.texture_bind_group(device, &texture, false),
            _texture: texture,
        };

        let skybox = match &config.scene.skybox {
            Some(faces) => {
                let texture =
                    load_cubemap(device, queue, faces).context("failed to load skybox")?;
                Some(BoundTexture {
                    bind_group: layouts.texture_bind_group(device, &texture, true),
                    _texture: texture,
                })
            }
            None => {
                tracing::info!("no skybox configured; clearing to white");
                None
            }
        };

        let attachments = FrameAttachments::new(
            device,
            context.surface_format,
            context.size,
            context.sample_count,
        );

        scope
            .finish()
            .context("GPU rejected scene resources during start-up")?;

        tracing::info!(
            adapter = %context.adapter_name,
            format = ?context.surface_format,
            sample_count = context.sample_count,
            width = context.size.width,
            height = context.size.height,
            "renderer ready"
        );

        Ok(Self {
            context,
            pipelines,
            uniform_buffer,
            uniform_bind_group,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            mesh_texture,
            skybox,
            attachments,
            polygon_fill: PolygonFill::Fill,
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        let max = self.context.max_texture_dimension;
        let clamped = PhysicalSize::new(new_size.width.min(max), new_size.height.min(max));
        self.context.resize(clamped);
        self.attachments = FrameAttachments::new(
            &self.context.device,
            self.context.surface_format,
            clamped,
            self.context.sample_count,
        );
    }

    /// Reconfigures the surface after it was lost or went stale.
    pub(crate) fn recover_surface(&mut self) {
        self.context.reconfigure();
    }

    pub(crate) fn polygon_fill(&self) -> PolygonFill {
        self.polygon_fill
    }

    /// Applies `fill` if the device supports it and returns the mode now active.
    pub(crate) fn set_polygon_fill(&mut self, fill: PolygonFill) -> PolygonFill {
        if self.pipelines.supports(fill) {
            self.polygon_fill = fill;
            tracing::info!(mode = ?fill, "polygon mode changed");
        } else {
            tracing::warn!(
                mode = ?fill,
                "polygon mode not supported by this device; keeping {:?}",
                self.polygon_fill
            );
        }
        self.polygon_fill
    }

    /// Draws one frame to the window surface and presents it.
    pub(crate) fn render_to_surface(
        &mut self,
        camera: &Camera,
        frame: &FrameTime,
    ) -> Result<(), FrameError> {
        let output = self.context.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let scope = ErrorScope::push(&self.context.device);
        self.write_uniforms(camera, frame);
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });
        self.encode_scene(&mut encoder, &view, &self.attachments);
        self.context.queue.submit(std::iter::once(encoder.finish()));
        scope.finish()?;

        output.present();
        Ok(())
    }

    /// Draws one frame into a transient target of `size` and reads it back.
    ///
    /// The target lives only for this call; it is destroyed on every path out.
    pub(crate) fn render_offscreen(
        &mut self,
        camera: &Camera,
        size: CaptureSize,
        frame: &FrameTime,
    ) -> Result<ReadbackImage, GpuError> {
        let max = self.context.max_texture_dimension;
        if size.width > max || size.height > max {
            return Err(GpuError::Validation(format!(
                "capture size {}x{} exceeds device limit {max}",
                size.width, size.height
            )));
        }

        let scope = ErrorScope::push(&self.context.device);
        let target = OffscreenTarget::new(
            &self.context.device,
            self.context.surface_format,
            PhysicalSize::new(size.width, size.height),
            self.context.sample_count,
        );
        self.write_uniforms(camera, frame);
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("capture encoder"),
                });
        self.encode_scene(&mut encoder, &target.color_view, &target.attachments);
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let readback = read_texture(&self.context.device, &self.context.queue, &target.color);
        drop(target);
        scope.finish()?;
        readback
    }

    fn write_uniforms(&self, camera: &Camera, frame: &FrameTime) {
        let uniforms = SceneUniforms::new(camera, frame);
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Skybox first with depth writes off, then the cube.
    fn encode_scene(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        attachments: &FrameAttachments,
    ) {
        let (view, resolve_target) = attachments.color_views(target);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &attachments.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        pass.set_bind_group(0, &self.uniform_bind_group, &[]);

        if let Some(skybox) = &self.skybox {
            pass.set_pipeline(&self.pipelines.skybox);
            pass.set_bind_group(1, &skybox.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        pass.set_pipeline(self.pipelines.mesh(self.polygon_fill));
        pass.set_bind_group(1, &self.mesh_texture.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}
