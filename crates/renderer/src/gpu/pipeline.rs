use bytemuck::{Pod, Zeroable};

use crate::compile::{compile_mesh_shaders, compile_skybox_shaders};
use crate::types::PolygonFill;

use super::context::PolygonModeSupport;
use super::targets::DEPTH_FORMAT;
use super::upload::GpuTexture;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Unit cube centred on the origin, four vertices per face, counter-clockwise
/// when seen from outside.
pub(crate) fn cube_mesh() -> (Vec<MeshVertex>, Vec<u16>) {
    // (normal, u, v) with u x v == normal.
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
    ];
    const CORNERS: [(f32, f32, [f32; 2]); 4] = [
        (-1.0, -1.0, [0.0, 1.0]),
        (1.0, -1.0, [1.0, 1.0]),
        (1.0, 1.0, [1.0, 0.0]),
        (-1.0, 1.0, [0.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (face, (normal, u, v)) in FACES.iter().enumerate() {
        for (su, sv, uv) in CORNERS {
            let position = [0, 1, 2].map(|axis| 0.5 * (normal[axis] + su * u[axis] + sv * v[axis]));
            vertices.push(MeshVertex {
                position,
                normal: *normal,
                uv,
            });
        }
        let base = (face * 4) as u16;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

pub(crate) struct PipelineLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub texture_2d_layout: wgpu::BindGroupLayout,
    pub cubemap_layout: wgpu::BindGroupLayout,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let texture_2d_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture 2d layout"),
            entries: &texture_layout_entries(wgpu::TextureViewDimension::D2),
        });
        let cubemap_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("cubemap layout"),
            entries: &texture_layout_entries(wgpu::TextureViewDimension::Cube),
        });
        Self {
            uniform_layout,
            texture_2d_layout,
            cubemap_layout,
        }
    }

    pub fn texture_bind_group(
        &self,
        device: &wgpu::Device,
        texture: &GpuTexture,
        cube: bool,
    ) -> wgpu::BindGroup {
        let layout = if cube {
            &self.cubemap_layout
        } else {
            &self.texture_2d_layout
        };
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(if cube {
                "cubemap bind group"
            } else {
                "texture 2d bind group"
            }),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        })
    }
}

fn texture_layout_entries(dimension: wgpu::TextureViewDimension) -> [wgpu::BindGroupLayoutEntry; 2] {
    [
        wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: dimension,
                multisampled: false,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        },
    ]
}

/// Skybox pipeline plus one mesh pipeline per supported polygon mode.
pub(crate) struct ScenePipelines {
    pub skybox: wgpu::RenderPipeline,
    mesh_fill: wgpu::RenderPipeline,
    mesh_wireframe: Option<wgpu::RenderPipeline>,
    mesh_points: Option<wgpu::RenderPipeline>,
}

impl ScenePipelines {
    pub fn new(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        format: wgpu::TextureFormat,
        sample_count: u32,
        polygon_support: PolygonModeSupport,
    ) -> Self {
        let skybox_shaders = compile_skybox_shaders(device);
        let skybox_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("skybox pipeline layout"),
            bind_group_layouts: &[&layouts.uniform_layout, &layouts.cubemap_layout],
            push_constant_ranges: &[],
        });
        let skybox = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("skybox pipeline"),
            layout: Some(&skybox_layout),
            vertex: wgpu::VertexState {
                module: &skybox_shaders.vertex,
                entry_point: Some("main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            // Drawn first with depth writes off, so the mesh always lands on top.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: multisample_state(sample_count),
            fragment: Some(wgpu::FragmentState {
                module: &skybox_shaders.fragment,
                entry_point: Some("main"),
                targets: &[Some(color_target(format))],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let mesh_shaders = compile_mesh_shaders(device);
        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mesh pipeline layout"),
            bind_group_layouts: &[&layouts.uniform_layout, &layouts.texture_2d_layout],
            push_constant_ranges: &[],
        });
        let build_mesh = |fill: PolygonFill| {
            let (polygon_mode, cull_mode, label) = match fill {
                PolygonFill::Fill => (wgpu::PolygonMode::Fill, Some(wgpu::Face::Back), "mesh pipeline"),
                PolygonFill::Wireframe => (wgpu::PolygonMode::Line, None, "mesh wireframe pipeline"),
                PolygonFill::Points => (
                    wgpu::PolygonMode::Point,
                    Some(wgpu::Face::Back),
                    "mesh point pipeline",
                ),
            };
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&mesh_layout),
                vertex: wgpu::VertexState {
                    module: &mesh_shaders.vertex,
                    entry_point: Some("main"),
                    buffers: &[MeshVertex::layout()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode,
                    polygon_mode,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: multisample_state(sample_count),
                fragment: Some(wgpu::FragmentState {
                    module: &mesh_shaders.fragment,
                    entry_point: Some("main"),
                    targets: &[Some(color_target(format))],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview: None,
                cache: None,
            })
        };

        let mesh_fill = build_mesh(PolygonFill::Fill);
        let mesh_wireframe = polygon_support
            .line
            .then(|| build_mesh(PolygonFill::Wireframe));
        let mesh_points = polygon_support
            .point
            .then(|| build_mesh(PolygonFill::Points));

        Self {
            skybox,
            mesh_fill,
            mesh_wireframe,
            mesh_points,
        }
    }

    pub fn supports(&self, fill: PolygonFill) -> bool {
        match fill {
            PolygonFill::Fill => true,
            PolygonFill::Wireframe => self.mesh_wireframe.is_some(),
            PolygonFill::Points => self.mesh_points.is_some(),
        }
    }

    /// Falls back to filled rendering when the mode is unsupported.
    pub fn mesh(&self, fill: PolygonFill) -> &wgpu::RenderPipeline {
        match fill {
            PolygonFill::Fill => &self.mesh_fill,
            PolygonFill::Wireframe => self.mesh_wireframe.as_ref().unwrap_or(&self.mesh_fill),
            PolygonFill::Points => self.mesh_points.as_ref().unwrap_or(&self.mesh_fill),
        }
    }
}

fn multisample_state(sample_count: u32) -> wgpu::MultisampleState {
    wgpu::MultisampleState {
        count: sample_count,
        mask: !0,
        alpha_to_coverage_enabled: false,
    }
}

fn color_target(format: wgpu::TextureFormat) -> wgpu::ColorTargetState {
    wgpu::ColorTargetState {
        format,
        blend: Some(wgpu::BlendState::REPLACE),
        write_mask: wgpu::ColorWrites::ALL,
    }
}
