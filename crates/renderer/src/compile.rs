use std::borrow::Cow;

use wgpu::naga::ShaderStage;

const SKYBOX_VERTEX_GLSL: &str = include_str!("../shaders/skybox.vert");
const SKYBOX_FRAGMENT_GLSL: &str = include_str!("../shaders/skybox.frag");
const MESH_VERTEX_GLSL: &str = include_str!("../shaders/mesh.vert");
const MESH_FRAGMENT_GLSL: &str = include_str!("../shaders/mesh.frag");

/// Vertex and fragment modules for one pipeline.
pub(crate) struct ShaderPair {
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
}

/// Compiles the full-screen skybox shaders through naga's GLSL frontend.
pub(crate) fn compile_skybox_shaders(device: &wgpu::Device) -> ShaderPair {
    ShaderPair {
        vertex: compile_glsl(device, "skybox vertex", SKYBOX_VERTEX_GLSL, ShaderStage::Vertex),
        fragment: compile_glsl(
            device,
            "skybox fragment",
            SKYBOX_FRAGMENT_GLSL,
            ShaderStage::Fragment,
        ),
    }
}

/// Compiles the lit, textured mesh shaders.
pub(crate) fn compile_mesh_shaders(device: &wgpu::Device) -> ShaderPair {
    ShaderPair {
        vertex: compile_glsl(device, "mesh vertex", MESH_VERTEX_GLSL, ShaderStage::Vertex),
        fragment: compile_glsl(
            device,
            "mesh fragment",
            MESH_FRAGMENT_GLSL,
            ShaderStage::Fragment,
        ),
    }
}

fn compile_glsl(
    device: &wgpu::Device,
    label: &str,
    source: &'static str,
    stage: ShaderStage,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage,
            defines: &[],
        },
    })
}
