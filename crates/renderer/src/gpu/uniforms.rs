use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};

use crate::camera::Camera;
use crate::clock::FrameTime;

/// Radians per second the cube turns around its tilted axis.
const SPIN_RATE: f32 = 0.6;

/// std140 mirror of the `SceneParams` block shared by every shader.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub sky_inv_view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub light_dir: [f32; 4],
    pub time: [f32; 4],
}

unsafe impl Zeroable for SceneUniforms {}
unsafe impl Pod for SceneUniforms {}

impl SceneUniforms {
    pub fn new(camera: &Camera, frame: &FrameTime) -> Self {
        let light = Vec3::new(-0.4, -1.0, -0.6).normalize();
        Self {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            sky_inv_view_proj: camera.sky_view_projection_matrix().inverse().to_cols_array_2d(),
            model: model_matrix(frame.elapsed_seconds()).to_cols_array_2d(),
            light_dir: [light.x, light.y, light.z, 0.0],
            time: [frame.elapsed_seconds(), frame.delta_seconds(), 0.0, 0.0],
        }
    }
}

/// Spin driven purely by simulation time, so pausing freezes the cube.
pub(crate) fn model_matrix(elapsed_seconds: f32) -> Mat4 {
    let axis = Vec3::new(0.3, 1.0, 0.1).normalize();
    Mat4::from_quat(Quat::from_axis_angle(axis, elapsed_seconds * SPIN_RATE))
}
