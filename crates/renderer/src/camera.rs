//! Orbit camera driven by mouse drag and scroll.

use std::ops::{Deref, DerefMut};

use glam::{Mat4, Vec3};

/// Radians of rotation per pixel of mouse drag.
const ROTATE_SPEED: f32 = 0.01;
/// Multiplicative distance change per scroll notch.
const ZOOM_FACTOR: f32 = 1.1;
const MIN_DISTANCE: f32 = 1.5;
const MAX_DISTANCE: f32 = 50.0;
/// Keeps the eye off the poles so `look_at` never degenerates.
const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

#[derive(Debug, Clone)]
pub struct Camera {
    aspect_ratio: f32,
    /// Vertical field of view in radians.
    fov_y: f32,
    near: f32,
    far: f32,
    distance: f32,
    yaw: f32,
    pitch: f32,
    target: Vec3,
}

impl Camera {
    pub fn new(aspect_ratio: f32, fov_y: f32) -> Self {
        Self {
            aspect_ratio,
            fov_y,
            near: 0.1,
            far: 100.0,
            distance: 6.0,
            yaw: 0.0,
            pitch: 0.3,
            target: Vec3::ZERO,
        }
    }

    pub fn with_distance(mut self, distance: f32) -> Self {
        self.distance = distance.clamp(MIN_DISTANCE, MAX_DISTANCE);
        self
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            self.aspect_ratio = aspect_ratio;
        }
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Orbits around the target by a mouse delta in pixels.
    pub fn rotate(&mut self, dx: f64, dy: f64) {
        self.yaw -= dx as f32 * ROTATE_SPEED;
        self.pitch = (self.pitch + dy as f32 * ROTATE_SPEED).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn zoom(&mut self, zoom_in: bool) {
        let distance = if zoom_in {
            self.distance / ZOOM_FACTOR
        } else {
            self.distance * ZOOM_FACTOR
        };
        self.distance = distance.clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn eye(&self) -> Vec3 {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        self.target + self.distance * Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// View-projection with the translation stripped, for drawing the skybox at infinity.
    pub fn sky_view_projection_matrix(&self) -> Mat4 {
        let mut view = self.view_matrix();
        view.w_axis = glam::Vec4::W;
        self.projection_matrix() * view
    }

    /// Temporarily replaces the aspect ratio; the previous value comes back on drop.
    pub fn override_aspect(&mut self, aspect_ratio: f32) -> AspectOverride<'_> {
        let previous = self.aspect_ratio;
        self.set_aspect_ratio(aspect_ratio);
        AspectOverride {
            camera: self,
            previous,
        }
    }
}

/// Scoped aspect-ratio change, restored even when the holder bails out early.
pub struct AspectOverride<'a> {
    camera: &'a mut Camera,
    previous: f32,
}

impl Deref for AspectOverride<'_> {
    type Target = Camera;

    fn deref(&self) -> &Self::Target {
        self.camera
    }
}

impl DerefMut for AspectOverride<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.camera
    }
}

impl Drop for AspectOverride<'_> {
    fn drop(&mut self) {
        self.camera.aspect_ratio = self.previous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_override_restores_on_drop() {
        let mut camera = Camera::new(16.0 / 9.0, 50f32.to_radians());
        {
            let scoped = camera.override_aspect(4.0 / 3.0);
            assert_eq!(scoped.aspect_ratio(), 4.0 / 3.0);
        }
        assert_eq!(camera.aspect_ratio(), 16.0 / 9.0);
    }

    #[test]
    fn aspect_override_restores_after_early_return() {
        fn failing(camera: &mut Camera) -> Result<(), ()> {
            let _scoped = camera.override_aspect(1.0);
            Err(())
        }
        let mut camera = Camera::new(2.0, 1.0);
        assert!(failing(&mut camera).is_err());
        assert_eq!(camera.aspect_ratio(), 2.0);
    }

    #[test]
    fn ignores_degenerate_aspect() {
        let mut camera = Camera::new(1.5, 1.0);
        camera.set_aspect_ratio(0.0);
        camera.set_aspect_ratio(f32::NAN);
        assert_eq!(camera.aspect_ratio(), 1.5);
    }

    #[test]
    fn zoom_moves_eye_and_clamps() {
        let mut camera = Camera::new(1.0, 1.0);
        let start = camera.distance();
        camera.zoom(true);
        assert!(camera.distance() < start);
        for _ in 0..200 {
            camera.zoom(false);
        }
        assert_eq!(camera.distance(), MAX_DISTANCE);
    }

    #[test]
    fn rotate_keeps_distance_and_clamps_pitch() {
        let mut camera = Camera::new(1.0, 1.0);
        camera.rotate(120.0, 10_000.0);
        assert!((camera.eye().length() - camera.distance()).abs() < 1e-4);
        assert!(camera.eye().y < camera.distance());
    }

    #[test]
    fn sky_matrix_ignores_eye_translation() {
        let camera = Camera::new(1.0, 1.0).with_distance(20.0);
        let near = Camera::new(1.0, 1.0).with_distance(2.0);
        let a = camera.sky_view_projection_matrix();
        let b = near.sky_view_projection_matrix();
        assert!(a.abs_diff_eq(b, 1e-5));
    }
}
