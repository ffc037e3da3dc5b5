//! Orbit camera with damping and auto-rotation.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::{Mat4, Vec2, Vec3};

use crate::picking::Ray;

/// Pitch limit that keeps the camera off the poles.
const POLAR_MARGIN: f32 = 0.01;

/// Orbit camera looking at `target`.
///
/// Manual input accumulates rotation and zoom deltas; [`OrbitCamera::update`]
/// applies them once per frame with damping so motion eases out.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    /// World position of the eye.
    pub position: Vec3,
    /// Point the camera orbits around and looks at.
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// Fraction of the pending rotation applied per frame.
    pub damping: f32,
    pub auto_rotate: bool,
    /// Auto-rotation speed; 1.0 is one revolution per minute at 60 fps.
    pub auto_rotate_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    delta_yaw: f32,
    delta_pitch: f32,
    scale: f32,
}

impl OrbitCamera {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            fov_y: 40.0,
            near: 0.1,
            far: 500_000.0,
            damping: 0.05,
            auto_rotate: false,
            auto_rotate_speed: 0.02,
            min_distance: 1.0,
            max_distance: 480_000.0,
            delta_yaw: 0.0,
            delta_pitch: 0.0,
            scale: 1.0,
        }
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping.clamp(0.0, 1.0);
        self
    }

    /// Queue a rotation in radians (drag).
    pub fn rotate(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.delta_yaw -= delta_yaw;
        self.delta_pitch += delta_pitch;
    }

    /// Rotate based on pointer movement in pixels.
    pub fn rotate_by_pixels(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let per_pixel = TAU / viewport_height.max(1.0);
        self.rotate(dx * per_pixel, dy * per_pixel);
    }

    /// Queue a dolly step. Positive `delta` moves closer.
    pub fn zoom(&mut self, delta: f32) {
        let step = 0.95_f32.powf(delta.abs());
        if delta > 0.0 {
            self.scale *= step;
        } else if delta < 0.0 {
            self.scale /= step;
        }
    }

    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }

    /// Whether queued manual motion is still settling.
    pub fn is_settling(&self) -> bool {
        self.delta_yaw.abs() > 1e-5 || self.delta_pitch.abs() > 1e-5 || (self.scale - 1.0).abs() > 1e-6
    }

    /// Apply queued input, damping and auto-rotation. Call once per frame.
    pub fn update(&mut self) {
        let offset = self.position - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return;
        }

        let mut yaw = offset.x.atan2(offset.z);
        let mut pitch = (offset.y / radius).clamp(-1.0, 1.0).asin();

        if self.auto_rotate {
            yaw -= TAU / 60.0 / 60.0 * self.auto_rotate_speed;
        }

        yaw += self.delta_yaw * self.damping;
        pitch += self.delta_pitch * self.damping;
        self.delta_yaw *= 1.0 - self.damping;
        self.delta_pitch *= 1.0 - self.damping;

        pitch = pitch.clamp(-FRAC_PI_2 + POLAR_MARGIN, FRAC_PI_2 - POLAR_MARGIN);

        let new_radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);
        self.scale = 1.0;

        self.position = self.target
            + Vec3::new(
                new_radius * pitch.cos() * yaw.sin(),
                new_radius * pitch.sin(),
                new_radius * pitch.cos() * yaw.cos(),
            );
    }

    /// Drop queued manual motion.
    pub fn stop(&mut self) {
        self.delta_yaw = 0.0;
        self.delta_pitch = 0.0;
        self.scale = 1.0;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y.to_radians(), aspect.max(1e-3), self.near, self.far)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view_matrix()
    }

    /// Pick ray from the eye through `ndc`.
    ///
    /// Built from the camera basis rather than an inverted projection, so it
    /// stays precise with a far plane hundreds of thousands of units out.
    pub fn ray_through(&self, ndc: Vec2, aspect: f32) -> Ray {
        let forward = (self.target - self.position).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);
        let half_height = (self.fov_y.to_radians() * 0.5).tan();
        let half_width = half_height * aspect.max(1e-3);
        let direction = forward + right * (ndc.x * half_width) + up * (ndc.y * half_height);
        Ray::new(self.position, direction)
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 1200.0, 450_000.0), Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_keeps_distance_without_zoom() {
        let mut cam = OrbitCamera::new(Vec3::new(0.0, 0.0, 100.0), Vec3::ZERO);
        cam.rotate(0.5, 0.2);
        for _ in 0..30 {
            cam.update();
            assert!((cam.distance() - 100.0).abs() < 1e-2);
        }
        assert!(cam.position.x.abs() > 1.0);
    }

    #[test]
    fn test_damping_eases_out() {
        let mut cam = OrbitCamera::new(Vec3::new(0.0, 0.0, 100.0), Vec3::ZERO);
        cam.rotate(1.0, 0.0);
        cam.update();
        let first = cam.position;
        cam.update();
        let second = cam.position;
        cam.update();
        let third = cam.position;
        assert!(first.distance(second) > second.distance(third));
        assert!(cam.is_settling());
        cam.stop();
        assert!(!cam.is_settling());
    }

    #[test]
    fn test_zoom_moves_closer() {
        let mut cam = OrbitCamera::new(Vec3::new(0.0, 0.0, 100.0), Vec3::ZERO);
        cam.zoom(1.0);
        cam.update();
        assert!(cam.distance() < 100.0);
        cam.zoom(-3.0);
        cam.update();
        assert!(cam.distance() > 100.0);
    }

    #[test]
    fn test_auto_rotate_only_when_enabled() {
        let mut cam = OrbitCamera::new(Vec3::new(0.0, 0.0, 100.0), Vec3::ZERO);
        cam.update();
        assert!(cam.position.x.abs() < 1e-4);
        cam.auto_rotate = true;
        cam.update();
        assert!(cam.position.x.abs() > 1e-4);
    }

    #[test]
    fn test_ray_through_matches_projection() {
        let cam = OrbitCamera::new(Vec3::new(300.0, 1200.0, 4000.0), Vec3::new(-50.0, 0.0, 20.0));
        let aspect = 16.0 / 9.0;
        let view_proj = cam.view_proj(aspect);
        for ndc in [Vec2::ZERO, Vec2::new(0.5, -0.25), Vec2::new(-0.9, 0.8)] {
            let ray = cam.ray_through(ndc, aspect);
            assert_eq!(ray.origin, cam.position);
            let clip = view_proj.project_point3(ray.at(1000.0));
            assert!((clip.truncate() - ndc).length() < 1e-3, "ndc {:?} -> {:?}", ndc, clip);
        }
    }

    #[test]
    fn test_pitch_clamped_off_pole() {
        let mut cam = OrbitCamera::new(Vec3::new(0.0, 0.0, 100.0), Vec3::ZERO).with_damping(1.0);
        cam.rotate(0.0, 10.0);
        cam.update();
        assert!(cam.position.y < 100.0);
        assert!(cam.view_matrix().is_finite());
    }
}
