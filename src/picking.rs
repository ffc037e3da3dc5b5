//! Screen-to-world rays and sphere picking.
//!
//! Every pickable object in the scene is a sphere: galaxy cores are large
//! invisible volumes, nodes are small visible spheres. Picking casts one ray
//! from the camera through the pointer and returns the nearest hit among the
//! currently eligible targets.

use glam::{Mat4, Vec2, Vec3};

use crate::nodes::{CoreVolume, InfoNode};

/// A ray with an origin and a normalized direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Ray from the camera through a point in normalized device coordinates.
    ///
    /// `inverse_view_proj` is the inverse of `projection * view`. Depth uses
    /// the wgpu convention (near plane at z = 0).
    pub fn from_ndc(ndc: Vec2, inverse_view_proj: Mat4) -> Self {
        let near = inverse_view_proj.project_point3(ndc.extend(0.0));
        let far = inverse_view_proj.project_point3(ndc.extend(1.0));
        Self::new(near, far - near)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance along the ray to where it enters a sphere.
    ///
    /// Only front faces count: a ray starting inside the sphere, or one that
    /// passed it already, misses.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;

        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }

        let t = -b - discriminant.sqrt();
        (t >= 0.0).then_some(t)
    }
}

/// Anything that can be hit by a picking ray.
pub trait PickTarget {
    /// Center and radius of the hit volume.
    fn bounding_sphere(&self) -> (Vec3, f32);
}

impl PickTarget for CoreVolume {
    fn bounding_sphere(&self) -> (Vec3, f32) {
        (self.center, self.radius)
    }
}

/// Nodes are picked with a fixed radius; the pulse does not change the hit volume.
#[derive(Debug, Clone, Copy)]
pub struct NodeTarget<'a> {
    pub node: &'a InfoNode,
    pub radius: f32,
}

impl PickTarget for NodeTarget<'_> {
    fn bounding_sphere(&self) -> (Vec3, f32) {
        (self.node.position, self.radius)
    }
}

/// Index and distance of the nearest target hit by `ray`.
pub fn pick_nearest<T: PickTarget>(ray: &Ray, targets: &[T]) -> Option<(usize, f32)> {
    targets
        .iter()
        .enumerate()
        .filter_map(|(i, target)| {
            let (center, radius) = target.bounding_sphere();
            ray.intersect_sphere(center, radius).map(|t| (i, t))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Convert NDC to pixel coordinates (origin top-left).
pub fn ndc_to_screen(ndc: Vec2, viewport: Vec2) -> Vec2 {
    Vec2::new((ndc.x + 1.0) * 0.5 * viewport.x, (1.0 - ndc.y) * 0.5 * viewport.y)
}

/// Convert pixel coordinates (origin top-left) to NDC.
pub fn screen_to_ndc(screen: Vec2, viewport: Vec2) -> Vec2 {
    if viewport.x <= 0.0 || viewport.y <= 0.0 {
        return Vec2::ZERO;
    }
    Vec2::new(screen.x / viewport.x * 2.0 - 1.0, 1.0 - screen.y / viewport.y * 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::galaxy::GalaxyId;

    fn core(id: u32, center: Vec3) -> CoreVolume {
        CoreVolume {
            galaxy: GalaxyId::new(id).unwrap(),
            center,
            radius: 180.0,
        }
    }

    #[test]
    fn test_intersect_sphere_front_and_inside() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let t = ray.intersect_sphere(Vec3::ZERO, 2.0).unwrap();
        assert!((t - 8.0).abs() < 1e-5);

        // No hit from inside.
        let inside = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(inside.intersect_sphere(Vec3::ZERO, 2.0).is_none());
        let near_wall = Ray::new(Vec3::new(1.9, 0.0, 0.0), Vec3::NEG_X);
        assert!(near_wall.intersect_sphere(Vec3::ZERO, 2.0).is_none());

        // Behind the origin.
        let away = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::Z);
        assert!(away.intersect_sphere(Vec3::ZERO, 2.0).is_none());
    }

    #[test]
    fn test_pick_nearest_prefers_closer() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5000.0), Vec3::NEG_Z);
        let cores = [core(1, Vec3::ZERO), core(2, Vec3::new(0.0, 0.0, 1000.0)), core(3, Vec3::new(2000.0, 0.0, 0.0))];
        let (index, distance) = pick_nearest(&ray, &cores).unwrap();
        assert_eq!(index, 1);
        assert!((distance - 3820.0).abs() < 1e-2);
    }

    #[test]
    fn test_pick_nearest_skips_volume_around_origin() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 50.0), Vec3::new(0.0, 1.0, 0.3));
        let cores = [core(1, Vec3::ZERO), core(2, Vec3::new(0.0, 0.0, 1000.0))];
        assert!(pick_nearest(&ray, &cores).is_none());

        let out = Ray::new(Vec3::new(0.0, 0.0, 50.0), Vec3::Z);
        assert_eq!(pick_nearest(&out, &cores).map(|(i, _)| i), Some(1));
    }

    #[test]
    fn test_pick_nearest_empty_is_none() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let none: [CoreVolume; 0] = [];
        assert!(pick_nearest(&ray, &none).is_none());
    }

    #[test]
    fn test_ray_from_ndc_center_looks_at_target() {
        let eye = Vec3::new(0.0, 1200.0, 4000.0);
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(40f32.to_radians(), 16.0 / 9.0, 0.1, 500_000.0);
        let ray = Ray::from_ndc(Vec2::ZERO, (proj * view).inverse());

        let expected = (Vec3::ZERO - eye).normalize();
        assert!(ray.direction.dot(expected) > 0.9999);
        assert!(ray.intersect_sphere(Vec3::ZERO, 180.0).is_some());
    }

    #[test]
    fn test_screen_ndc_conversion() {
        let viewport = Vec2::new(800.0, 600.0);
        assert_eq!(ndc_to_screen(Vec2::ZERO, viewport), Vec2::new(400.0, 300.0));
        assert_eq!(ndc_to_screen(Vec2::new(-1.0, 1.0), viewport), Vec2::ZERO);
        let back = screen_to_ndc(Vec2::new(200.0, 450.0), viewport);
        assert!((ndc_to_screen(back, viewport) - Vec2::new(200.0, 450.0)).length() < 1e-4);
        assert_eq!(screen_to_ndc(Vec2::ONE, Vec2::ZERO), Vec2::ZERO);
    }
}
