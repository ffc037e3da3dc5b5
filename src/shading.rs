//! CPU mirror of the particle shading program.
//!
//! `field.wgsl` is the source of truth on screen. The functions here apply
//! the same formulas on the CPU so the animation rules can be unit tested
//! and reused by tooling (for example to place labels on a galaxy's
//! rotating disk).

use glam::{Mat4, Vec3};

use crate::field::{FieldParticle, ParticleKind, GRADIENT_SPAN};
use crate::galaxy::{Galaxy, GALAXY_COUNT};

const BACKGROUND_TINT: Vec3 = Vec3::new(0.5, 0.6, 1.0);

/// Screen-size scale shared with the shader.
pub const SIZE_SCALE: f32 = 700.0;

/// Session-constant per-galaxy tables, indexed 0-based.
#[derive(Debug, Clone)]
pub struct ShadingTables {
    pub centers: [Vec3; GALAXY_COUNT],
    pub core_colors: [Vec3; GALAXY_COUNT],
    pub fringe_colors: [Vec3; GALAXY_COUNT],
    pub rotations: [Mat4; GALAXY_COUNT],
}

impl ShadingTables {
    pub fn from_galaxies(galaxies: &[Galaxy]) -> Self {
        let mut tables = Self {
            centers: [Vec3::ZERO; GALAXY_COUNT],
            core_colors: [Vec3::ONE; GALAXY_COUNT],
            fringe_colors: [Vec3::ONE; GALAXY_COUNT],
            rotations: [Mat4::IDENTITY; GALAXY_COUNT],
        };
        for g in galaxies {
            let slot = g.id.index();
            tables.centers[slot] = g.center;
            tables.core_colors[slot] = g.core;
            tables.fringe_colors[slot] = g.fringe;
            tables.rotations[slot] = g.rotation_matrix();
        }
        tables
    }

    /// 0-based slot for a particle's 1-based galaxy id, clamped like the shader.
    fn slot(galaxy_id: u32) -> usize {
        (galaxy_id.clamp(1, GALAXY_COUNT as u32) - 1) as usize
    }
}

/// One particle as the shader would see it at a given time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadedPoint {
    pub world: Vec3,
    pub color: Vec3,
    pub opacity: f32,
    /// Size before perspective scaling; see [`point_size_px`].
    pub base_size: f32,
}

/// Position along the core-to-fringe gradient, always within [0, 1].
pub fn normalized_radius(radius: f32) -> f32 {
    let t = radius / GRADIENT_SPAN;
    if t.is_nan() {
        0.0
    } else {
        t.clamp(0.0, 1.0)
    }
}

/// Angular velocity of a galaxy particle, in radians per second.
pub fn spin_rate(radius: f32) -> f32 {
    0.01 + 3.0 / (radius + 30.0)
}

/// Vertical stretch applied to the disk-thickness attribute.
pub fn bulge(radius: f32, kind: ParticleKind) -> f32 {
    let falloff = radius / 45.0;
    let lift = if kind == ParticleKind::Nebula { 20.0 } else { 6.0 };
    (-(falloff * falloff)).exp() * 40.0 + lift
}

/// Kind-dependent point size multiplier.
pub fn base_size(size: f32, kind: ParticleKind) -> f32 {
    match kind {
        ParticleKind::Background => size * 0.8,
        ParticleKind::Nebula => size * 15.0,
        ParticleKind::Star => size * 2.0,
    }
}

/// On-screen diameter in device pixels for a point at `view_distance`.
///
/// Not scaled by the display's pixel ratio: a HiDPI surface has more device
/// pixels, so sprites cover less of the screen there.
pub fn point_size_px(base_size: f32, view_distance: f32) -> f32 {
    base_size * SIZE_SCALE / view_distance.max(0.001)
}

/// Evaluate the vertex program for one particle.
pub fn shade_particle(p: &FieldParticle, tables: &ShadingTables, time: f32) -> ShadedPoint {
    let kind = p.kind();
    match kind {
        ParticleKind::Background => ShadedPoint {
            world: Vec3::new(p.radius * p.angle.cos(), p.height, p.radius * p.angle.sin()),
            color: BACKGROUND_TINT.lerp(Vec3::ONE, p.phase),
            opacity: (0.2 + 0.3 * (time * 0.4 + p.phase * 10.0).sin()) * p.phase,
            base_size: base_size(p.size, kind),
        },
        ParticleKind::Star | ParticleKind::Nebula => {
            let slot = ShadingTables::slot(p.galaxy_id);
            let a = p.angle + time * spin_rate(p.radius);
            let local = Vec3::new(
                p.radius * a.cos(),
                p.height * bulge(p.radius, kind),
                p.radius * a.sin(),
            );
            let jitter = Vec3::new(
                (time * 0.5 + p.phase * 20.0).sin(),
                (time * 0.4 + p.phase * 15.0).cos(),
                (time * 0.3).sin(),
            ) * 0.8;
            let world = tables.centers[slot] + tables.rotations[slot].transform_point3(local) + jitter;

            let tn = normalized_radius(p.radius);
            let base_opacity = if kind == ParticleKind::Nebula { 0.15 } else { 0.9 };
            ShadedPoint {
                world,
                color: tables.core_colors[slot].lerp(tables.fringe_colors[slot], tn),
                opacity: base_opacity * (1.0 - tn * 0.55) * (0.7 + 0.3 * (time + p.phase * 12.0).sin()),
                base_size: base_size(p.size, kind),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{generate_field, FieldCounts};
    use crate::galaxy::galaxies;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn particle(kind: ParticleKind, radius: f32, galaxy_id: u32) -> FieldParticle {
        FieldParticle {
            radius,
            angle: 0.0,
            height: 0.0,
            galaxy_id,
            phase: 0.5,
            size: 1.0,
            kind: kind as u32,
            _pad: 0,
        }
    }

    #[test]
    fn test_normalized_radius_clamped() {
        for r in [-50.0, 0.0, 90.0, 180.0, 220.0, 1.0e9, f32::INFINITY, f32::NAN] {
            let t = normalized_radius(r);
            assert!((0.0..=1.0).contains(&t), "r = {} gave {}", r, t);
        }
        assert!((normalized_radius(90.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_colors_stay_inside_gradient() {
        let tables = ShadingTables::from_galaxies(&galaxies());
        let counts = FieldCounts {
            stars: 2_000,
            nebulae: 2_000,
            background: 500,
            galaxies: 10,
        };
        let field = generate_field(&counts, &mut StdRng::seed_from_u64(9));
        for p in field.particles() {
            let shaded = shade_particle(p, &tables, 12.5);
            assert!(shaded.color.min_element() >= -1e-6);
            assert!(shaded.color.max_element() <= 1.0 + 1e-6);
            assert!(shaded.world.is_finite());
        }
    }

    #[test]
    fn test_inner_particles_spin_faster() {
        assert!(spin_rate(5.0) > spin_rate(50.0));
        assert!(spin_rate(50.0) > spin_rate(200.0));
        assert!(spin_rate(1.0e6) > 0.0099);
    }

    #[test]
    fn test_nebula_bulges_more_and_core_is_thicker() {
        assert!(bulge(0.0, ParticleKind::Nebula) > bulge(0.0, ParticleKind::Star));
        assert!(bulge(0.0, ParticleKind::Star) > bulge(150.0, ParticleKind::Star));
        assert!((bulge(1_000.0, ParticleKind::Star) - 6.0).abs() < 1e-4);
    }

    #[test]
    fn test_galaxy_particle_orbits_its_center() {
        let tables = ShadingTables::from_galaxies(&galaxies());
        let p = particle(ParticleKind::Star, 100.0, 3);
        let a = shade_particle(&p, &tables, 0.0);
        let b = shade_particle(&p, &tables, 10.0);
        // Disk radius is preserved up to jitter.
        for s in [a, b] {
            let d = s.world.distance(tables.centers[2]);
            assert!((d - 100.0).abs() < 2.0, "d = {}", d);
        }
        assert!(a.world.distance(b.world) > 1.0);
    }

    #[test]
    fn test_background_does_not_move() {
        let tables = ShadingTables::from_galaxies(&galaxies());
        let mut p = particle(ParticleKind::Background, 30_000.0, 0);
        p.height = 500.0;
        let a = shade_particle(&p, &tables, 0.0);
        let b = shade_particle(&p, &tables, 100.0);
        assert_eq!(a.world, b.world);
        assert_ne!(a.opacity, b.opacity);
    }

    #[test]
    fn test_star_brighter_than_nebula() {
        let tables = ShadingTables::from_galaxies(&galaxies());
        let star = shade_particle(&particle(ParticleKind::Star, 20.0, 1), &tables, 0.0);
        let nebula = shade_particle(&particle(ParticleKind::Nebula, 20.0, 1), &tables, 0.0);
        assert!(star.opacity > nebula.opacity);
        let far = shade_particle(&particle(ParticleKind::Star, 170.0, 1), &tables, 0.0);
        assert!(star.opacity > far.opacity);
    }

    #[test]
    fn test_point_size_ordering_and_perspective() {
        let nebula = base_size(1.0, ParticleKind::Nebula);
        let star = base_size(1.0, ParticleKind::Star);
        let bg = base_size(1.0, ParticleKind::Background);
        assert!(nebula > star && star > bg);
        let near = point_size_px(star, 100.0);
        let far = point_size_px(star, 200.0);
        assert!((near - 2.0 * far).abs() < 1e-4);
    }

    #[test]
    fn test_point_size_in_device_pixels() {
        // A unit star at the scale distance is exactly its base size.
        let star = base_size(1.0, ParticleKind::Star);
        assert!((point_size_px(star, SIZE_SCALE) - 2.0).abs() < 1e-6);
    }
}
