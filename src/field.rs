//! Procedural particle field generation.
//!
//! The whole scene is one point cloud: galaxy stars, galaxy nebulae and a
//! distant background shell. Every particle is described by a handful of
//! immutable attributes; the shader derives position, color, opacity and size
//! from those attributes plus elapsed time, so nothing here changes after
//! [`generate_field`] returns.
//!
//! # Layout
//!
//! ```text
//! [ stars ........ | nebulae ........ | background ........ ]
//!   \___ galaxy particles, split evenly and contiguously ___/
//! ```
//!
//! Galaxy particles are assigned to galaxies by integer division of their
//! index, so galaxy 1 owns the first slice of stars, galaxy 10 the last slice
//! of nebulae.

use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};
use rand::Rng;
use serde::Deserialize;

use crate::galaxy::GALAXY_COUNT;

/// Radius span that maps onto the core-to-fringe color gradient.
pub const GRADIENT_SPAN: f32 = 180.0;

/// Inner and outer radius of the background star shell.
pub const BACKGROUND_SHELL: (f32, f32) = (30_000.0, 40_000.0);

/// Rendering tier of a particle.
///
/// The discriminant is the value the shader branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ParticleKind {
    /// Small bright galaxy star.
    Star = 0,
    /// Large faint galaxy gas cloud.
    Nebula = 1,
    /// Distant star on the background shell.
    Background = 2,
}

impl ParticleKind {
    /// Decode the shader tier. Unknown values are treated as background.
    pub fn from_tier(tier: u32) -> Self {
        match tier {
            0 => ParticleKind::Star,
            1 => ParticleKind::Nebula,
            _ => ParticleKind::Background,
        }
    }

    /// Whether the particle belongs to a galaxy disk.
    pub fn is_galactic(self) -> bool {
        !matches!(self, ParticleKind::Background)
    }
}

/// Static per-particle attributes, laid out for a vertex buffer.
///
/// `galaxy_id` is 1-based; 0 marks the background shell.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FieldParticle {
    /// Polar distance. For background particles this is the distance from
    /// the Y axis, not from the origin.
    pub radius: f32,
    /// Initial azimuth in radians.
    pub angle: f32,
    /// Disk thickness offset (galaxy) or Cartesian Y (background).
    pub height: f32,
    pub galaxy_id: u32,
    /// Per-particle seed in [0, 1).
    pub phase: f32,
    /// Base point size before kind scaling.
    pub size: f32,
    pub kind: u32,
    pub _pad: u32,
}

impl FieldParticle {
    pub fn kind(&self) -> ParticleKind {
        ParticleKind::from_tier(self.kind)
    }
}

/// How many particles of each kind to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FieldCounts {
    pub stars: u32,
    pub nebulae: u32,
    pub background: u32,
    pub galaxies: u32,
}

impl Default for FieldCounts {
    fn default() -> Self {
        Self {
            stars: 60_000,
            nebulae: 150_000,
            background: 200_000,
            galaxies: GALAXY_COUNT as u32,
        }
    }
}

impl FieldCounts {
    /// Galaxy particles (stars and nebulae).
    pub fn local_total(&self) -> u32 {
        self.stars + self.nebulae
    }

    /// Every particle in the field.
    pub fn total(&self) -> u32 {
        self.local_total() + self.background
    }

    /// 1-based owning galaxy of galaxy-particle `index`.
    ///
    /// Contiguous even split; the last galaxy absorbs any rounding so the
    /// result never exceeds `galaxies`.
    pub fn galaxy_of(&self, index: u32) -> u32 {
        let galaxies = self.galaxies.max(1);
        let per_galaxy = self.local_total() as f64 / galaxies as f64;
        if per_galaxy <= 0.0 {
            return 1;
        }
        let slot = (index as f64 / per_galaxy).floor() as u32;
        slot.min(galaxies - 1) + 1
    }
}

/// The generated, immutable point cloud.
#[derive(Debug, Clone)]
pub struct ParticleField {
    particles: Vec<FieldParticle>,
    counts: FieldCounts,
}

impl ParticleField {
    pub fn particles(&self) -> &[FieldParticle] {
        &self.particles
    }

    pub fn counts(&self) -> FieldCounts {
        self.counts
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Raw bytes for upload into a vertex buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.particles)
    }

    /// Galaxy-particle count per galaxy, indexed 0-based.
    pub fn per_galaxy_counts(&self) -> Vec<u32> {
        let mut counts = vec![0u32; self.counts.galaxies as usize];
        for p in self.particles.iter().filter(|p| p.kind().is_galactic()) {
            if let Some(slot) = (p.galaxy_id as usize).checked_sub(1) {
                if let Some(c) = counts.get_mut(slot) {
                    *c += 1;
                }
            }
        }
        counts
    }
}

/// Generate the full particle field.
///
/// Run once per scene build. Each call draws fresh random values; nothing is
/// seeded or cached between builds.
pub fn generate_field<R: Rng + ?Sized>(counts: &FieldCounts, rng: &mut R) -> ParticleField {
    let local_total = counts.local_total();
    let mut particles = Vec::with_capacity(counts.total() as usize);

    for i in 0..local_total {
        let nebula = i >= counts.stars;
        particles.push(galaxy_particle(nebula, counts.galaxy_of(i), rng));
    }
    for _ in 0..counts.background {
        particles.push(background_particle(rng));
    }

    ParticleField {
        particles,
        counts: *counts,
    }
}

fn galaxy_particle<R: Rng + ?Sized>(nebula: bool, galaxy_id: u32, rng: &mut R) -> FieldParticle {
    // Higher exponent packs stars toward the core; nebulae spread wider.
    let radius = if nebula {
        rng.gen::<f32>().powf(1.1) * 220.0
    } else {
        rng.gen::<f32>().powf(1.6) * GRADIENT_SPAN
    };
    let angle = rng.gen_range(0.0..TAU);
    let height = (rng.gen::<f32>() - 0.5) * 2.0;
    let phase = rng.gen::<f32>();
    let size = if nebula {
        18.0 + rng.gen::<f32>() * 12.0
    } else {
        0.2 + rng.gen::<f32>() * 0.5
    };

    FieldParticle {
        radius,
        angle,
        height,
        galaxy_id,
        phase,
        size,
        kind: if nebula {
            ParticleKind::Nebula as u32
        } else {
            ParticleKind::Star as u32
        },
        _pad: 0,
    }
}

fn background_particle<R: Rng + ?Sized>(rng: &mut R) -> FieldParticle {
    let phi = rng.gen_range(0.0..TAU);
    let theta = (rng.gen::<f32>() * 2.0 - 1.0).acos();
    let (inner, outer) = BACKGROUND_SHELL;
    let r = inner + rng.gen::<f32>() * (outer - inner);

    FieldParticle {
        radius: r * theta.sin(),
        angle: phi,
        height: r * theta.cos(),
        galaxy_id: 0,
        phase: rng.gen::<f32>(),
        size: 0.5 + rng.gen::<f32>() * 1.5,
        kind: ParticleKind::Background as u32,
        _pad: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_counts() -> FieldCounts {
        FieldCounts {
            stars: 6_000,
            nebulae: 15_000,
            background: 2_000,
            galaxies: 10,
        }
    }

    #[test]
    fn test_particle_layout_is_32_bytes() {
        assert_eq!(std::mem::size_of::<FieldParticle>(), 32);
    }

    #[test]
    fn test_total_count() {
        let counts = small_counts();
        let field = generate_field(&counts, &mut StdRng::seed_from_u64(1));
        assert_eq!(field.len() as u32, counts.total());
    }

    #[test]
    fn test_galaxy_ids_in_range() {
        let counts = small_counts();
        let field = generate_field(&counts, &mut StdRng::seed_from_u64(2));
        for p in field.particles() {
            assert!(p.galaxy_id <= counts.galaxies);
            match p.kind() {
                ParticleKind::Background => assert_eq!(p.galaxy_id, 0),
                _ => assert!(p.galaxy_id >= 1),
            }
        }
    }

    #[test]
    fn test_even_partition() {
        let counts = FieldCounts {
            stars: 1_003,
            nebulae: 2_001,
            background: 0,
            galaxies: 10,
        };
        let field = generate_field(&counts, &mut StdRng::seed_from_u64(3));
        let per = field.per_galaxy_counts();
        let min = *per.iter().min().unwrap();
        let max = *per.iter().max().unwrap();
        assert_eq!(per.iter().sum::<u32>(), counts.local_total());
        assert!(max - min <= 1, "uneven split: {:?}", per);
    }

    #[test]
    fn test_partition_is_contiguous() {
        let counts = small_counts();
        let field = generate_field(&counts, &mut StdRng::seed_from_u64(4));
        let ids: Vec<u32> = field
            .particles()
            .iter()
            .take(counts.local_total() as usize)
            .map(|p| p.galaxy_id)
            .collect();
        assert!(ids.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(ids.first(), Some(&1));
        assert_eq!(ids.last(), Some(&10));
    }

    #[test]
    fn test_galaxy_of_never_overflows() {
        let counts = FieldCounts {
            stars: 7,
            nebulae: 0,
            background: 0,
            galaxies: 3,
        };
        for i in 0..counts.local_total() {
            let g = counts.galaxy_of(i);
            assert!((1..=3).contains(&g));
        }
    }

    #[test]
    fn test_kind_specific_ranges() {
        let counts = small_counts();
        let field = generate_field(&counts, &mut StdRng::seed_from_u64(5));
        for p in field.particles() {
            assert!((0.0..1.0).contains(&p.phase));
            match p.kind() {
                ParticleKind::Star => {
                    assert!(p.radius >= 0.0 && p.radius <= 180.0);
                    assert!(p.height > -1.0 - 1e-6 && p.height < 1.0 + 1e-6);
                    assert!(p.size >= 0.2 && p.size <= 0.7);
                }
                ParticleKind::Nebula => {
                    assert!(p.radius >= 0.0 && p.radius <= 220.0);
                    assert!(p.size >= 18.0 && p.size <= 30.0);
                }
                ParticleKind::Background => {
                    let r = (p.radius * p.radius + p.height * p.height).sqrt();
                    assert!(r >= 30_000.0 - 1.0 && r <= 40_000.0 + 1.0, "r = {}", r);
                    assert!(p.radius >= -1e-3);
                }
            }
        }
    }

    #[test]
    fn test_stars_concentrate_toward_core() {
        let counts = FieldCounts {
            stars: 20_000,
            nebulae: 20_000,
            background: 0,
            galaxies: 10,
        };
        let field = generate_field(&counts, &mut StdRng::seed_from_u64(6));
        let mean = |kind: ParticleKind, span: f32| {
            let sel: Vec<f32> = field
                .particles()
                .iter()
                .filter(|p| p.kind() == kind)
                .map(|p| p.radius / span)
                .collect();
            sel.iter().sum::<f32>() / sel.len() as f32
        };
        // E[U^1.6] = 1/2.6, E[U^1.1] = 1/2.1
        assert!((mean(ParticleKind::Star, 180.0) - 1.0 / 2.6).abs() < 0.02);
        assert!((mean(ParticleKind::Nebula, 220.0) - 1.0 / 2.1).abs() < 0.02);
    }

    #[test]
    fn test_regeneration_draws_fresh_values() {
        let counts = small_counts();
        let mut rng = StdRng::seed_from_u64(7);
        let a = generate_field(&counts, &mut rng);
        let b = generate_field(&counts, &mut rng);
        assert_eq!(a.len(), b.len());
        assert_ne!(a.particles()[0], b.particles()[0]);
    }
}
