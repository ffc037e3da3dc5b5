//! The fixed table of ten galaxies.
//!
//! Galaxies never move, turn or change color during a session. Only the
//! camera orbits and the particles animate.
//!
//! # Indexing contract
//!
//! Particle attributes and node records carry a 1-based [`GalaxyId`]
//! (`0` marks the background shell). Every per-galaxy table, on the CPU and
//! in the shader uniform arrays, is 0-based and sized [`GALAXY_COUNT`].
//! [`GalaxyId::index`] is the only place that converts between the two.

use std::fmt;

use glam::{EulerRot, Mat4, Vec3};

/// Number of galaxies in the scene.
pub const GALAXY_COUNT: usize = 10;

/// 1-based galaxy identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GalaxyId(u32);

impl GalaxyId {
    /// Wrap a 1-based id. Returns `None` for 0 or anything past [`GALAXY_COUNT`].
    pub fn new(id: u32) -> Option<Self> {
        if id >= 1 && id as usize <= GALAXY_COUNT {
            Some(Self(id))
        } else {
            None
        }
    }

    /// Id for a 0-based table slot.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::new(index as u32 + 1)
    }

    /// The raw 1-based value stored in particle attributes.
    pub fn get(self) -> u32 {
        self.0
    }

    /// 0-based slot into per-galaxy tables.
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// All ids in ascending order.
    pub fn all() -> impl Iterator<Item = GalaxyId> {
        (1..=GALAXY_COUNT as u32).map(GalaxyId)
    }
}

impl fmt::Display for GalaxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One galaxy: where it sits, how its disk is tilted and how it is colored.
#[derive(Debug, Clone)]
pub struct Galaxy {
    pub id: GalaxyId,
    pub center: Vec3,
    /// Disk orientation as XYZ Euler angles in radians.
    pub rotation: Vec3,
    /// Gradient color at the core.
    pub core: Vec3,
    /// Gradient color at the rim.
    pub fringe: Vec3,
    /// Human-readable theme label.
    pub theme: &'static str,
}

impl Galaxy {
    /// Rotation of the disk plane, shared by particles and info nodes.
    pub fn rotation_matrix(&self) -> Mat4 {
        Mat4::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }
}

struct GalaxySeed {
    center: [f32; 3],
    rotation: [f32; 3],
    core: &'static str,
    fringe: &'static str,
    theme: &'static str,
}

const SEEDS: [GalaxySeed; GALAXY_COUNT] = [
    GalaxySeed { center: [0.0, 0.0, 0.0], rotation: [0.0, 0.0, 0.0], core: "#ffffff", fringe: "#4477ff", theme: "The Big Bang" },
    GalaxySeed { center: [1200.0, 400.0, -800.0], rotation: [-0.2, -0.4, -0.2], core: "#aaffff", fringe: "#0044ff", theme: "Artificial Intelligence" },
    GalaxySeed { center: [-1500.0, -600.0, -1200.0], rotation: [-0.7, -0.5, -0.6], core: "#ccffcc", fringe: "#006622", theme: "Alien Life" },
    GalaxySeed { center: [600.0, -1500.0, -600.0], rotation: [-0.4, -0.4, -0.3], core: "#ff99ff", fringe: "#882288", theme: "Mind Uploading" },
    GalaxySeed { center: [-800.0, 1200.0, 900.0], rotation: [-0.4, -0.9, -0.1], core: "#99ffff", fringe: "#005555", theme: "Simulation Theory" },
    GalaxySeed { center: [1800.0, -500.0, 1500.0], rotation: [-0.3, -0.1, -0.7], core: "#ffdd88", fringe: "#aa5500", theme: "Space Travel" },
    GalaxySeed { center: [-700.0, 1600.0, -1400.0], rotation: [-0.2, -0.2, -0.4], core: "#ddddff", fringe: "#333399", theme: "Megastructures" },
    GalaxySeed { center: [1100.0, 1300.0, 1100.0], rotation: [-0.6, -0.4, -0.4], core: "#ff8855", fringe: "#662200", theme: "Mars Colonization" },
    GalaxySeed { center: [-2000.0, -1200.0, 600.0], rotation: [-0.9, -0.2, -0.7], core: "#ff55bb", fringe: "#550033", theme: "Neural Links" },
    GalaxySeed { center: [500.0, -1800.0, -2000.0], rotation: [-0.1, -0.3, -0.5], core: "#aa88ff", fringe: "#330077", theme: "The End of the Universe" },
];

/// Build the ten galaxies of the scene.
pub fn galaxies() -> Vec<Galaxy> {
    SEEDS
        .iter()
        .enumerate()
        .filter_map(|(i, seed)| {
            Some(Galaxy {
                id: GalaxyId::from_index(i)?,
                center: Vec3::from_array(seed.center),
                rotation: Vec3::from_array(seed.rotation),
                core: parse_hex_color(seed.core)?,
                fringe: parse_hex_color(seed.fringe)?,
                theme: seed.theme,
            })
        })
        .collect()
}

/// Theme label of a galaxy.
pub fn theme_of(id: GalaxyId) -> &'static str {
    SEEDS[id.index()].theme
}

/// Parse `#rrggbb` into 0..1 RGB.
pub fn parse_hex_color(hex: &str) -> Option<Vec3> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(digits.get(range)?, 16).ok().map(|v| v as f32 / 255.0)
    };
    Some(Vec3::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_seeds_parse() {
        let table = galaxies();
        assert_eq!(table.len(), GALAXY_COUNT);
        for (i, g) in table.iter().enumerate() {
            assert_eq!(g.id.index(), i);
        }
    }

    #[test]
    fn test_id_bounds() {
        assert!(GalaxyId::new(0).is_none());
        assert!(GalaxyId::new(11).is_none());
        assert_eq!(GalaxyId::new(1).map(GalaxyId::index), Some(0));
        assert_eq!(GalaxyId::new(10).map(GalaxyId::index), Some(9));
        assert_eq!(GalaxyId::all().count(), GALAXY_COUNT);
    }

    #[test]
    fn test_hex_color() {
        let c = parse_hex_color("#4477ff").unwrap();
        assert!((c.x - 0x44 as f32 / 255.0).abs() < 1e-6);
        assert!((c.z - 1.0).abs() < 1e-6);
        assert!(parse_hex_color("4477ff").is_none());
        assert!(parse_hex_color("#44z7ff").is_none());
        assert!(parse_hex_color("#fff").is_none());
    }

    #[test]
    fn test_identity_rotation_for_first_galaxy() {
        let table = galaxies();
        let m = table[0].rotation_matrix();
        assert!(m.abs_diff_eq(Mat4::IDENTITY, 1e-6));
        assert_eq!(theme_of(table[2].id), "Alien Life");
    }
}
