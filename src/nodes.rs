//! Clickable knowledge nodes and the invisible galaxy cores.
//!
//! Each galaxy owns one [`CoreVolume`] (the pick target in overview) and up
//! to twelve [`InfoNode`]s spread over a sphere around its center (the pick
//! targets once the galaxy is focused). Nodes pulse every frame; the pulse
//! is computed here on the CPU and uploaded as [`NodeInstance`] records.

use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use serde::Deserialize;

use crate::galaxy::{Galaxy, GalaxyId, GALAXY_COUNT};

/// One question/answer pair supplied by a theme source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeContent {
    pub question: String,
    pub answer: String,
}

impl NodeContent {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// A placed, pickable question/answer node.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoNode {
    pub galaxy: GalaxyId,
    pub question: String,
    pub answer: String,
    /// Position in the galaxy's layout; used only for placement.
    pub layout_index: usize,
    pub position: Vec3,
}

/// Invisible pick sphere covering a galaxy's core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoreVolume {
    pub galaxy: GalaxyId,
    pub center: Vec3,
    pub radius: f32,
}

/// Node placement radii.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Radius of the sphere the nodes sit on.
    pub orbit_radius: f32,
    /// Radius of a single node sphere.
    pub node_radius: f32,
    /// Radius of the core pick volume.
    pub core_radius: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            orbit_radius: 200.0,
            node_radius: 8.0,
            core_radius: 180.0,
        }
    }
}

/// Unit direction of the `i`-th of `n` points on a Fibonacci sphere.
///
/// Index 0 is the north pole, index `n - 1` the south pole. A single point
/// sits at the north pole.
pub fn fibonacci_sphere(i: usize, n: usize) -> Vec3 {
    if n <= 1 {
        return Vec3::Y;
    }
    let golden_angle = PI * (3.0 - 5.0_f32.sqrt());
    let y = 1.0 - 2.0 * i as f32 / (n - 1) as f32;
    let ring = (1.0 - y * y).max(0.0).sqrt();
    let theta = i as f32 * golden_angle;
    Vec3::new(theta.cos() * ring, y, theta.sin() * ring)
}

/// Per-instance record for the node render pass.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct NodeInstance {
    pub center: [f32; 3],
    pub radius: f32,
    pub glow_color: [f32; 3],
    pub emissive: f32,
}

/// Pulse scale of a node at time `t`.
pub fn pulse_scale(position: Vec3, t: f32) -> f32 {
    0.9 + (t * 2.0 + position.z).sin() * 0.1
}

/// Emissive intensity of a node at time `t`.
pub fn pulse_emissive(position: Vec3, t: f32) -> f32 {
    4.0 + (t * 3.0 + position.x).sin() * 2.0
}

/// All cores and nodes of the scene.
#[derive(Debug, Clone, Default)]
pub struct NodeLayer {
    cores: Vec<CoreVolume>,
    nodes: Vec<InfoNode>,
    /// Node range per galaxy slot.
    ranges: [(usize, usize); GALAXY_COUNT],
    glow: [Vec3; GALAXY_COUNT],
    node_radius: f32,
}

impl NodeLayer {
    /// Place nodes for every galaxy.
    ///
    /// `contents` yields each galaxy's ordered node list; a galaxy without an
    /// entry gets a core but no nodes.
    pub fn build<'a, I>(galaxies: &[Galaxy], contents: I, layout: &LayoutConfig) -> Self
    where
        I: IntoIterator<Item = (GalaxyId, &'a [NodeContent])>,
    {
        let mut layer = Self {
            node_radius: layout.node_radius,
            ..Self::default()
        };

        for g in galaxies {
            layer.cores.push(CoreVolume {
                galaxy: g.id,
                center: g.center,
                radius: layout.core_radius,
            });
            layer.glow[g.id.index()] = g.core;
        }

        let mut by_slot: [&[NodeContent]; GALAXY_COUNT] = [&[]; GALAXY_COUNT];
        for (id, list) in contents {
            by_slot[id.index()] = list;
        }

        for g in galaxies {
            let list = by_slot[g.id.index()];
            let rotation: Mat4 = g.rotation_matrix();
            let start = layer.nodes.len();
            for (i, content) in list.iter().enumerate() {
                let local = fibonacci_sphere(i, list.len()) * layout.orbit_radius;
                layer.nodes.push(InfoNode {
                    galaxy: g.id,
                    question: content.question.clone(),
                    answer: content.answer.clone(),
                    layout_index: i,
                    position: g.center + rotation.transform_vector3(local),
                });
            }
            layer.ranges[g.id.index()] = (start, layer.nodes.len());
        }

        log::debug!(
            "Placed {} nodes around {} galaxy cores",
            layer.nodes.len(),
            layer.cores.len()
        );
        layer
    }

    pub fn cores(&self) -> &[CoreVolume] {
        &self.cores
    }

    pub fn core(&self, galaxy: GalaxyId) -> Option<&CoreVolume> {
        self.cores.iter().find(|c| c.galaxy == galaxy)
    }

    /// Nodes of one galaxy, in layout order.
    pub fn nodes_of(&self, galaxy: GalaxyId) -> &[InfoNode] {
        let (start, end) = self.ranges[galaxy.index()];
        &self.nodes[start..end]
    }

    pub fn all_nodes(&self) -> &[InfoNode] {
        &self.nodes
    }

    /// Pulsed instance records for every node at time `t`.
    pub fn instances(&self, t: f32, out: &mut Vec<NodeInstance>) {
        out.clear();
        out.extend(self.nodes.iter().map(|node| NodeInstance {
            center: node.position.to_array(),
            radius: self.node_radius * pulse_scale(node.position, t),
            glow_color: self.glow[node.galaxy.index()].to_array(),
            emissive: pulse_emissive(node.position, t),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::galaxy::galaxies;

    fn twelve() -> Vec<NodeContent> {
        (0..12)
            .map(|i| NodeContent::new(format!("q{}", i), format!("a{}", i)))
            .collect()
    }

    #[test]
    fn test_fibonacci_poles() {
        assert!((fibonacci_sphere(0, 12) - Vec3::Y).length() < 1e-6);
        assert!((fibonacci_sphere(11, 12) + Vec3::Y).length() < 1e-5);
        assert_eq!(fibonacci_sphere(0, 1), Vec3::Y);
    }

    #[test]
    fn test_fibonacci_unit_length() {
        for n in [2, 5, 12, 40] {
            for i in 0..n {
                let d = fibonacci_sphere(i, n);
                assert!((d.length() - 1.0).abs() < 1e-5, "i={} n={}", i, n);
            }
        }
    }

    #[test]
    fn test_nodes_on_orbit_sphere_and_distinct() {
        let galaxies = galaxies();
        let content = twelve();
        let layout = LayoutConfig::default();
        let layer = NodeLayer::build(
            &galaxies,
            galaxies.iter().map(|g| (g.id, content.as_slice())),
            &layout,
        );

        assert_eq!(layer.cores().len(), 10);
        assert_eq!(layer.all_nodes().len(), 120);

        for g in &galaxies {
            let nodes = layer.nodes_of(g.id);
            assert_eq!(nodes.len(), 12);
            for (i, a) in nodes.iter().enumerate() {
                assert_eq!(a.layout_index, i);
                assert_eq!(a.galaxy, g.id);
                let r = a.position.distance(g.center);
                assert!((r - 200.0).abs() < 1e-2, "r = {}", r);
                for b in &nodes[i + 1..] {
                    assert!(a.position.distance(b.position) > 1.0);
                }
            }
        }
    }

    #[test]
    fn test_first_node_sits_on_rotated_pole() {
        let galaxies = galaxies();
        let content = twelve();
        let layer = NodeLayer::build(
            &galaxies[..1],
            [(galaxies[0].id, content.as_slice())],
            &LayoutConfig::default(),
        );
        // Galaxy 1 has no rotation.
        let first = &layer.nodes_of(galaxies[0].id)[0];
        assert!((first.position - Vec3::new(0.0, 200.0, 0.0)).length() < 1e-3);
        assert_eq!(first.question, "q0");
    }

    #[test]
    fn test_missing_content_keeps_core() {
        let galaxies = galaxies();
        let content = twelve();
        let g2 = galaxies[1].id;
        let layer = NodeLayer::build(&galaxies, [(g2, content.as_slice())], &LayoutConfig::default());
        assert_eq!(layer.cores().len(), 10);
        assert!(layer.nodes_of(galaxies[0].id).is_empty());
        assert_eq!(layer.nodes_of(g2).len(), 12);
        assert!(layer.core(galaxies[0].id).is_some());
    }

    #[test]
    fn test_pulse_ranges() {
        for t in [0.0, 0.7, 3.3, 100.0] {
            let p = Vec3::new(13.0, -2.0, 57.0);
            let s = pulse_scale(p, t);
            let e = pulse_emissive(p, t);
            assert!((0.8..=1.0).contains(&s));
            assert!((2.0..=6.0).contains(&e));
        }
    }

    #[test]
    fn test_instances_follow_nodes() {
        let galaxies = galaxies();
        let content = twelve();
        let layer = NodeLayer::build(
            &galaxies,
            galaxies.iter().map(|g| (g.id, content.as_slice())),
            &LayoutConfig::default(),
        );
        let mut out = Vec::new();
        layer.instances(1.5, &mut out);
        assert_eq!(out.len(), 120);
        assert_eq!(std::mem::size_of::<NodeInstance>(), 32);
        let first = &out[0];
        assert!(first.radius > 7.0 && first.radius <= 8.0);
        assert_eq!(first.glow_color, galaxies[0].core.to_array());
    }
}
