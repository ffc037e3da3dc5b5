//! WGSL sources and their GPU-side uniform/instance layouts.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2};

use crate::galaxy::GALAXY_COUNT;
use crate::shading::ShadingTables;

pub const FIELD_SHADER_SOURCE: &str = include_str!("shaders/field.wgsl");
pub const NODE_SHADER_SOURCE: &str = include_str!("shaders/nodes.wgsl");

/// Uniform block of `field.wgsl`.
///
/// Per-galaxy arrays are 0-based; see [`crate::galaxy`] for the indexing
/// contract.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct FieldUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub viewport: [f32; 2],
    pub time: f32,
    pub _pad: f32,
    pub centers: [[f32; 4]; GALAXY_COUNT],
    pub core_colors: [[f32; 4]; GALAXY_COUNT],
    pub fringe_colors: [[f32; 4]; GALAXY_COUNT],
    pub rotations: [[[f32; 4]; 4]; GALAXY_COUNT],
}

impl FieldUniforms {
    /// Fill the session-constant galaxy tables. Camera and time are set per frame.
    pub fn new(tables: &ShadingTables) -> Self {
        let mut uniforms = Self::zeroed();
        for i in 0..GALAXY_COUNT {
            uniforms.centers[i] = tables.centers[i].extend(1.0).to_array();
            uniforms.core_colors[i] = tables.core_colors[i].extend(1.0).to_array();
            uniforms.fringe_colors[i] = tables.fringe_colors[i].extend(1.0).to_array();
            uniforms.rotations[i] = tables.rotations[i].to_cols_array_2d();
        }
        uniforms
    }

    pub fn set_frame(&mut self, view: Mat4, proj: Mat4, viewport: Vec2, time: f32) {
        self.view = view.to_cols_array_2d();
        self.proj = proj.to_cols_array_2d();
        self.viewport = viewport.to_array();
        self.time = time;
    }
}

/// Uniform block of `nodes.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct NodeUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
}

impl NodeUniforms {
    pub fn new(view: Mat4, proj: Mat4) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::galaxy::galaxies;

    #[test]
    fn test_field_uniforms_size_matches_wgsl() {
        // 2 mat4 + vec2 + 2 f32 + 3 * 10 vec4 + 10 mat4
        let expected = 64 * 2 + 16 + 3 * 10 * 16 + 10 * 64;
        assert_eq!(std::mem::size_of::<FieldUniforms>(), expected);
        assert_eq!(std::mem::size_of::<FieldUniforms>() % 16, 0);
    }

    #[test]
    fn test_galaxy_tables_copied_by_slot() {
        let tables = ShadingTables::from_galaxies(&galaxies());
        let uniforms = FieldUniforms::new(&tables);
        assert_eq!(uniforms.centers[1][..3], [1200.0, 400.0, -800.0]);
        assert_eq!(uniforms.core_colors[0][..3], [1.0, 1.0, 1.0]);
    }
}
