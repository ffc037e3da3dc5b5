//! # Cosmos
//!
//! An explorable universe of ten spiral galaxies rendered as GPU point sprites,
//! each ringed by glowing question nodes.
//!
//! The scene is built once from a [`FieldCounts`] budget: stars and nebula dust
//! are laid out in galaxy-local polar coordinates and animated entirely in the
//! vertex shader (differential rotation, core bulge, color gradient). Clicking a
//! galaxy core flies the camera to it; clicking one of its nodes opens the
//! stored answer, and free-form questions go to a language model oracle.
//!
//! ## Quick Start
//!
//! ```ignore
//! fn main() -> Result<(), cosmos::AppError> {
//!     let config = cosmos::CosmosConfig::default().with_api_key("...");
//!     cosmos::run(config)
//! }
//! ```
//!
//! ## Layers
//!
//! | Concern | Module |
//! |---------|--------|
//! | Galaxy table | [`galaxy`] |
//! | Particle field generation | [`field`] |
//! | Per-particle animation math | [`shading`], [`shader`] |
//! | Node layout and pulse | [`nodes`] |
//! | Ray picking | [`picking`] |
//! | Focus, hover, selection | [`focus`] |
//! | Camera | [`camera`] |
//! | Theme content | [`themes`] |
//! | Oracle | [`oracle`] |
//! | Ambient audio | [`audio`] |
//! | Screen chrome | [`overlay`] |
//!
//! ## Features
//!
//! - `egui` (default): draw the overlay.
//! - `audio` (default): play the ambient track through rodio.

mod app;
pub mod audio;
pub mod camera;
pub mod config;
pub mod error;
pub mod field;
pub mod focus;
pub mod galaxy;
mod gpu;
pub mod input;
pub mod nodes;
pub mod oracle;
pub mod overlay;
pub mod picking;
pub mod shader;
pub mod shading;
pub mod themes;
pub mod time;

pub use app::run;
pub use config::CosmosConfig;
pub use error::{AppError, AudioError, ConfigError, GpuError, OracleError, ThemeError};
pub use field::{generate_field, FieldCounts, ParticleField};
pub use galaxy::{galaxies, Galaxy, GalaxyId, GALAXY_COUNT};
pub use glam::{Vec2, Vec3};

/// Common imports for driving the scene without a window.
///
/// ```ignore
/// use cosmos::prelude::*;
/// ```
pub mod prelude {
    pub use crate::camera::OrbitCamera;
    pub use crate::config::CosmosConfig;
    pub use crate::field::{generate_field, FieldCounts, ParticleField, ParticleKind};
    pub use crate::focus::{FocusEvent, FocusState, InteractionState};
    pub use crate::galaxy::{galaxies, Galaxy, GalaxyId};
    pub use crate::nodes::{LayoutConfig, NodeContent, NodeLayer};
    pub use crate::oracle::{ask_the_cosmos, OracleDesk, TextGenerator};
    pub use crate::picking::Ray;
    pub use crate::shading::{shade_particle, ShadingTables};
    pub use crate::themes::{StaticThemes, ThemeSource};
    pub use crate::{Vec2, Vec3};
}
