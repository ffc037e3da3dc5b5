//! Focus state machine, hover/selection tracking and camera retargeting.
//!
//! ```text
//!             click core (g)
//!   Overview ───────────────▶ Focused(g)
//!      ▲                          │
//!      └──────── reset ───────────┘
//! ```
//!
//! In overview only galaxy cores are pickable; once a galaxy is focused only
//! that galaxy's nodes are. Hover and selection are mutually exclusive: an
//! open selection freezes hover and swallows clicks until it is closed.

use glam::{Vec2, Vec3};
use serde::Deserialize;

use crate::camera::OrbitCamera;
use crate::galaxy::{theme_of, GalaxyId};
use crate::nodes::{CoreVolume, InfoNode, NodeLayer};
use crate::picking::{pick_nearest, NodeTarget, Ray};

/// Which part of the scene the user is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusState {
    #[default]
    Overview,
    Focused(GalaxyId),
}

impl FocusState {
    pub fn galaxy(self) -> Option<GalaxyId> {
        match self {
            FocusState::Overview => None,
            FocusState::Focused(g) => Some(g),
        }
    }

    pub fn is_overview(self) -> bool {
        self == FocusState::Overview
    }
}

/// Tooltip content for the object under the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct Hover {
    pub label: String,
    /// Node answer; empty for galaxy cores.
    pub detail: String,
    /// Screen position in pixels.
    pub anchor: Vec2,
}

/// An open question/answer panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub question: String,
    pub answer: String,
    pub anchor: Vec2,
}

/// Transition reported by [`InteractionState::click`] and [`InteractionState::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusEvent {
    Focused(GalaxyId),
    NodeSelected { galaxy: GalaxyId, layout_index: usize },
    Reset,
}

/// Camera framings for each focus state.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    pub overview_position: Vec3,
    pub overview_look_at: Vec3,
    /// Eye offset from a focused galaxy's center.
    pub focus_offset: Vec3,
    /// Fraction of the remaining distance covered per frame.
    pub transition_rate: f32,
    /// Distance at which a transition is considered finished.
    pub arrive_threshold: f32,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            overview_position: Vec3::new(0.0, 1200.0, 4000.0),
            overview_look_at: Vec3::ZERO,
            focus_offset: Vec3::new(0.0, 300.0, 600.0),
            transition_rate: 0.05,
            arrive_threshold: 0.5,
        }
    }
}

/// Glides the camera toward a target framing.
#[derive(Debug, Clone)]
pub struct CameraRig {
    pub target_position: Vec3,
    pub target_look_at: Vec3,
    transitioning: bool,
    rate: f32,
    threshold: f32,
}

impl CameraRig {
    pub fn new(rate: f32, threshold: f32) -> Self {
        Self {
            target_position: Vec3::ZERO,
            target_look_at: Vec3::ZERO,
            transitioning: false,
            rate: rate.clamp(0.0, 1.0),
            threshold,
        }
    }

    pub fn retarget(&mut self, position: Vec3, look_at: Vec3) {
        self.target_position = position;
        self.target_look_at = look_at;
        self.transitioning = true;
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    /// Manual camera input takes over from the glide.
    pub fn cancel_transition(&mut self) {
        self.transitioning = false;
    }

    /// Move the camera one frame closer to the target framing.
    pub fn step(&mut self, camera: &mut OrbitCamera) {
        if !self.transitioning {
            return;
        }
        camera.position = camera.position.lerp(self.target_position, self.rate);
        camera.target = camera.target.lerp(self.target_look_at, self.rate);
        if camera.position.distance(self.target_position) < self.threshold {
            self.transitioning = false;
        }
    }
}

/// Objects eligible for picking in the current focus state.
#[derive(Debug)]
pub enum PickSet<'a> {
    Cores(&'a [CoreVolume]),
    Nodes(Vec<NodeTarget<'a>>),
}

/// What a pick ray hit.
#[derive(Debug, Clone, Copy)]
pub enum Picked<'a> {
    Core(&'a CoreVolume),
    Node(&'a InfoNode),
}

impl<'a> PickSet<'a> {
    pub fn len(&self) -> usize {
        match self {
            PickSet::Cores(cores) => cores.len(),
            PickSet::Nodes(nodes) => nodes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nearest hit along `ray`.
    pub fn pick(&self, ray: &Ray) -> Option<Picked<'a>> {
        match self {
            PickSet::Cores(cores) => {
                let cores: &'a [CoreVolume] = *cores;
                pick_nearest(ray, cores).map(|(i, _)| Picked::Core(&cores[i]))
            }
            PickSet::Nodes(nodes) => pick_nearest(ray, nodes).map(|(i, _)| Picked::Node(nodes[i].node)),
        }
    }
}

/// All interaction state driven by the frame loop.
#[derive(Debug, Clone)]
pub struct InteractionState {
    focus: FocusState,
    hover: Option<Hover>,
    selection: Option<Selection>,
    pub rig: CameraRig,
    framing: FramingConfig,
    node_pick_radius: f32,
}

impl InteractionState {
    /// Start in overview with the camera gliding toward the overview framing.
    pub fn new(framing: FramingConfig, node_pick_radius: f32) -> Self {
        let mut rig = CameraRig::new(framing.transition_rate, framing.arrive_threshold);
        rig.retarget(framing.overview_position, framing.overview_look_at);
        Self {
            focus: FocusState::Overview,
            hover: None,
            selection: None,
            rig,
            framing,
            node_pick_radius,
        }
    }

    pub fn focus(&self) -> FocusState {
        self.focus
    }

    pub fn hover(&self) -> Option<&Hover> {
        self.hover.as_ref()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Auto-rotation runs only in overview.
    pub fn auto_rotate(&self) -> bool {
        self.focus.is_overview()
    }

    pub fn targets<'a>(&self, layer: &'a NodeLayer) -> PickSet<'a> {
        match self.focus {
            FocusState::Overview => PickSet::Cores(layer.cores()),
            FocusState::Focused(g) => PickSet::Nodes(
                layer
                    .nodes_of(g)
                    .iter()
                    .map(|node| NodeTarget {
                        node,
                        radius: self.node_pick_radius,
                    })
                    .collect(),
            ),
        }
    }

    /// Refresh the hover from the pointer ray.
    pub fn update_hover(&mut self, ray: &Ray, anchor: Vec2, layer: &NodeLayer) {
        if self.selection.is_some() {
            return;
        }
        self.hover = match self.targets(layer).pick(ray) {
            Some(Picked::Core(core)) => Some(Hover {
                label: theme_of(core.galaxy).to_string(),
                detail: String::new(),
                anchor,
            }),
            Some(Picked::Node(node)) => Some(Hover {
                label: node.question.clone(),
                detail: node.answer.clone(),
                anchor,
            }),
            None => None,
        };
    }

    pub fn clear_hover(&mut self) {
        self.hover = None;
    }

    /// Handle a click at the pointer ray.
    pub fn click(&mut self, ray: &Ray, anchor: Vec2, layer: &NodeLayer) -> Option<FocusEvent> {
        if self.selection.is_some() {
            return None;
        }
        match self.targets(layer).pick(ray)? {
            Picked::Core(core) => {
                let galaxy = core.galaxy;
                let center = core.center;
                self.focus = FocusState::Focused(galaxy);
                self.hover = None;
                self.rig.retarget(center + self.framing.focus_offset, center);
                log::info!("Focused galaxy {} ({})", galaxy, theme_of(galaxy));
                Some(FocusEvent::Focused(galaxy))
            }
            Picked::Node(node) => {
                let event = FocusEvent::NodeSelected {
                    galaxy: node.galaxy,
                    layout_index: node.layout_index,
                };
                self.open_selection(Selection {
                    question: node.question.clone(),
                    answer: node.answer.clone(),
                    anchor,
                });
                log::debug!("Selected node {} of galaxy {}", node.layout_index, node.galaxy);
                Some(event)
            }
        }
    }

    /// Return to overview. No-op when already there.
    pub fn reset(&mut self) -> Option<FocusEvent> {
        if self.focus.is_overview() {
            return None;
        }
        self.focus = FocusState::Overview;
        self.hover = None;
        self.selection = None;
        self.rig
            .retarget(self.framing.overview_position, self.framing.overview_look_at);
        log::info!("Returned to overview");
        Some(FocusEvent::Reset)
    }

    /// Show a selection; hides any hover.
    pub fn open_selection(&mut self, selection: Selection) {
        self.hover = None;
        self.selection = Some(selection);
    }

    pub fn close_selection(&mut self) {
        self.selection = None;
    }
}
