//! Screen chrome drawn over the scene.
//!
//! The overlay is a passive consumer: it reads an [`OverlayView`] snapshot
//! each frame and reports what the user did as [`UiActions`]. It never
//! touches focus, hover or selection state directly.

use crate::focus::{FocusState, Hover, Selection};
use crate::galaxy::theme_of;

/// Title shown while no galaxy is focused.
pub const OVERVIEW_TITLE: &str = "U N I V E R S E";

/// Everything the overlay needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct OverlayView<'a> {
    /// Loading fraction while theme data is still arriving.
    pub loading: Option<f32>,
    pub focus: FocusState,
    pub hover: Option<&'a Hover>,
    pub selection: Option<&'a Selection>,
    pub asking: bool,
    pub volume: f32,
    pub muted: bool,
    pub show_hint: bool,
}

/// User intents collected from one overlay frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiActions {
    pub reset: bool,
    pub close_selection: bool,
    pub toggle_mute: bool,
    pub set_volume: Option<f32>,
    pub submit_query: Option<String>,
}

pub fn title(focus: FocusState) -> &'static str {
    match focus {
        FocusState::Overview => OVERVIEW_TITLE,
        FocusState::Focused(g) => theme_of(g),
    }
}

pub fn status(focus: FocusState) -> &'static str {
    if focus.is_overview() {
        "READY"
    } else {
        "FOCUSED"
    }
}

/// The query panel is offered only for a focused galaxy with nothing open.
pub fn query_panel_visible(view: &OverlayView<'_>) -> bool {
    view.loading.is_none() && !view.focus.is_overview() && view.selection.is_none()
}

/// Whether the submit button is enabled for `query`.
pub fn can_submit(view: &OverlayView<'_>, query: &str) -> bool {
    query_panel_visible(view) && !view.asking && !query.trim().is_empty()
}

/// Tooltip is hidden while a selection is open.
pub fn tooltip<'a>(view: &OverlayView<'a>) -> Option<&'a Hover> {
    if view.selection.is_some() || view.loading.is_some() {
        None
    } else {
        view.hover
    }
}

/// Overlay widget state that outlives a frame.
#[derive(Debug, Default)]
pub struct Overlay {
    query: String,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Take the typed question if it may be sent now, clearing the field.
    #[cfg(feature = "egui")]
    fn take_query(&mut self, view: &OverlayView<'_>) -> Option<String> {
        if can_submit(view, &self.query) {
            Some(std::mem::take(&mut self.query))
        } else {
            None
        }
    }
}

#[cfg(feature = "egui")]
mod draw {
    use egui::{Align2, Color32, Pos2, RichText, Vec2};

    use super::*;

    impl Overlay {
        /// Draw the overlay and collect user actions.
        pub fn show(&mut self, ctx: &egui::Context, view: &OverlayView<'_>) -> UiActions {
            let mut actions = UiActions::default();

            if let Some(progress) = view.loading {
                loading_screen(ctx, progress);
                return actions;
            }

            self.hud(ctx, view, &mut actions);

            if let Some(hover) = tooltip(view) {
                egui::Area::new(egui::Id::new("hover_tooltip"))
                    .fixed_pos(Pos2::new(hover.anchor.x, hover.anchor.y - 45.0))
                    .pivot(Align2::CENTER_BOTTOM)
                    .interactable(false)
                    .show(ctx, |ui| {
                        egui::Frame::popup(ui.style())
                            .fill(Color32::WHITE)
                            .show(ui, |ui| {
                                ui.label(RichText::new(hover.label.to_uppercase()).strong().color(Color32::BLACK));
                            });
                    });
            }

            if view.show_hint {
                egui::Area::new(egui::Id::new("start_hint"))
                    .anchor(Align2::RIGHT_BOTTOM, Vec2::new(-48.0, -128.0))
                    .interactable(false)
                    .show(ctx, |ui| {
                        ui.label(RichText::new("S C R O L L   I N").size(14.0).color(Color32::WHITE));
                    });
            }

            if query_panel_visible(view) {
                self.query_panel(ctx, view, &mut actions);
            }

            if let Some(selection) = view.selection {
                selection_modal(ctx, selection, &mut actions);
            }

            actions
        }

        fn hud(&mut self, ctx: &egui::Context, view: &OverlayView<'_>, actions: &mut UiActions) {
            egui::Area::new(egui::Id::new("hud_title"))
                .anchor(Align2::LEFT_TOP, Vec2::new(48.0, 48.0))
                .show(ctx, |ui| {
                    ui.label(RichText::new("100 QUESTIONS OF THE").size(8.0).color(Color32::WHITE));
                    ui.label(RichText::new(title(view.focus).to_uppercase()).size(22.0).color(Color32::WHITE));
                });

            egui::Area::new(egui::Id::new("hud_controls"))
                .anchor(Align2::RIGHT_TOP, Vec2::new(-48.0, 48.0))
                .show(ctx, |ui| {
                    ui.with_layout(egui::Layout::top_down(egui::Align::Max), |ui| {
                        ui.label(
                            RichText::new(format!("● {}", status(view.focus)))
                                .size(9.0)
                                .color(Color32::WHITE),
                        );
                        ui.horizontal(|ui| {
                            let icon = if view.muted { "🔇" } else { "🔊" };
                            if ui.button(icon).clicked() {
                                actions.toggle_mute = true;
                            }
                            let mut volume = view.volume;
                            if ui
                                .add(egui::Slider::new(&mut volume, 0.0..=1.0).step_by(0.01).show_value(false))
                                .changed()
                            {
                                actions.set_volume = Some(volume);
                            }
                            if !view.focus.is_overview() && ui.button("RESET").clicked() {
                                actions.reset = true;
                            }
                        });
                    });
                });

            egui::Area::new(egui::Id::new("hud_footer"))
                .anchor(Align2::LEFT_BOTTOM, Vec2::new(48.0, -48.0))
                .interactable(false)
                .show(ctx, |ui| {
                    ui.label(RichText::new("QUERY THE INFINITE. ACCESS NODE DATA.").size(10.0).color(Color32::WHITE));
                });
        }

        fn query_panel(&mut self, ctx: &egui::Context, view: &OverlayView<'_>, actions: &mut UiActions) {
            egui::Area::new(egui::Id::new("query_panel"))
                .anchor(Align2::CENTER_BOTTOM, Vec2::new(0.0, -80.0))
                .show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.label(RichText::new("HAVE A QUESTION YOU'RE NOT SEEING?").size(11.0).color(Color32::WHITE));
                        ui.horizontal(|ui| {
                            let edit = ui.add(
                                egui::TextEdit::singleline(&mut self.query)
                                    .hint_text("QUERY VOID...")
                                    .desired_width(420.0),
                            );
                            let enter = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                            let enabled = can_submit(view, &self.query);
                            let label = if view.asking { "…" } else { "SEND" };
                            let send = ui.add_enabled(enabled, egui::Button::new(label)).clicked();
                            if send || enter {
                                actions.submit_query = self.take_query(view);
                            }
                        });
                    });
                });
        }
    }

    fn loading_screen(ctx: &egui::Context, progress: f32) {
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(Color32::BLACK))
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(ui.available_height() * 0.45);
                    ui.label(RichText::new("INAUGURATING MULTIVERSE").size(10.0).color(Color32::WHITE));
                    ui.add_space(24.0);
                    ui.add(egui::ProgressBar::new(progress.clamp(0.0, 1.0)).desired_width(384.0));
                });
            });
    }

    fn selection_modal(ctx: &egui::Context, selection: &Selection, actions: &mut UiActions) {
        egui::Area::new(egui::Id::new("selection_backdrop"))
            .fixed_pos(Pos2::ZERO)
            .order(egui::Order::Middle)
            .show(ctx, |ui| {
                let rect = ctx.screen_rect();
                ui.painter().rect_filled(rect, 0.0, Color32::from_black_alpha(250));
            });

        egui::Window::new("selection")
            .title_bar(false)
            .resizable(false)
            .collapsible(false)
            .order(egui::Order::Foreground)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .max_width(720.0)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.label(
                        RichText::new(format!("\"{}\"", selection.question))
                            .size(28.0)
                            .italics()
                            .color(Color32::WHITE),
                    );
                    ui.add_space(32.0);
                    ui.label(RichText::new(&selection.answer).size(20.0).color(Color32::WHITE));
                    ui.add_space(32.0);
                    if ui.button(RichText::new("DISCONNECT").strong()).clicked() {
                        actions.close_selection = true;
                    }
                });
            });

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            actions.close_selection = true;
        }
    }
}
