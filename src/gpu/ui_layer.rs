//! Overlay layer: winit events into egui, tessellated chrome painted over the scene.

use std::sync::Arc;

use winit::event::WindowEvent;
use winit::window::Window;

/// A tessellated overlay waiting for the next rendered frame.
struct PendingUi {
    paint_jobs: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
    pixels_per_point: f32,
}

pub struct UiLayer {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    pending: Option<PendingUi>,
    // Freed once the frame that last used them is submitted.
    retired: Vec<egui::TextureId>,
}

impl UiLayer {
    pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat, window: &Arc<Window>) -> Self {
        let ctx = egui::Context::default();

        // Translucent chrome over a black sky.
        let mut style = egui::Style::default();
        style.visuals = egui::Visuals::dark();
        style.visuals.window_shadow = egui::Shadow::NONE;
        style.visuals.popup_shadow = egui::Shadow::NONE;
        style.visuals.window_fill = egui::Color32::from_black_alpha(170);
        style.visuals.panel_fill = egui::Color32::TRANSPARENT;
        ctx.set_style(style);

        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window.as_ref(),
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let renderer = egui_wgpu::Renderer::new(device, output_format, None, 1, false);

        Self {
            ctx,
            state,
            renderer,
            pending: None,
            retired: Vec::new(),
        }
    }

    /// Feed a window event to egui. Returns true if the overlay consumed it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Whether the pointer is over overlay chrome.
    pub fn wants_pointer(&self) -> bool {
        self.ctx.wants_pointer_input() || self.ctx.is_pointer_over_area()
    }

    /// Build this frame's overlay with `build`; it is painted by the next
    /// [`paint`](Self::paint).
    pub fn run<R>(&mut self, window: &Window, build: impl FnOnce(&egui::Context) -> R) -> R {
        self.ctx.begin_pass(self.state.take_egui_input(window));
        let result = build(&self.ctx);
        let output = self.ctx.end_pass();

        self.state.handle_platform_output(window, output.platform_output);
        self.pending = Some(PendingUi {
            paint_jobs: self.ctx.tessellate(output.shapes, output.pixels_per_point),
            textures_delta: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
        });
        result
    }

    /// Record the pending overlay on top of `target`.
    ///
    /// Returns upload command buffers that must be submitted before `encoder`.
    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        size_in_pixels: [u32; 2],
    ) -> Vec<wgpu::CommandBuffer> {
        let Some(ui) = self.pending.take() else {
            return Vec::new();
        };
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels,
            pixels_per_point: ui.pixels_per_point,
        };

        for (id, delta) in &ui.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        let uploads = self
            .renderer
            .update_buffers(device, queue, encoder, &ui.paint_jobs, &screen);

        let mut pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("UI Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            })
            .forget_lifetime();
        self.renderer.render(&mut pass, &ui.paint_jobs, &screen);

        self.retired.extend(ui.textures_delta.free);
        uploads
    }

    /// Release textures egui dropped. Call after the frame is submitted.
    pub fn after_submit(&mut self) {
        for id in self.retired.drain(..) {
            self.renderer.free_texture(&id);
        }
    }
}
