//! Window, event loop and the per-frame update order.

use std::sync::Arc;

use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::audio::AmbientAudio;
use crate::camera::OrbitCamera;
use crate::config::CosmosConfig;
use crate::error::AppError;
use crate::field::generate_field;
use crate::focus::{InteractionState, Selection};
use crate::galaxy::{galaxies, theme_of};
use crate::gpu::{GpuState, SceneFrame};
use crate::input::Input;
use crate::nodes::{NodeInstance, NodeLayer};
use crate::oracle::{self, OracleDesk};
#[cfg(feature = "egui")]
use crate::overlay::{Overlay, OverlayView};
use crate::overlay::UiActions;
use crate::shading::ShadingTables;
use crate::themes::{LoadStatus, StaticThemes, ThemeLoader, ThemeSource};
use crate::time::FrameClock;

/// Open the window and run until it is closed.
pub fn run(config: CosmosConfig) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct Scene {
    layer: NodeLayer,
    instances: Vec<NodeInstance>,
}

struct App {
    config: CosmosConfig,
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    fatal: Option<AppError>,

    input: Input,
    clock: FrameClock,
    camera: OrbitCamera,
    interaction: InteractionState,
    loader: Option<ThemeLoader>,
    progress: f32,
    scene: Option<Scene>,
    oracle: OracleDesk,
    audio: AmbientAudio,
    #[cfg(feature = "egui")]
    overlay: Overlay,
    show_hint: bool,
}

impl App {
    fn new(config: CosmosConfig) -> Self {
        let generator = oracle::connect(&config.oracle);

        let interaction = InteractionState::new(config.framing, config.layout.node_radius);
        let audio = AmbientAudio::from_config(&config.audio);

        Self {
            window: None,
            gpu_state: None,
            fatal: None,
            input: Input::new(),
            clock: FrameClock::new(),
            camera: OrbitCamera::default(),
            interaction,
            loader: None,
            progress: 0.0,
            scene: None,
            oracle: OracleDesk::new(generator),
            audio,
            #[cfg(feature = "egui")]
            overlay: Overlay::new(),
            show_hint: true,
            config,
        }
    }

    fn theme_source(&self) -> Arc<dyn ThemeSource + Send + Sync> {
        match &self.config.themes {
            Some(path) => match StaticThemes::from_path(path) {
                Ok(themes) => Arc::new(themes),
                Err(e) => {
                    log::warn!("Could not read themes from {}: {}", path.display(), e);
                    Arc::new(StaticThemes::builtin())
                }
            },
            None => Arc::new(StaticThemes::builtin()),
        }
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let window_attrs = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu_state = pollster::block_on(GpuState::new(window.clone(), self.config.window.vsync))?;

        let (width, height) = gpu_state.size();
        self.input.set_window_size(width, height);
        self.window = Some(window);
        self.gpu_state = Some(gpu_state);
        self.loader = Some(ThemeLoader::spawn(self.theme_source()));
        Ok(())
    }

    /// Generate the field and lay out nodes once theme data has arrived.
    fn build_scene(&mut self, themes: crate::themes::ThemeSet) {
        let galaxies = galaxies();
        let field = generate_field(&self.config.field, &mut rand::thread_rng());
        let tables = ShadingTables::from_galaxies(&galaxies);
        let layer = NodeLayer::build(
            &galaxies,
            themes.iter().map(|(id, list)| (*id, list.as_slice())),
            &self.config.layout,
        );

        if let Some(gpu_state) = &mut self.gpu_state {
            gpu_state.load_scene(&field, &tables, layer.all_nodes().len());
        }
        log::info!(
            "Scene ready: {} particles, {} nodes",
            field.len(),
            layer.all_nodes().len()
        );

        self.clock.restart();
        self.scene = Some(Scene {
            instances: Vec::with_capacity(layer.all_nodes().len()),
            layer,
        });
    }

    fn scale_factor(&self) -> f32 {
        self.window.as_ref().map_or(1.0, |w| w.scale_factor() as f32)
    }

    #[cfg(feature = "egui")]
    fn ui_wants_pointer(&mut self) -> bool {
        self.gpu_state
            .as_mut()
            .is_some_and(|gpu| gpu.ui().wants_pointer())
    }

    #[cfg(not(feature = "egui"))]
    fn ui_wants_pointer(&mut self) -> bool {
        false
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        if self.clock.tick() {
            log::debug!("{:.1} fps", self.clock.fps());
        }

        if let Some(loader) = &mut self.loader {
            match loader.poll() {
                LoadStatus::Loading(p) => self.progress = p,
                LoadStatus::Done(themes) => {
                    self.loader = None;
                    self.progress = 1.0;
                    self.build_scene(themes);
                }
            }
        }

        let Some(aspect) = self.gpu_state.as_ref().map(GpuState::aspect) else {
            return;
        };
        let viewport_height = self.input_viewport().y;
        let scale = self.scale_factor();
        let ui_pointer = self.ui_wants_pointer();

        if self.scene.is_some() {
            let drag = self.input.drag_delta();
            if drag != Vec2::ZERO {
                self.camera.rotate_by_pixels(drag.x, drag.y, viewport_height);
            }
            let scroll = self.input.scroll_delta();
            if scroll != 0.0 {
                self.camera.zoom(scroll);
            }
            if self.input.manual_camera() {
                self.interaction.rig.cancel_transition();
                self.show_hint = false;
            }
        }

        self.audio.poll();
        if self.input.user_gesture() {
            self.audio.on_user_gesture();
        }

        if self.input.escape_pressed() {
            if self.interaction.selection().is_some() {
                self.interaction.close_selection();
            } else {
                self.interaction.reset();
            }
        }

        if self.scene.is_some() {
            self.interaction.rig.step(&mut self.camera);
            self.camera.auto_rotate = self.interaction.auto_rotate();
            self.camera.update();
        }

        let time = self.clock.elapsed();
        let view = self.camera.view_matrix();
        let proj = self.camera.projection(aspect);

        if let Some(scene) = &mut self.scene {
            scene.layer.instances(time, &mut scene.instances);

            let ray = self.camera.ray_through(self.input.pointer_ndc(), aspect);
            let anchor = self.input.pointer() / scale;

            if self.input.clicked().is_some() && !ui_pointer {
                self.interaction.click(&ray, anchor, &scene.layer);
            }

            if ui_pointer || !self.input.pointer_inside() {
                self.interaction.clear_hover();
            } else {
                self.interaction.update_hover(&ray, anchor, &scene.layer);
            }
        }

        if let Some(answer) = self.oracle.poll() {
            let center = self.input_viewport() / (2.0 * scale);
            self.interaction.open_selection(Selection {
                question: answer.question,
                answer: answer.answer,
                anchor: center,
            });
        }

        let actions = self.draw_overlay();
        self.apply_ui(actions);

        self.render(event_loop, time, view, proj);
        self.input.begin_frame();
    }

    fn input_viewport(&self) -> Vec2 {
        self.gpu_state.as_ref().map_or(Vec2::ONE, |gpu| {
            let (w, h) = gpu.size();
            Vec2::new(w as f32, h as f32)
        })
    }

    #[cfg(feature = "egui")]
    fn draw_overlay(&mut self) -> UiActions {
        let (Some(window), Some(gpu_state)) = (self.window.as_ref(), self.gpu_state.as_mut()) else {
            return UiActions::default();
        };
        let view = OverlayView {
            loading: self.scene.is_none().then_some(self.progress),
            focus: self.interaction.focus(),
            hover: self.interaction.hover(),
            selection: self.interaction.selection(),
            asking: self.oracle.is_asking(),
            volume: self.audio.volume(),
            muted: self.audio.is_muted(),
            show_hint: self.show_hint,
        };

        let overlay = &mut self.overlay;
        gpu_state.ui().run(window, |ctx| overlay.show(ctx, &view))
    }

    #[cfg(not(feature = "egui"))]
    fn draw_overlay(&mut self) -> UiActions {
        UiActions::default()
    }

    fn apply_ui(&mut self, actions: UiActions) {
        if actions.reset {
            self.interaction.reset();
        }
        if actions.close_selection {
            self.interaction.close_selection();
        }
        if actions.toggle_mute {
            self.audio.toggle_mute();
        }
        if let Some(volume) = actions.set_volume {
            self.audio.set_volume(volume);
        }
        if let Some(question) = actions.submit_query {
            let Some(galaxy) = self.interaction.focus().galaxy() else {
                return;
            };
            if let Err(e) = self.oracle.submit(&question, theme_of(galaxy)) {
                log::debug!("Query not sent: {:?}", e);
            }
        }
    }

    fn render(
        &mut self,
        event_loop: &ActiveEventLoop,
        time: f32,
        view: glam::Mat4,
        proj: glam::Mat4,
    ) {
        let Some(gpu_state) = &mut self.gpu_state else {
            return;
        };
        let nodes = self.scene.as_ref().map_or(&[][..], |s| s.instances.as_slice());
        let frame = SceneFrame {
            view,
            proj,
            time,
            nodes,
        };

        match gpu_state.render(Some(&frame)) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => gpu_state.reconfigure(),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory");
                event_loop.exit();
            }
            Err(e) => log::warn!("Render error: {:?}", e),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.create_window(event_loop) {
            log::error!("{}", e);
            self.fatal = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let consumed = self.forward_to_ui(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                    let (width, height) = gpu_state.size();
                    self.input.set_window_size(width, height);
                }
            }
            WindowEvent::RedrawRequested => {
                self.frame(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::CursorMoved { .. }
            | WindowEvent::CursorLeft { .. }
            | WindowEvent::MouseInput {
                state: ElementState::Released,
                ..
            } => self.input.handle_event(&event),
            _ if !consumed => self.input.handle_event(&event),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl App {
    #[cfg(feature = "egui")]
    fn forward_to_ui(&mut self, event: &WindowEvent) -> bool {
        match (self.window.as_ref(), self.gpu_state.as_mut()) {
            (Some(window), Some(gpu_state)) => gpu_state.ui().on_window_event(window, event),
            _ => false,
        }
    }

    #[cfg(not(feature = "egui"))]
    fn forward_to_ui(&mut self, _event: &WindowEvent) -> bool {
        false
    }
}
