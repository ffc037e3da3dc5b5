//! wgpu renderer: surface, depth buffer and the two scene passes.
//!
//! The window exists before the scene does (theme data loads first), so
//! [`GpuState`] starts with only a clear color and the UI. [`GpuState::load_scene`]
//! uploads the particle field once; node instances are re-uploaded every frame.

mod field_pass;
mod node_pass;

#[cfg(feature = "egui")]
mod ui_layer;

use std::sync::Arc;

use glam::Mat4;
use winit::window::Window;

use crate::error::GpuError;
use crate::field::ParticleField;
use crate::nodes::NodeInstance;
use crate::shading::ShadingTables;

#[cfg(feature = "egui")]
pub use ui_layer::UiLayer;
pub use field_pass::FieldPass;
pub use node_pass::NodePass;

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Glow blending: colors add up, nothing is occluded by a translucent point.
pub(crate) const ADDITIVE_BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

/// Per-frame camera, clock and node data.
pub struct SceneFrame<'a> {
    pub view: Mat4,
    pub proj: Mat4,
    pub time: f32,
    pub nodes: &'a [NodeInstance],
}

struct ScenePasses {
    field: FieldPass,
    nodes: NodePass,
}

pub struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    depth_texture: wgpu::TextureView,
    scene: Option<ScenePasses>,
    #[cfg(feature = "egui")]
    ui: UiLayer,
}

impl GpuState {
    pub async fn new(window: Arc<Window>, vsync: bool) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        log::info!("Using adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = create_depth_texture(&device, &config);

        #[cfg(feature = "egui")]
        let ui = UiLayer::new(&device, config.format, &window);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_texture,
            scene: None,
            #[cfg(feature = "egui")]
            ui,
        })
    }

    /// Upload the particle field and build both scene pipelines.
    pub fn load_scene(&mut self, field: &ParticleField, tables: &ShadingTables, node_count: usize) {
        let field_pass = FieldPass::new(&self.device, self.config.format, field, tables);
        let nodes = NodePass::new(&self.device, self.config.format, node_count);
        log::info!("Uploaded {} particles, {} node slots", field.len(), node_count);
        self.scene = Some(ScenePasses {
            field: field_pass,
            nodes,
        });
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = create_depth_texture(&self.device, &self.config);
        }
    }

    /// Reconfigure the surface at its current size after it was lost.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    #[cfg(feature = "egui")]
    pub fn ui(&mut self) -> &mut UiLayer {
        &mut self.ui
    }

    pub fn render(&mut self, frame: Option<&SceneFrame<'_>>) -> Result<(), wgpu::SurfaceError> {
        let viewport = glam::Vec2::new(self.config.width as f32, self.config.height as f32);
        if let (Some(scene), Some(frame)) = (self.scene.as_mut(), frame) {
            scene.field.update(&self.queue, frame, viewport);
            scene.nodes.update(&self.device, &self.queue, frame);
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        // Scene pass: opaque-ish nodes first, then the additive particle field.
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let (Some(scene), Some(_)) = (self.scene.as_ref(), frame) {
                scene.nodes.draw(&mut render_pass);
                scene.field.draw(&mut render_pass);
            }
        }

        #[cfg(feature = "egui")]
        let uploads = self.ui.paint(
            &self.device,
            &self.queue,
            &mut encoder,
            &view,
            [self.config.width, self.config.height],
        );
        #[cfg(not(feature = "egui"))]
        let uploads: Vec<wgpu::CommandBuffer> = Vec::new();

        self.queue
            .submit(uploads.into_iter().chain(std::iter::once(encoder.finish())));
        output.present();

        #[cfg(feature = "egui")]
        self.ui.after_submit();

        Ok(())
    }
}

fn create_depth_texture(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
