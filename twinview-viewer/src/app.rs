//! Desktop application: window, panels and the frame loop

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use egui::{Color32, PointerButton, Rect, Sense};
use twinview_io::{AssetCatalog, FsAssetSource};
use twinview_render::{GpuContext, PaneRenderer};
use winit::{
    dpi::LogicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::{Window, WindowBuilder},
};

use crate::capture::{capture_path, save_capture};
use crate::config::AppConfig;
use crate::dispatch::{apply_completion, Applied, LoadDispatcher};
use crate::loader::ModelLoader;
use crate::render_loop::animate;
use crate::selection::Selection;
use crate::sync::CameraSync;
use crate::viewer::{create_viewer, Container, Side, ViewerInstance, Viewers};

/// Points egui reports per mouse wheel notch
const SCROLL_POINTS_PER_STEP: f32 = 50.0;

const ERROR_COLOR: Color32 = Color32::from_rgb(0xff, 0x6b, 0x6b);

struct PaneTexture {
    id: egui::TextureId,
    revision: u64,
}

/// The running viewer application
pub struct App {
    window: Arc<Window>,
    gpu: Arc<GpuContext>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,

    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    pane_textures: HashMap<Side, PaneTexture>,

    viewers: Viewers<PaneRenderer>,
    sync: CameraSync,
    selection: Selection,
    dispatcher: LoadDispatcher<FsAssetSource>,
    errors: HashMap<Side, String>,
    auto_rotate: bool,
    capture_dir: PathBuf,
    capture_requested: bool,
    last_frame: Instant,

    // Must drop after the dispatcher
    _runtime: tokio::runtime::Runtime,
}

/// Open the window and run until it is closed
pub fn run(config: AppConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("twinview")
            .with_inner_size(LogicalSize::new(config.window_size.0 as f64, config.window_size.1 as f64))
            .build(&event_loop)
            .context("Failed to create window")?,
    );

    let mut app = App::new(window, &event_loop, config)?;
    tracing::info!("Viewer initialized");

    event_loop
        .run(move |event, target| {
            target.set_control_flow(ControlFlow::Wait);
            if let Event::WindowEvent { event, window_id } = event {
                if window_id == app.window.id() && !app.handle_window_event(&event) {
                    target.exit();
                }
            }
        })
        .context("Event loop error")?;

    Ok(())
}

impl App {
    fn new(window: Arc<Window>, event_loop: &EventLoop<()>, config: AppConfig) -> Result<Self> {
        let instance = GpuContext::create_instance();
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;
        let gpu = Arc::new(pollster::block_on(GpuContext::from_instance(instance, Some(&surface)))?);

        let caps = surface.get_capabilities(&gpu.adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("Surface reports no supported formats")?;
        let size = window.inner_size();
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &surface_config);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            event_loop,
            Some(window.scale_factor() as f32),
            Some(gpu.device.limits().max_texture_dimension_2d as usize),
        );
        let egui_renderer = egui_wgpu::Renderer::new(&gpu.device, format, None, 1);

        let scale = window.scale_factor() as f32;
        let logical = size.to_logical::<f32>(window.scale_factor());
        let make_viewer = |side: Side| -> Option<ViewerInstance<PaneRenderer>> {
            let container = Container::new(side.container_id(), logical.width / 2.0, logical.height, scale);
            let viewer = create_viewer(&container, &config.viewer, |c| {
                Ok(PaneRenderer::new(gpu.clone(), config.render.clone(), c.width, c.height, c.pixel_ratio))
            });
            match viewer {
                Ok(viewer) => Some(viewer),
                Err(error) => {
                    tracing::error!(%side, %error, "Failed to create viewer");
                    None
                }
            }
        };
        let mut viewers = Viewers::new(make_viewer(Side::GroundTruth), make_viewer(Side::Prediction));

        let mut sync = CameraSync::new();
        sync.set_enabled(config.sync_cameras);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("twinview-load")
            .enable_all()
            .build()
            .context("Failed to start loader runtime")?;

        let source = Arc::new(FsAssetSource::new(config.asset_root.clone()));
        let mut dispatcher = LoadDispatcher::new(runtime.handle().clone(), ModelLoader::new(source, config.read_options));

        let catalog = AssetCatalog::scan(config.models_dir()).unwrap_or_else(|error| {
            tracing::warn!(dir = %config.models_dir().display(), %error, "Could not list models");
            AssetCatalog::default()
        });
        tracing::info!(models = catalog.len(), "Model catalog loaded");

        let selection = Selection::new(catalog, config.base.clone(), config.initial_model.clone());
        selection.load_selected(&mut viewers, &mut dispatcher);

        Ok(Self {
            window,
            gpu,
            surface,
            surface_config,
            egui_ctx,
            egui_state,
            egui_renderer,
            pane_textures: HashMap::new(),
            viewers,
            sync,
            selection,
            dispatcher,
            errors: HashMap::new(),
            auto_rotate: config.viewer.controls.auto_rotate,
            capture_dir: config.captures_dir(),
            capture_requested: false,
            last_frame: Instant::now(),
            _runtime: runtime,
        })
    }

    /// Returns false once the window should close
    fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(&self.window, event);

        match event {
            WindowEvent::CloseRequested => return false,
            WindowEvent::Resized(size) => self.resize_surface(size.width, size.height),
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }

        if response.repaint {
            self.window.request_redraw();
        }
        true
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.gpu.device, &self.surface_config);
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.apply_completions();

        let raw_input = self.egui_state.take_egui_input(&self.window);
        let ctx = self.egui_ctx.clone();
        let full_output = ctx.run(raw_input, |ctx| self.ui(ctx));

        let report = animate(&mut self.viewers, &mut self.sync, delta);
        if report.errors > 0 {
            tracing::debug!(?report, "Frame finished with errors");
        }
        if std::mem::take(&mut self.capture_requested) {
            self.capture_panes();
        }
        self.refresh_pane_textures();

        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);
        self.paint(full_output.textures_delta, full_output.shapes, full_output.pixels_per_point);

        self.window.request_redraw();
    }

    fn apply_completions(&mut self) {
        for completion in self.dispatcher.try_completions() {
            let side = completion.side;
            match apply_completion(&mut self.viewers, completion) {
                Applied::Loaded => {
                    self.errors.remove(&side);
                }
                Applied::Failed(message) => {
                    self.errors.insert(side, message);
                }
                Applied::Stale | Applied::NoViewer => {}
            }
        }
    }

    fn ui(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Model:");
                let mut chosen = None;
                egui::ComboBox::from_id_source("model-select")
                    .selected_text(self.selection.selected().unwrap_or("(none)").to_string())
                    .show_ui(ui, |ui| {
                        for name in self.selection.catalog().names() {
                            let is_selected = self.selection.selected() == Some(name.as_str());
                            if ui.selectable_label(is_selected, name.as_str()).clicked() {
                                chosen = Some(name.clone());
                            }
                        }
                    });
                if let Some(name) = chosen {
                    if self.selection.select(name) {
                        self.errors.clear();
                        self.selection.load_selected(&mut self.viewers, &mut self.dispatcher);
                    }
                }

                ui.separator();

                let mut sync_enabled = self.sync.is_enabled();
                if ui.checkbox(&mut sync_enabled, "Sync cameras").changed() {
                    self.sync.set_enabled(sync_enabled);
                }

                if ui.checkbox(&mut self.auto_rotate, "Auto-rotate").changed() {
                    for (_, viewer) in self.viewers.iter_mut() {
                        viewer.controls.config.auto_rotate = self.auto_rotate;
                    }
                }

                if ui.button("Reset view").clicked() {
                    for (_, viewer) in self.viewers.iter_mut() {
                        viewer.controls.reset(&mut viewer.camera);
                    }
                }

                let can_capture = self.selection.selected().is_some();
                if ui.add_enabled(can_capture, egui::Button::new("Capture")).clicked() {
                    self.capture_requested = true;
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.columns(2, |columns| {
                for (column, side) in columns.iter_mut().zip(Side::ALL) {
                    self.pane_ui(column, side);
                }
            });
        });
    }

    fn pane_ui(&mut self, ui: &mut egui::Ui, side: Side) {
        ui.horizontal(|ui| {
            ui.strong(side.label());
            if self.viewers.get(side).is_some_and(|v| v.is_loading()) {
                ui.spinner();
            }
            if let Some(error) = self.errors.get(&side) {
                ui.colored_label(ERROR_COLOR, error.as_str());
            }
        });

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let pixels_per_point = ui.ctx().pixels_per_point();

        let Some(viewer) = self.viewers.get_mut(side) else {
            ui.painter().rect_filled(rect, 0.0, Color32::BLACK);
            return;
        };

        viewer.resize(&Container::new(side.container_id(), rect.width(), rect.height(), pixels_per_point));

        let drag = response.drag_delta();
        if response.dragged_by(PointerButton::Primary) {
            viewer.controls.rotate(drag.x, drag.y, rect.height());
        } else if response.dragged_by(PointerButton::Secondary) || response.dragged_by(PointerButton::Middle) {
            viewer.controls.pan(drag.x, drag.y, rect.height(), &viewer.camera);
        }
        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                viewer.controls.zoom(scroll / SCROLL_POINTS_PER_STEP);
            }
        }

        if let Some(texture) = self.pane_textures.get(&side) {
            let uv = Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
            ui.painter().image(texture.id, rect, uv, Color32::WHITE);
        }
    }

    /// Save the frame each pane just rendered
    fn capture_panes(&mut self) {
        let Some(name) = self.selection.selected() else {
            return;
        };
        for side in Side::ALL {
            let Some(viewer) = self.viewers.get(side) else {
                continue;
            };
            let path = capture_path(&self.capture_dir, name, side);
            let result = viewer
                .renderer
                .capture()
                .map_err(anyhow::Error::from)
                .and_then(|image| save_capture(&image, &path));
            if let Err(error) = result {
                tracing::error!(%side, error = format!("{:#}", error), "Capture failed");
                self.errors.insert(side, format!("capture failed: {}", error));
            }
        }
    }

    /// Point egui at each pane's current output texture
    fn refresh_pane_textures(&mut self) {
        for side in Side::ALL {
            let Some(viewer) = self.viewers.get(side) else {
                continue;
            };
            let Some(view) = viewer.renderer.output_view() else {
                continue;
            };
            let revision = viewer.renderer.output_revision();

            match self.pane_textures.get_mut(&side) {
                Some(texture) if texture.revision == revision => {}
                Some(texture) => {
                    self.egui_renderer.update_egui_texture_from_wgpu_texture(
                        &self.gpu.device,
                        view,
                        wgpu::FilterMode::Linear,
                        texture.id,
                    );
                    texture.revision = revision;
                }
                None => {
                    let id = self
                        .egui_renderer
                        .register_native_texture(&self.gpu.device, view, wgpu::FilterMode::Linear);
                    self.pane_textures.insert(side, PaneTexture { id, revision });
                }
            }
        }
    }

    fn paint(&mut self, textures_delta: egui::TexturesDelta, shapes: Vec<egui::epaint::ClippedShape>, pixels_per_point: f32) {
        let device = &self.gpu.device;
        let queue = &self.gpu.queue;

        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer.update_texture(device, queue, *id, image_delta);
        }
        let paint_jobs = self.egui_ctx.tessellate(shapes, pixels_per_point);

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(device, &self.surface_config);
                return;
            }
            Err(error) => {
                tracing::warn!(%error, "Failed to acquire surface texture");
                return;
            }
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.surface_config.width, self.surface_config.height],
            pixels_per_point,
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("UI Encoder"),
        });
        let user_buffers = self
            .egui_renderer
            .update_buffers(device, queue, &mut encoder, &paint_jobs, &screen_descriptor);

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("UI Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        queue.submit(user_buffers.into_iter().chain(std::iter::once(encoder.finish())));
        frame.present();

        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}
