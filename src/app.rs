use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use crate::assets::{self, Assets, FontId};
use crate::draw2d::Draw2d;
use crate::gpu::{GpuContext, GpuError, Viewport};
use crate::input::Input;
use crate::loader::TextureLoader;
use crate::mesh::{GpuMeshes, MeshStore};
use crate::orbit_camera::OrbitCamera;
use crate::panel::{ControlTarget, Panel, Shortcut};
use crate::renderer::{FrameInput, RenderError, Renderer};
use crate::scene::Scene;
use crate::stats::FrameStats;
use crate::texture::{Texture, TextureKey};
use crate::ui::PanelView;

/// Panel text size in logical pixels.
const PANEL_FONT_SIZE: f32 = 12.0;
/// Overlay text size in logical pixels.
const STATS_FONT_SIZE: f32 = 9.0;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Startup configuration.
///
/// ```
/// use shape_lab::AppConfig;
///
/// let config = AppConfig::new().title("Shapes").size(1280, 720);
/// assert_eq!((config.width, config.height), (1280, 720));
/// ```
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Directory the texture manifest is resolved against.
    pub asset_root: PathBuf,
    /// Font for the panel and overlay; system fonts are probed when unset.
    pub font_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Shape Lab".to_string(),
            width: 800,
            height: 600,
            asset_root: PathBuf::from("assets"),
            font_path: None,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, overridden by `SHAPE_LAB_ASSETS` and `SHAPE_LAB_FONT`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(root) = std::env::var_os("SHAPE_LAB_ASSETS") {
            config.asset_root = PathBuf::from(root);
        }
        if let Some(font) = std::env::var_os("SHAPE_LAB_FONT") {
            config.font_path = Some(PathBuf::from(font));
        }
        config
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }
}

/// Application state shared by the panel, the loop and the camera rig.
pub struct AppContext {
    pub scene: Scene,
    pub panel: Panel,
    pub panel_view: PanelView,
    pub rig: OrbitCamera,
    pub stats: FrameStats,
    pub loader: TextureLoader<Texture>,
}

/// Fonts at the current pixel ratio.
struct Fonts {
    assets: Assets,
    panel: Option<FontId>,
    stats: Option<FontId>,
}

impl Fonts {
    fn load(gpu: &GpuContext, configured: Option<&std::path::Path>, pixel_ratio: f32) -> Self {
        let mut assets = Assets::new();
        let Some(path) = assets::find_font(configured) else {
            log::warn!("no font found, panel and overlay will draw without text");
            return Self {
                assets,
                panel: None,
                stats: None,
            };
        };

        let mut load = |size: f32| match assets.load_font(gpu, &path, size * pixel_ratio) {
            Ok(id) => Some(id),
            Err(err) => {
                log::warn!("{err}");
                None
            }
        };
        let panel = load(PANEL_FONT_SIZE);
        let stats = load(STATS_FONT_SIZE);
        if panel.is_some() {
            log::info!("loaded font {}", path.display());
        }

        Self {
            assets,
            panel,
            stats,
        }
    }
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    viewport: Viewport,
    renderer: Renderer,
    draw_2d: Draw2d,
    fonts: Fonts,
    font_path: Option<PathBuf>,
    meshes: MeshStore,
    input: Input,
    ctx: AppContext,
    start_time: Instant,
}

impl Running {
    fn new(event_loop: &ActiveEventLoop, config: &AppConfig) -> Result<Self, AppError> {
        let attributes = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        let window = Arc::new(event_loop.create_window(attributes)?);

        let size = window.inner_size();
        let viewport = Viewport::new(size.width, size.height, window.scale_factor());
        let gpu = GpuContext::new(window.clone(), &viewport)?;

        let renderer = Renderer::new(&gpu);
        let draw_2d = Draw2d::new(&gpu);
        let fonts = Fonts::load(&gpu, config.font_path.as_deref(), viewport.pixel_ratio());

        let mut meshes = MeshStore::new();
        let scene = Scene::new(&mut GpuMeshes {
            gpu: &gpu,
            store: &mut meshes,
        });

        log::info!("loading textures from {}", config.asset_root.display());
        let loader = TextureLoader::spawn(TextureKey::manifest(&config.asset_root));

        let ctx = AppContext {
            scene,
            panel: Panel::new(),
            panel_view: PanelView::new(viewport.pixel_ratio()),
            rig: OrbitCamera::new(),
            stats: FrameStats::new(),
            loader,
        };

        Ok(Self {
            window,
            gpu,
            viewport,
            renderer,
            draw_2d,
            fonts,
            font_path: config.font_path.clone(),
            meshes,
            input: Input::new(),
            ctx,
            start_time: Instant::now(),
        })
    }

    /// Apply a new window size or density to the surface, camera and panel.
    fn resize(&mut self, viewport: Viewport) {
        let ratio_changed = viewport.pixel_ratio() != self.viewport.pixel_ratio();
        self.viewport = viewport;
        if viewport.is_empty() {
            return;
        }

        let (width, height) = viewport.render_size();
        self.gpu.resize(width, height);
        self.renderer.ensure_depth_size(&self.gpu);

        if ratio_changed {
            log::debug!("pixel ratio now {}", viewport.pixel_ratio());
            self.ctx.panel_view.set_scale(viewport.pixel_ratio());
            self.fonts = Fonts::load(&self.gpu, self.font_path.as_deref(), viewport.pixel_ratio());
            self.draw_2d.forget_fonts();
        }
    }

    fn redraw(&mut self) -> Result<(), RenderError> {
        let Self {
            window,
            gpu,
            viewport,
            renderer,
            draw_2d,
            fonts,
            meshes,
            input,
            ctx,
            start_time,
            ..
        } = self;

        let gpu: &GpuContext = gpu;
        let input: &Input = input;
        let frame_start = Instant::now();
        let now = frame_start.duration_since(*start_time).as_secs_f64();

        ctx.loader
            .poll(|key, image| Texture::from_decoded(gpu, key, image));

        let surface_width = gpu.width() as f32;
        let pointer = viewport.to_render(input.mouse_position());
        let captured = {
            let mut backend = GpuMeshes {
                gpu,
                store: &mut *meshes,
            };
            let mut target = ControlTarget {
                scene: &mut ctx.scene,
                meshes: &mut backend,
                now,
            };

            for key in input.typed() {
                if let Some(shortcut) = Shortcut::from_key(key) {
                    if let Err(err) = ctx.panel.shortcut(shortcut, &mut target) {
                        log::warn!("shortcut {key:?}: {err}");
                    }
                }
            }

            ctx.panel_view
                .update(&mut ctx.panel, input, pointer, &mut target, surface_width)
        };

        if input.double_clicked() && !captured {
            toggle_fullscreen(window);
        }

        ctx.scene.advance_frame(now);
        ctx.rig
            .update(input, viewport.physical_height as f32, captured);

        draw_2d.clear();
        draw_2d.update_font_bind_groups(gpu, &fonts.assets);
        ctx.panel_view.draw(
            &ctx.panel,
            &ctx.scene,
            draw_2d,
            &fonts.assets,
            fonts.panel,
            surface_width,
        );
        ctx.stats
            .draw(draw_2d, &fonts.assets, fonts.stats, viewport.pixel_ratio());

        let camera = ctx.rig.camera();
        renderer.render(
            gpu,
            FrameInput {
                scene: &ctx.scene,
                camera: &camera,
                aspect: viewport.aspect(),
                meshes: &*meshes,
                textures: &ctx.loader,
                overlay: draw_2d,
                now,
            },
        )?;

        ctx.stats.update(frame_start);
        Ok(())
    }
}

/// Borderless fullscreen on the current monitor, or back to windowed.
/// Platforms without fullscreen ignore the request.
fn toggle_fullscreen(window: &Window) {
    let next = match window.fullscreen() {
        Some(_) => None,
        None => Some(Fullscreen::Borderless(None)),
    };
    window.set_fullscreen(next);
}

enum AppState {
    Pending { config: AppConfig },
    Running(Box<Running>),
    Exited,
}

struct ShapeLabApp {
    state: AppState,
    error: Option<AppError>,
}

impl ShapeLabApp {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: AppError) {
        log::error!("{error}");
        self.error = Some(error);
        self.state = AppState::Exited;
        event_loop.exit();
    }
}

impl ApplicationHandler for ShapeLabApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let AppState::Pending { config } = &self.state else {
            return;
        };
        match Running::new(event_loop, config) {
            Ok(running) => {
                running.window.request_redraw();
                self.state = AppState::Running(Box::new(running));
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let AppState::Running(app) = &mut self.state else {
            return;
        };

        app.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { .. } if app.input.key_pressed(KeyCode::Escape) => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let viewport = Viewport::new(size.width, size.height, app.window.scale_factor());
                app.resize(viewport);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let size = app.window.inner_size();
                app.resize(Viewport::new(size.width, size.height, scale_factor));
            }
            WindowEvent::RedrawRequested => {
                if !app.viewport.is_empty() {
                    if let Err(err) = app.redraw() {
                        self.fail(event_loop, err.into());
                        return;
                    }
                }
                app.input.begin_frame();
                app.window.request_redraw();
            }
            _ => {}
        }
    }
}

/// Open the window and run until it is closed.
///
/// Returns the first fatal error: window or GPU setup, or a surface failure
/// during rendering.
pub fn run(config: AppConfig) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ShapeLabApp {
        state: AppState::Pending { config },
        error: None,
    };
    event_loop.run_app(&mut app)?;

    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_the_window_contract() {
        let config = AppConfig::default();
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.asset_root, PathBuf::from("assets"));
        assert!(config.font_path.is_none());
    }

    #[test]
    fn builder_overrides_fields() {
        let config = AppConfig::new()
            .asset_root("/srv/textures")
            .font_path("fonts/ui.ttf");
        assert_eq!(config.asset_root, PathBuf::from("/srv/textures"));
        assert_eq!(config.font_path, Some(PathBuf::from("fonts/ui.ttf")));
    }
}
