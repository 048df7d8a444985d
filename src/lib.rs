//! # Shape Lab
//!
//! One primitive in a window, a panel to poke at it, and a frame-rate readout.
//!
//! The window shows a cube, sphere or torus with an unlit textured material
//! over a solid background. A collapsible control panel in the top-right
//! corner edits position, scale, transparency, face culling, shape, texture,
//! visibility, wireframe, color and spin; an orbit camera follows pointer,
//! wheel and touch input; a small overlay in the top-left corner graphs FPS.
//!
//! ```no_run
//! use shape_lab::{AppConfig, run};
//!
//! fn main() -> Result<(), shape_lab::AppError> {
//!     run(AppConfig::from_env().title("Shapes"))
//! }
//! ```
//!
//! The scene model is usable without a window. Geometry uploads go through
//! [`GeometryBackend`], so anything that can hand out [`MeshId`]s can drive
//! it, and [`Panel::dispatch`] is the single entry point for edits:
//!
//! ```
//! use shape_lab::{Color, NumericRange};
//!
//! let range = NumericRange::new(0.1, 10.0, 0.05);
//! assert_eq!(range.commit(15.0), 10.0);
//! assert_eq!(Color::from_hex(0xf68002).to_hex(), 0xf68002);
//! ```

mod animation;
mod app;
mod assets;
mod camera;
mod color;
mod draw2d;
mod geometry;
mod gpu;
mod input;
mod loader;
mod mesh;
mod orbit_camera;
mod panel;
mod renderer;
mod scene;
mod stats;
mod texture;
mod ui;

pub use animation::{Easing, SpinTween, Tweens};
pub use app::{AppConfig, AppContext, AppError, run};
pub use assets::{AssetError, Assets, FontAtlas, FontId, GlyphInfo, find_font};
pub use camera::Camera;
pub use color::{Color, Rect};
pub use draw2d::{Draw2d, Vertex2d};
pub use geometry::{GeometryBackend, GeometryKind, MeshId, RawGeometry};
pub use gpu::{GpuContext, GpuError, MAX_PIXEL_RATIO, Viewport};
pub use input::Input;
pub use loader::{LoadEvent, LoadState, TextureLoader};
pub use mesh::{GpuMeshes, Mesh, MeshStore, Transform, Vertex3d};
pub use orbit_camera::OrbitCamera;
pub use panel::{
    Binding, Control, ControlError, ControlTarget, Folder, NumericRange, Panel, Setter, Shortcut,
    Value, Widget,
};
pub use renderer::{FrameInput, PipelineKey, RenderError, Renderer};
pub use scene::{AnimationState, BACKGROUND, FaceMode, Material, Scene, SceneObject};
pub use stats::{FrameStats, Series};
pub use texture::{DecodedImage, Texture, TextureError, TextureKey};
pub use ui::{PANEL_WIDTH, PanelView, ROW_HEIGHT, Row, RowKind};

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3};
