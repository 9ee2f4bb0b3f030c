//! # twinview render
//!
//! Scene description and wgpu rendering for a twinview pane.
//!
//! A [`Scene`] holds the meshes, lights and background of one pane. It is drawn
//! through a [`Camera`] by a [`SceneRenderer`]. [`PaneRenderer`] is the wgpu
//! implementation: it renders off-screen into a multisampled target and resolves
//! into a texture that the UI displays.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use twinview_render::{Camera, GpuContext, PaneRenderer, RenderConfig, Scene, SceneRenderer};
//!
//! async fn example() -> twinview_core::Result<()> {
//!     let gpu = Arc::new(GpuContext::new().await?);
//!     let mut renderer = PaneRenderer::new(gpu, RenderConfig::default(), 640.0, 480.0, 1.0);
//!     renderer.render(&Scene::default(), &Camera::default())?;
//!     Ok(())
//! }
//! ```

pub mod background;
pub mod camera;
pub mod capture;
pub mod color;
pub mod device;
pub mod light;
pub mod material;
pub mod mesh;
pub mod renderer;
pub mod scene;

pub use background::GradientBackground;
pub use camera::{Camera, CameraPose};
pub use capture::read_texture_rgba;
pub use color::Color;
pub use device::GpuContext;
pub use light::{Light, LightRig};
pub use material::{FaceSide, Material, DEFAULT_MESH_COLOR, DEFAULT_SHININESS, PLACEHOLDER_COLOR};
pub use mesh::{MeshVertex, PointInstance};
pub use renderer::{PaneRenderer, RenderConfig, SceneRenderer};
pub use scene::{ObjectId, Scene, SceneMesh};
