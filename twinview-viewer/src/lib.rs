//! Side-by-side viewer for ground truth and predicted models
//!
//! Two [`ViewerInstance`]s, one per [`Side`], each show one PLY model. Picking a
//! model name loads `<name>_gt.ply` into the left pane and `<name>_pred.ply` into
//! the right one:
//! - loads run in the background and are applied between frames
//! - a model that fails to load is replaced by a red placeholder sphere
//! - every loaded model is centered and scaled to a common size
//! - an orbit controller per pane, optionally mirrored to the other pane
//! - both panes can be saved as PNG snapshots

pub mod app;
pub mod capture;
pub mod config;
pub mod controls;
pub mod dispatch;
pub mod loader;
pub mod render_loop;
pub mod selection;
pub mod sync;
pub mod viewer;

pub use capture::{capture_path, save_capture};
pub use config::{AppConfig, Args, ControlsConfig, ViewerConfig};
pub use controls::OrbitControls;
pub use dispatch::{apply_completion, Applied, LoadCompletion, LoadDispatcher};
pub use loader::{build_mesh, placeholder_mesh, LoadError, LoadOutcome, ModelLoader};
pub use render_loop::{animate, FrameReport};
pub use selection::{model_url, Selection};
pub use sync::CameraSync;
pub use viewer::{create_viewer, Container, Side, ViewerInstance, Viewers};
