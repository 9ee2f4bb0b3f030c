//! Viewer configuration and command line options

use std::path::PathBuf;

use clap::Parser;
use nalgebra::{Point3, Vector3};
use twinview_io::PlyReadOptions;
use twinview_render::{GradientBackground, LightRig, RenderConfig};

/// Orbit controller tuning
#[derive(Debug, Clone, PartialEq)]
pub struct ControlsConfig {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub auto_rotate: bool,
    /// Seconds per full turn while auto-rotating
    pub auto_rotate_period: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 0.8,
            zoom_speed: 1.2,
            pan_speed: 0.8,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            auto_rotate: false,
            auto_rotate_period: 6.0,
        }
    }
}

/// Everything a viewer instance is built from
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Camera position after every load
    pub home_position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub lights: LightRig,
    pub background: GradientBackground,
    pub controls: ControlsConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fov: 45.0,
            near: 0.1,
            far: 1000.0,
            home_position: Point3::new(0.0, 0.0, 3.0),
            target: Point3::origin(),
            up: Vector3::y(),
            lights: LightRig::default(),
            background: GradientBackground::default(),
            controls: ControlsConfig::default(),
        }
    }
}

/// Command line options of the `twinview` binary
#[derive(Parser, Debug, Clone)]
#[command(name = "twinview")]
#[command(about = "Compare ground truth and predicted PLY models side by side")]
#[command(version)]
pub struct Args {
    /// Directory that model URLs are resolved against
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// URL prefix of the model files
    #[arg(long, default_value = "assets/models")]
    pub base: String,

    /// Model to show first (defaults to the first one found)
    #[arg(long)]
    pub model: Option<String>,

    /// Mirror camera movement between the two panes
    #[arg(long)]
    pub sync_cameras: bool,

    /// Slowly spin both models
    #[arg(long)]
    pub auto_rotate: bool,

    /// Color vertices by a scalar property when a file has no colors
    #[arg(long)]
    pub colormap_scalars: bool,

    /// Where "Capture" writes pane snapshots, relative to the root
    #[arg(long, default_value = "assets/captures")]
    pub capture_dir: PathBuf,

    /// Initial window width
    #[arg(long, default_value_t = 1400)]
    pub width: u32,

    /// Initial window height
    #[arg(long, default_value_t = 700)]
    pub height: u32,
}

/// Runtime configuration of the application
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub asset_root: PathBuf,
    pub base: String,
    pub initial_model: Option<String>,
    pub sync_cameras: bool,
    pub read_options: PlyReadOptions,
    pub window_size: (u32, u32),
    pub capture_dir: PathBuf,
    pub viewer: ViewerConfig,
    pub render: RenderConfig,
}

impl AppConfig {
    /// Directory the model catalog is scanned from
    pub fn models_dir(&self) -> PathBuf {
        self.asset_root.join(&self.base)
    }

    /// Directory pane snapshots are written to
    pub fn captures_dir(&self) -> PathBuf {
        self.asset_root.join(&self.capture_dir)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("."),
            base: "assets/models".to_string(),
            initial_model: None,
            sync_cameras: false,
            read_options: PlyReadOptions::default(),
            window_size: (1400, 700),
            capture_dir: PathBuf::from("assets/captures"),
            viewer: ViewerConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl From<Args> for AppConfig {
    fn from(args: Args) -> Self {
        let mut config = AppConfig {
            asset_root: args.root,
            base: args.base,
            initial_model: args.model,
            sync_cameras: args.sync_cameras,
            window_size: (args.width.max(1), args.height.max(1)),
            capture_dir: args.capture_dir,
            ..Default::default()
        };
        config.read_options.colormap_scalars = args.colormap_scalars;
        config.viewer.controls.auto_rotate = args.auto_rotate;
        config
    }
}
