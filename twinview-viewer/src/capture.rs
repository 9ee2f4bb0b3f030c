//! Pane snapshots
//!
//! Each capture writes one PNG per pane, named like the model files:
//! `<dir>/<name>_gt.png` and `<dir>/<name>_pred.png`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbaImage;

use crate::viewer::Side;

pub const CAPTURE_EXTENSION: &str = "png";

/// File a snapshot of `side` for model `name` is written to
pub fn capture_path(dir: &Path, name: &str, side: Side) -> PathBuf {
    dir.join(format!("{}{}.{}", name, side.suffix(), CAPTURE_EXTENSION))
}

/// Write `image` to `path`, creating missing directories
pub fn save_capture(image: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create capture directory {}", parent.display()))?;
    }
    image
        .save(path)
        .with_context(|| format!("Failed to write capture {}", path.display()))?;

    tracing::info!(path = %path.display(), width = image.width(), height = image.height(), "Saved capture");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_paths() {
        let dir = Path::new("assets/captures");
        assert_eq!(
            capture_path(dir, "chair", Side::GroundTruth),
            PathBuf::from("assets/captures/chair_gt.png")
        );
        assert_eq!(
            capture_path(dir, "chair", Side::Prediction),
            PathBuf::from("assets/captures/chair_pred.png")
        );
    }

    #[test]
    fn test_save_capture_creates_directories() {
        let root = std::env::temp_dir().join(format!("twinview_capture_{}", std::process::id()));
        let path = capture_path(&root.join("nested"), "cube", Side::GroundTruth);

        let image = RgbaImage::from_pixel(3, 2, image::Rgba([26, 26, 46, 255]));
        save_capture(&image, &path).unwrap();

        let read = image::open(&path).unwrap().to_rgba8();
        assert_eq!(read.dimensions(), (3, 2));
        assert_eq!(read.get_pixel(2, 1), &image::Rgba([26, 26, 46, 255]));

        let _ = std::fs::remove_dir_all(&root);
    }
}
