//! Gradient scene background

use crate::color::Color;
use image::{Rgba, RgbaImage};

/// A vertical two-stop gradient
#[derive(Debug, Clone, PartialEq)]
pub struct GradientBackground {
    pub top: Color,
    pub bottom: Color,
    /// Texture height in pixels; the width is always 2
    pub resolution: u32,
}

impl GradientBackground {
    pub fn new(top: Color, bottom: Color) -> Self {
        Self {
            top,
            bottom,
            resolution: 256,
        }
    }

    /// Rasterize the gradient into an RGBA image, top row first
    pub fn to_image(&self) -> RgbaImage {
        let height = self.resolution.max(2);
        RgbaImage::from_fn(2, height, |_, y| {
            let t = y as f32 / (height - 1) as f32;
            let [r, g, b] = self.top.lerp(self.bottom, t).to_rgb8();
            Rgba([r, g, b, 255])
        })
    }
}

impl Default for GradientBackground {
    fn default() -> Self {
        Self::new(Color::from_hex(0x1a1a2e), Color::from_hex(0x0f0f1e))
    }
}
