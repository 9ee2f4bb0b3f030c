//! Surface materials

use crate::color::Color;

/// Flat color for meshes that carry no per-vertex colors
pub const DEFAULT_MESH_COLOR: Color = Color::from_hex(0x4196c8);

/// Color of the sphere shown when a model fails to load
pub const PLACEHOLDER_COLOR: Color = Color::from_hex(0xff6b6b);

pub const DEFAULT_SHININESS: f32 = 30.0;

/// Which triangle faces are rasterized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaceSide {
    #[default]
    Front,
    Double,
}

/// Phong material
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub color: Color,
    /// Use per-vertex colors instead of `color`
    pub vertex_colors: bool,
    pub side: FaceSide,
    pub shininess: f32,
}

impl Material {
    pub fn flat(color: Color) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    pub fn vertex_colored() -> Self {
        Self {
            color: Color::WHITE,
            vertex_colors: true,
            ..Default::default()
        }
    }

    pub fn double_sided(mut self) -> Self {
        self.side = FaceSide::Double;
        self
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            vertex_colors: false,
            side: FaceSide::Front,
            shininess: DEFAULT_SHININESS,
        }
    }
}
