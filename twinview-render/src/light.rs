//! Scene lighting

use crate::color::Color;
use nalgebra::Vector3;

/// A light source
#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    Ambient {
        color: Color,
        intensity: f32,
    },
    /// Light arriving from `position` towards the origin
    Directional {
        color: Color,
        intensity: f32,
        position: Vector3<f32>,
    },
}

impl Light {
    pub fn ambient(intensity: f32) -> Self {
        Light::Ambient {
            color: Color::WHITE,
            intensity,
        }
    }

    pub fn directional(intensity: f32, position: Vector3<f32>) -> Self {
        Light::Directional {
            color: Color::WHITE,
            intensity,
            position,
        }
    }

    pub fn intensity(&self) -> f32 {
        match self {
            Light::Ambient { intensity, .. } | Light::Directional { intensity, .. } => *intensity,
        }
    }
}

/// The fixed set of lights every pane is set up with
#[derive(Debug, Clone, PartialEq)]
pub struct LightRig {
    pub lights: Vec<Light>,
}

impl LightRig {
    /// Summed ambient contribution, in linear color
    pub fn ambient(&self) -> [f32; 3] {
        self.lights.iter().fold([0.0; 3], |acc, light| match light {
            Light::Ambient { color, intensity } => {
                let c = color.to_linear();
                [acc[0] + c[0] * intensity, acc[1] + c[1] * intensity, acc[2] + c[2] * intensity]
            }
            Light::Directional { .. } => acc,
        })
    }

    /// Directional lights as (direction towards the light, linear color * intensity)
    pub fn directional(&self) -> impl Iterator<Item = (Vector3<f32>, [f32; 3])> + '_ {
        self.lights.iter().filter_map(|light| match light {
            Light::Directional {
                color,
                intensity,
                position,
            } => {
                let direction = position.try_normalize(f32::EPSILON)?;
                let c = color.to_linear();
                Some((direction, [c[0] * intensity, c[1] * intensity, c[2] * intensity]))
            }
            Light::Ambient { .. } => None,
        })
    }
}

impl Default for LightRig {
    fn default() -> Self {
        Self {
            lights: vec![
                Light::ambient(0.6),
                Light::directional(0.8, Vector3::new(1.0, 1.0, 1.0)),
                Light::directional(0.4, Vector3::new(-1.0, -1.0, -1.0)),
            ],
        }
    }
}
