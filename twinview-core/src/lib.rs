//! Core data structures for twinview
//!
//! This crate provides the geometry types shared by the loader and the renderer:
//! points, triangle meshes (which double as point clouds when they have no faces),
//! bounding boxes, transforms and the normalization applied to every loaded model.

pub mod point;
pub mod mesh;
pub mod traits;
pub mod transform;
pub mod normalize;
pub mod primitives;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use traits::*;
pub use transform::*;
pub use normalize::*;
pub use primitives::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix4, Isometry3, UnitQuaternion};
