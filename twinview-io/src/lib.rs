//! I/O for twinview
//!
//! This crate reads PLY point clouds and meshes, fetches model files through an
//! [`AssetSource`] and discovers ground truth / prediction pairs on disk.

pub mod ply;
pub mod source;
pub mod catalog;
pub mod colormap;
pub mod error;

pub use error::*;
pub use ply::{PlyReadOptions, PlyReader};
pub use source::{AssetSource, FsAssetSource, LoadProgress, MemoryAssetSource, ProgressFn};
pub use catalog::*;
