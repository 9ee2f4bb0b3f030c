//! Centering and uniform scaling of loaded geometry

use crate::{mesh::TriangleMesh, point::*, traits::Drawable, transform::Transform3D};

/// Extent of the largest bounding-box axis after normalization
pub const DEFAULT_TARGET_EXTENT: f32 = 2.0;

/// What [`center_and_scale`] did to a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    /// Bounding-box center before centering
    pub center: Point3f,
    /// Uniform scale factor that was applied (1.0 when degenerate)
    pub scale: f32,
    /// The bounding box had no usable extent, so scaling was skipped
    pub degenerate: bool,
}

/// Translate `mesh` so its bounding box is centered at the origin, then scale it
/// uniformly so the largest axis extent equals `target_extent`.
///
/// Geometry whose largest extent is zero or not finite (a single point, or only
/// coincident points) is centered but not scaled. Returns `None` for an empty mesh.
pub fn center_and_scale(mesh: &mut TriangleMesh, target_extent: f32) -> Option<Normalization> {
    let bbox = mesh.bounding_box()?;
    let center = bbox.center();
    let max_extent = bbox.max_extent();

    let degenerate = !max_extent.is_finite() || max_extent <= f32::EPSILON;
    let scale = if degenerate {
        tracing::warn!(
            max_extent,
            vertices = mesh.vertex_count(),
            "degenerate bounding box, skipping scale"
        );
        1.0
    } else {
        target_extent / max_extent
    };

    let transform = Transform3D::uniform_scaling(scale) * Transform3D::translation(-center.coords);
    mesh.transform(&transform);

    Some(Normalization {
        center,
        scale,
        degenerate,
    })
}
