//! Core traits for twinview

use crate::{mesh::*, point::*};
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point3f,
    pub max: Point3f,
}

impl Aabb {
    /// Bounding box of a set of points, `None` when the set is empty
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3f>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut min = first;
        let mut max = first;

        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);

            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some(Self { min, max })
    }

    pub fn center(&self) -> Point3f {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3f {
        self.max - self.min
    }

    /// Largest extent along any axis
    pub fn max_extent(&self) -> f32 {
        self.size().max()
    }
}

/// Trait for drawable/renderable objects
pub trait Drawable {
    /// Get the bounding box of the object, `None` if it has no geometry
    fn bounding_box(&self) -> Option<Aabb>;

    /// Get the center point of the object
    fn center(&self) -> Point3f {
        self.bounding_box()
            .map(|b| b.center())
            .unwrap_or_else(Point3f::origin)
    }
}

impl Drawable for TriangleMesh {
    fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(&self.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_of_mesh() {
        let mesh = TriangleMesh::from_points(vec![
            Point3f::new(-1.0, 2.0, 0.5),
            Point3f::new(3.0, -2.0, 1.5),
            Point3f::new(0.0, 0.0, 0.0),
        ]);

        let bbox = mesh.bounding_box().unwrap();
        assert_eq!(bbox.min, Point3f::new(-1.0, -2.0, 0.0));
        assert_eq!(bbox.max, Point3f::new(3.0, 2.0, 1.5));
        assert_eq!(bbox.center(), Point3f::new(1.0, 0.0, 0.75));
        assert_eq!(bbox.max_extent(), 4.0);
    }

    #[test]
    fn test_empty_mesh_has_no_bounds() {
        let mesh = TriangleMesh::new();
        assert!(mesh.bounding_box().is_none());
        assert_eq!(mesh.center(), Point3f::origin());
    }
}
