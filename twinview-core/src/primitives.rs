//! Procedural meshes

use crate::{mesh::TriangleMesh, point::*};
use std::f32::consts::PI;

/// Build a UV sphere centered at the origin, with unit normals.
///
/// Vertices are laid out on a `(width_segments + 1) x (height_segments + 1)` grid; the
/// seam and pole rows are duplicated and no degenerate triangles are emitted at the poles.
pub fn uv_sphere(radius: f32, width_segments: usize, height_segments: usize) -> TriangleMesh {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);

    let mut vertices = Vec::with_capacity((width_segments + 1) * (height_segments + 1));
    let mut normals = Vec::with_capacity(vertices.capacity());

    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;

            let direction = Vector3f::new(
                -(u * 2.0 * PI).cos() * (v * PI).sin(),
                (v * PI).cos(),
                (u * 2.0 * PI).sin() * (v * PI).sin(),
            );
            vertices.push(Point3f::from(direction * radius));
            normals.push(direction.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::y));
        }
    }

    let row = width_segments + 1;
    let mut faces = Vec::with_capacity(width_segments * height_segments * 2);
    for iy in 0..height_segments {
        for ix in 0..width_segments {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;

            if iy != 0 {
                faces.push([a, b, d]);
            }
            if iy != height_segments - 1 {
                faces.push([b, c, d]);
            }
        }
    }

    let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
    mesh.set_normals(normals);
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Drawable;
    use approx::assert_relative_eq;

    #[test]
    fn test_sphere_radius_and_layout() {
        let sphere = uv_sphere(0.5, 32, 32);

        assert_eq!(sphere.vertex_count(), 33 * 33);
        // Two triangles per quad, minus one per quad on each pole row
        assert_eq!(sphere.face_count(), 32 * 32 * 2 - 2 * 32);
        assert!(sphere.validate().is_ok());

        for v in &sphere.vertices {
            assert_relative_eq!(v.coords.norm(), 0.5, epsilon = 1e-5);
        }

        let bbox = sphere.bounding_box().unwrap();
        assert_relative_eq!(bbox.max_extent(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_normals_point_outwards() {
        let sphere = uv_sphere(2.0, 8, 6);
        let normals = sphere.normals.as_ref().unwrap();
        for (v, n) in sphere.vertices.iter().zip(normals) {
            assert!(v.coords.dot(n) > 0.0);
        }
    }
}
