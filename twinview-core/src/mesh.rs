//! Mesh data structures and functionality

use crate::error::{Error, Result};
use crate::point::*;
use crate::transform::Transform3D;
use serde::{Deserialize, Serialize};

/// A triangle mesh with optional per-vertex normals and colors.
///
/// A mesh without faces is treated as a point cloud.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
    pub colors: Option<Vec<Rgb8>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
            colors: None,
        }
    }

    /// Create a face-less mesh from a set of points
    pub fn from_points(vertices: Vec<Point3f>) -> Self {
        Self::from_vertices_and_faces(vertices, Vec::new())
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh has no vertices at all
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// A mesh with vertices but no faces is rendered as a point cloud
    pub fn is_point_cloud(&self) -> bool {
        !self.vertices.is_empty() && self.faces.is_empty()
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    /// Compute area-weighted vertex normals from the faces.
    ///
    /// Does nothing for point clouds: there is no surface to derive a normal from.
    pub fn compute_vertex_normals(&mut self) {
        if self.faces.is_empty() {
            return;
        }

        let mut accumulated = vec![Vector3f::zeros(); self.vertices.len()];
        for face in &self.faces {
            let v0 = self.vertices[face[0]];
            let v1 = self.vertices[face[1]];
            let v2 = self.vertices[face[2]];

            // Unnormalized cross product, so larger faces weigh more
            let face_normal = (v1 - v0).cross(&(v2 - v0));
            for &index in face {
                accumulated[index] += face_normal;
            }
        }

        let normals = accumulated
            .into_iter()
            .map(|n| n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::z))
            .collect();
        self.normals = Some(normals);
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Set vertex colors
    pub fn set_colors(&mut self, colors: Vec<Rgb8>) {
        if colors.len() == self.vertices.len() {
            self.colors = Some(colors);
        }
    }

    /// Check that every face references an existing vertex
    pub fn validate(&self) -> Result<()> {
        let count = self.vertices.len();
        if let Some((i, face)) = self
            .faces
            .iter()
            .enumerate()
            .find(|(_, face)| face.iter().any(|&index| index >= count))
        {
            return Err(Error::InvalidData(format!(
                "face {} references vertex {:?} but the mesh has {} vertices",
                i, face, count
            )));
        }
        Ok(())
    }

    /// Apply a transformation to vertices and normals
    pub fn transform(&mut self, transform: &Transform3D) {
        for vertex in &mut self.vertices {
            *vertex = transform.transform_point(vertex);
        }
        if let Some(normals) = &mut self.normals {
            for normal in normals.iter_mut() {
                *normal = transform
                    .transform_vector(normal)
                    .try_normalize(f32::EPSILON)
                    .unwrap_or(*normal);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn test_vertex_normals_of_flat_quad() {
        let mut mesh = quad();
        assert!(!mesh.has_normals());

        mesh.compute_vertex_normals();

        let normals = mesh.normals.as_ref().unwrap();
        assert_eq!(normals.len(), 4);
        for n in normals {
            assert_relative_eq!(n.z, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_point_cloud_gets_no_normals() {
        let mut cloud = TriangleMesh::from_points(vec![Point3f::origin(), Point3f::new(1.0, 2.0, 3.0)]);
        assert!(cloud.is_point_cloud());

        cloud.compute_vertex_normals();
        assert!(cloud.normals.is_none());
    }

    #[test]
    fn test_validate_rejects_out_of_range_face() {
        let mut mesh = quad();
        assert!(mesh.validate().is_ok());

        mesh.faces.push([0, 1, 7]);
        assert!(matches!(mesh.validate(), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_set_colors_requires_matching_length() {
        let mut mesh = quad();
        mesh.set_colors(vec![[255, 0, 0]; 3]);
        assert!(!mesh.has_colors());

        mesh.set_colors(vec![[255, 0, 0]; 4]);
        assert!(mesh.has_colors());
    }
}
