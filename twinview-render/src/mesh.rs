//! GPU vertex and uniform layouts, and conversion from scene meshes

use bytemuck::{Pod, Zeroable};
use crate::camera::Camera;
use crate::color::{srgb_to_linear, Color};
use crate::light::LightRig;
use crate::material::Material;
use crate::scene::SceneMesh;

/// Directional lights beyond this count are ignored by the shaders
pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;

/// Vertex data for mesh rendering
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// Linear-light color
    pub color: [f32; 3],
}

impl MeshVertex {
    /// Vertex buffer layout descriptor
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Per-instance data for point sprites
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PointInstance {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl PointInstance {
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Camera and lighting data shared by every draw in a pass
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SceneUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub ambient: [f32; 4],
    pub light_directions: [[f32; 4]; MAX_DIRECTIONAL_LIGHTS],
    pub light_colors: [[f32; 4]; MAX_DIRECTIONAL_LIGHTS],
    /// Drawing buffer width and height, point size in pixels, light count
    pub viewport: [f32; 4],
}

impl SceneUniform {
    pub fn new(camera: &Camera, lights: &LightRig, viewport: (u32, u32), point_size: f32) -> Self {
        let mut light_directions = [[0.0; 4]; MAX_DIRECTIONAL_LIGHTS];
        let mut light_colors = [[0.0; 4]; MAX_DIRECTIONAL_LIGHTS];
        let mut count = 0;
        for (i, (direction, color)) in lights.directional().take(MAX_DIRECTIONAL_LIGHTS).enumerate() {
            light_directions[i] = [direction.x, direction.y, direction.z, 0.0];
            light_colors[i] = [color[0], color[1], color[2], 1.0];
            count = i + 1;
        }
        let ambient = lights.ambient();
        let coords = camera.position.coords;

        Self {
            view_proj: camera.view_projection_matrix().into(),
            camera_position: [coords.x, coords.y, coords.z, 1.0],
            ambient: [ambient[0], ambient[1], ambient[2], 1.0],
            light_directions,
            light_colors,
            viewport: [viewport.0 as f32, viewport.1 as f32, point_size, count as f32],
        }
    }
}

/// Per-mesh material data
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialUniform {
    pub color: [f32; 4],
    /// Shininess, vertex color flag
    pub params: [f32; 4],
}

impl From<&Material> for MaterialUniform {
    fn from(material: &Material) -> Self {
        let [r, g, b] = material.color.to_linear();
        Self {
            color: [r, g, b, 1.0],
            params: [
                material.shininess,
                if material.vertex_colors { 1.0 } else { 0.0 },
                0.0,
                0.0,
            ],
        }
    }
}

fn vertex_color(mesh: &SceneMesh, index: usize) -> [f32; 3] {
    match &mesh.geometry.colors {
        Some(colors) if mesh.material.vertex_colors => colors
            .get(index)
            .map(|c| c.map(|channel| srgb_to_linear(channel as f32 / 255.0)))
            .unwrap_or_else(|| Color::WHITE.to_linear()),
        _ => mesh.material.color.to_linear(),
    }
}

/// Interleaved vertices and a `u32` index list for a triangle mesh
pub fn mesh_to_vertices(mesh: &SceneMesh) -> (Vec<MeshVertex>, Vec<u32>) {
    let geometry = &mesh.geometry;
    let vertices = geometry
        .vertices
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let normal = geometry
                .normals
                .as_ref()
                .and_then(|normals| normals.get(i))
                .map(|n| [n.x, n.y, n.z])
                .unwrap_or([0.0; 3]);
            MeshVertex {
                position: [p.x, p.y, p.z],
                normal,
                color: vertex_color(mesh, i),
            }
        })
        .collect();

    let indices = geometry
        .faces
        .iter()
        .flat_map(|face| face.iter().map(|&i| i as u32))
        .collect();

    (vertices, indices)
}

/// One sprite instance per vertex, for meshes without faces
pub fn mesh_to_point_instances(mesh: &SceneMesh) -> Vec<PointInstance> {
    mesh.geometry
        .vertices
        .iter()
        .enumerate()
        .map(|(i, p)| PointInstance {
            position: [p.x, p.y, p.z],
            color: vertex_color(mesh, i),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Material, DEFAULT_MESH_COLOR};
    use twinview_core::{Point3f, TriangleMesh};

    fn triangle() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_uniform_sizes() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 36);
        assert_eq!(std::mem::size_of::<SceneUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 32);
    }

    #[test]
    fn test_flat_material_colors_every_vertex() {
        let mut geometry = triangle();
        geometry.compute_vertex_normals();
        let mesh = SceneMesh::new(geometry, Material::flat(DEFAULT_MESH_COLOR));

        let (vertices, indices) = mesh_to_vertices(&mesh);
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(vertices.iter().all(|v| v.color == DEFAULT_MESH_COLOR.to_linear()));
        assert!(vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_vertex_colors_are_linearized() {
        let mut geometry = triangle();
        geometry.set_colors(vec![[255, 0, 0], [0, 255, 0], [0, 0, 0]]);
        let mesh = SceneMesh::new(geometry, Material::vertex_colored());

        let (vertices, _) = mesh_to_vertices(&mesh);
        assert_eq!(vertices[0].color, [1.0, 0.0, 0.0]);
        assert_eq!(vertices[1].color, [0.0, 1.0, 0.0]);
        assert_eq!(vertices[2].color, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_point_instances() {
        let geometry = TriangleMesh::from_points(vec![Point3f::new(1.0, 2.0, 3.0)]);
        let mesh = SceneMesh::new(geometry, Material::flat(Color::WHITE));

        let instances = mesh_to_point_instances(&mesh);
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].position, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_scene_uniform_lights() {
        let uniform = SceneUniform::new(&Camera::default(), &LightRig::default(), (800, 600), 3.0);
        assert_eq!(uniform.viewport, [800.0, 600.0, 3.0, 2.0]);
        assert_eq!(uniform.ambient, [0.6, 0.6, 0.6, 1.0]);
        assert_eq!(uniform.camera_position, [0.0, 0.0, 3.0, 1.0]);
    }
}
