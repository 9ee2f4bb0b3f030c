//! PLY format support

use crate::colormap::jet;
use ply_rs::{
    parser::Parser,
    ply::{DefaultElement, Header, Property},
};
use std::io::BufRead;
use twinview_core::{Error, Point3f, Result, Rgb8, TriangleMesh, Vector3f};

/// Vertex properties that are treated as a scalar field for colormapping
const SCALAR_PROPERTY_NAMES: [&str; 5] = ["quality", "saliency", "scalar", "intensity", "value"];

/// Options for [`PlyReader`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlyReadOptions {
    /// Map a scalar vertex property through a jet colormap when the file has no RGB
    pub colormap_scalars: bool,
}

/// Reads ASCII and binary PLY files into a [`TriangleMesh`]
pub struct PlyReader;

impl PlyReader {
    /// Parse a PLY file held in memory
    pub fn read_mesh_from_bytes(bytes: &[u8], options: &PlyReadOptions) -> Result<TriangleMesh> {
        let mut reader = bytes;
        Self::parse(&mut reader, options)
    }

    fn parse<R: BufRead>(reader: &mut R, options: &PlyReadOptions) -> Result<TriangleMesh> {
        let parser = Parser::<DefaultElement>::new();
        let ply = parser.read_ply(reader)?;

        let vertex_element = ply
            .payload
            .get("vertex")
            .ok_or_else(|| Error::InvalidData("PLY file has no vertex element".to_string()))?;

        let mut vertices = Vec::with_capacity(vertex_element.len());
        for vertex in vertex_element {
            let x = extract_property_value(vertex, "x")?;
            let y = extract_property_value(vertex, "y")?;
            let z = extract_property_value(vertex, "z")?;

            vertices.push(Point3f::new(x, y, z));
        }

        let mut faces = Vec::new();
        if let Some(face_element) = ply.payload.get("face") {
            for face in face_element {
                let indices = extract_face_indices(face)?;
                // Fan-triangulate polygons, skip anything smaller than a triangle
                for i in 1..indices.len().saturating_sub(1) {
                    faces.push([indices[0], indices[i], indices[i + 1]]);
                }
            }
        }

        let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        mesh.validate()?;

        if let Some(normals) = extract_normals(vertex_element) {
            mesh.set_normals(normals);
        }

        let colors = extract_colors(vertex_element).or_else(|| {
            if options.colormap_scalars {
                scalar_colors(&ply.header, vertex_element)
            } else {
                None
            }
        });
        if let Some(colors) = colors {
            mesh.set_colors(colors);
        }

        tracing::debug!(
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            normals = mesh.has_normals(),
            colors = mesh.has_colors(),
            "parsed PLY"
        );

        Ok(mesh)
    }
}

/// Numeric value of a scalar property, whatever its storage type
fn scalar_value(property: &Property) -> Option<f64> {
    match property {
        Property::Char(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        _ => None,
    }
}

fn is_floating(property: &Property) -> bool {
    matches!(property, Property::Float(_) | Property::Double(_))
}

/// Extract a property value as f32 from a PLY element
fn extract_property_value(element: &DefaultElement, name: &str) -> Result<f32> {
    element
        .get(name)
        .and_then(scalar_value)
        .map(|v| v as f32)
        .ok_or_else(|| Error::InvalidData(format!("Property '{}' not found or invalid type", name)))
}

/// Normals are only kept when every vertex carries all three components
fn extract_normals(vertices: &[DefaultElement]) -> Option<Vec<Vector3f>> {
    if vertices.is_empty() {
        return None;
    }
    vertices
        .iter()
        .map(|vertex| {
            let nx = extract_property_value(vertex, "nx").ok()?;
            let ny = extract_property_value(vertex, "ny").ok()?;
            let nz = extract_property_value(vertex, "nz").ok()?;
            Some(Vector3f::new(nx, ny, nz))
        })
        .collect()
}

/// Find the RGB channel properties of a vertex under any of the usual spellings
fn color_channels(vertex: &DefaultElement) -> Option<[&Property; 3]> {
    const SPELLINGS: [[&str; 3]; 3] = [
        ["red", "green", "blue"],
        ["r", "g", "b"],
        ["diffuse_red", "diffuse_green", "diffuse_blue"],
    ];

    SPELLINGS.iter().find_map(|[r, g, b]| {
        Some([vertex.get(*r)?, vertex.get(*g)?, vertex.get(*b)?])
    })
}

/// Per-vertex colors as bytes.
///
/// Floating point channels are read as `0..1` unless some component exceeds 1, in
/// which case the file is assumed to store `0..255`.
fn extract_colors(vertices: &[DefaultElement]) -> Option<Vec<Rgb8>> {
    let first = vertices.first()?;
    let floating = color_channels(first)?.iter().any(|p| is_floating(p));

    let raw: Vec<[f64; 3]> = vertices
        .iter()
        .map(|vertex| {
            let [r, g, b] = color_channels(vertex)?;
            Some([scalar_value(r)?, scalar_value(g)?, scalar_value(b)?])
        })
        .collect::<Option<_>>()?;

    let factor = if floating && raw.iter().flatten().all(|&c| c <= 1.0) {
        255.0
    } else {
        1.0
    };

    Some(
        raw.into_iter()
            .map(|rgb| rgb.map(|c| (c * factor).round().clamp(0.0, 255.0) as u8))
            .collect(),
    )
}

/// Colormap the first scalar-looking vertex property, in header order
fn scalar_colors(header: &Header, vertices: &[DefaultElement]) -> Option<Vec<Rgb8>> {
    let vertex_def = header.elements.get("vertex")?;
    let name = vertex_def.properties.keys().find(|name| {
        SCALAR_PROPERTY_NAMES.contains(&name.as_str()) || name.starts_with("scalar_")
    })?;

    let values: Vec<f64> = vertices
        .iter()
        .map(|vertex| vertex.get(name).and_then(scalar_value))
        .collect::<Option<_>>()?;

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    tracing::debug!(property = %name, min, max, "colormapping scalar property");

    Some(
        values
            .into_iter()
            .map(|v| {
                let t = if range > 0.0 { (v - min) / range } else { 0.5 };
                jet(t as f32)
            })
            .collect(),
    )
}

/// Extract face indices from a PLY face element
fn extract_face_indices(element: &DefaultElement) -> Result<Vec<usize>> {
    let property = element
        .get("vertex_indices")
        .or_else(|| element.get("vertex_index"))
        .ok_or_else(|| Error::InvalidData("Face indices not found".to_string()))?;

    let signed: Vec<i64> = match property {
        Property::ListChar(indices) => indices.iter().map(|&i| i as i64).collect(),
        Property::ListUChar(indices) => indices.iter().map(|&i| i as i64).collect(),
        Property::ListShort(indices) => indices.iter().map(|&i| i as i64).collect(),
        Property::ListUShort(indices) => indices.iter().map(|&i| i as i64).collect(),
        Property::ListInt(indices) => indices.iter().map(|&i| i as i64).collect(),
        Property::ListUInt(indices) => indices.iter().map(|&i| i as i64).collect(),
        _ => {
            return Err(Error::InvalidData(
                "Face indices must be an integer list".to_string(),
            ))
        }
    };

    signed
        .into_iter()
        .map(|i| {
            usize::try_from(i)
                .map_err(|_| Error::InvalidData(format!("Negative face index {}", i)))
        })
        .collect()
}
