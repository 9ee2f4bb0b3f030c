//! Model loading
//!
//! Fetches a PLY file, parses it, normalizes it and wraps it in a scene mesh.
//! A load never fails outright: when anything goes wrong the outcome carries the
//! error together with a placeholder sphere to show instead.

use std::sync::Arc;

use thiserror::Error;
use twinview_core::{center_and_scale, uv_sphere, Normalization, TriangleMesh, DEFAULT_TARGET_EXTENT};
use twinview_io::{AssetSource, IoError, LoadProgress, PlyReadOptions, PlyReader, ProgressFn};
use twinview_render::{Material, SceneMesh, DEFAULT_MESH_COLOR, PLACEHOLDER_COLOR};

pub const PLACEHOLDER_RADIUS: f32 = 0.5;
pub const PLACEHOLDER_SEGMENTS: usize = 32;

/// Why a model could not be loaded
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: IoError,
    },

    #[error("failed to parse {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: twinview_core::Error,
    },

    #[error("{url} contains no vertices")]
    Empty { url: String },
}

/// Result of one load request
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded {
        mesh: SceneMesh,
        normalization: Normalization,
    },
    Failed {
        reason: LoadError,
        placeholder: SceneMesh,
    },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            LoadOutcome::Loaded { .. } => None,
            LoadOutcome::Failed { reason, .. } => Some(reason),
        }
    }

    /// The mesh to show, whether it is the model or the placeholder
    pub fn mesh(&self) -> &SceneMesh {
        match self {
            LoadOutcome::Loaded { mesh, .. } => mesh,
            LoadOutcome::Failed { placeholder, .. } => placeholder,
        }
    }

    pub fn into_mesh(self) -> SceneMesh {
        match self {
            LoadOutcome::Loaded { mesh, .. } => mesh,
            LoadOutcome::Failed { placeholder, .. } => placeholder,
        }
    }
}

/// Loads models from an [`AssetSource`]
pub struct ModelLoader<S: AssetSource> {
    source: Arc<S>,
    options: PlyReadOptions,
}

impl<S: AssetSource> ModelLoader<S> {
    pub fn new(source: Arc<S>, options: PlyReadOptions) -> Self {
        Self { source, options }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Load the model at `url`, falling back to the placeholder on any error
    pub async fn load(&self, url: &str, progress: &ProgressFn<'_>) -> LoadOutcome {
        tracing::info!(url, "Loading model");

        match self.load_geometry(url, progress).await {
            Ok(geometry) => {
                let (mesh, normalization) = build_mesh(geometry);
                tracing::info!(
                    url,
                    vertices = mesh.geometry.vertex_count(),
                    faces = mesh.geometry.face_count(),
                    vertex_colors = mesh.material.vertex_colors,
                    scale = normalization.scale,
                    "Model loaded"
                );
                LoadOutcome::Loaded { mesh, normalization }
            }
            Err(reason) => {
                tracing::warn!(url, error = %reason, "Model failed to load, showing placeholder");
                LoadOutcome::Failed {
                    reason,
                    placeholder: placeholder_mesh(),
                }
            }
        }
    }

    async fn load_geometry(&self, url: &str, progress: &ProgressFn<'_>) -> Result<TriangleMesh, LoadError> {
        let bytes = self.source.fetch(url, progress).await.map_err(|source| LoadError::Fetch {
            url: url.to_string(),
            source,
        })?;

        let geometry = PlyReader::read_mesh_from_bytes(&bytes, &self.options).map_err(|source| LoadError::Parse {
            url: url.to_string(),
            source,
        })?;

        if geometry.is_empty() {
            return Err(LoadError::Empty { url: url.to_string() });
        }
        Ok(geometry)
    }
}

/// Progress callback that only traces
pub fn log_progress(url: String) -> impl Fn(LoadProgress) + Send + Sync {
    move |progress: LoadProgress| match progress.fraction() {
        Some(fraction) => tracing::trace!(url = %url, loaded = progress.loaded, percent = fraction * 100.0, "Loading"),
        None => tracing::trace!(url = %url, loaded = progress.loaded, "Loading"),
    }
}

/// Normalize `geometry` and pick its material.
///
/// Meshes get vertex normals if they have none. The result is centered at the
/// origin with a largest extent of 2.
pub fn build_mesh(mut geometry: TriangleMesh) -> (SceneMesh, Normalization) {
    if !geometry.has_normals() {
        geometry.compute_vertex_normals();
    }

    let normalization = center_and_scale(&mut geometry, DEFAULT_TARGET_EXTENT).unwrap_or(Normalization {
        center: twinview_core::Point3f::origin(),
        scale: 1.0,
        degenerate: true,
    });

    let material = if geometry.has_colors() {
        Material::vertex_colored()
    } else {
        Material::flat(DEFAULT_MESH_COLOR)
    }
    .double_sided();

    (SceneMesh::new(geometry, material), normalization)
}

/// The red sphere shown in place of a model that failed to load
pub fn placeholder_mesh() -> SceneMesh {
    SceneMesh::new(
        uv_sphere(PLACEHOLDER_RADIUS, PLACEHOLDER_SEGMENTS, PLACEHOLDER_SEGMENTS),
        Material::flat(PLACEHOLDER_COLOR),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use twinview_core::{Drawable, Point3f};
    use twinview_io::MemoryAssetSource;
    use twinview_render::FaceSide;

    const COLORED_PLY: &str = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
property uchar red
property uchar green
property uchar blue
element face 1
property list uchar int vertex_indices
end_header
10 10 10 255 0 0
14 10 10 0 255 0
10 11 10 0 0 255
3 0 1 2
";

    const PLAIN_POINTS_PLY: &str = "ply
format ascii 1.0
element vertex 2
property float x
property float y
property float z
end_header
-1 -1 -1
3 1 1
";

    fn no_progress() -> impl Fn(LoadProgress) + Send + Sync {
        |_| {}
    }

    fn loader(source: MemoryAssetSource) -> ModelLoader<MemoryAssetSource> {
        ModelLoader::new(Arc::new(source), PlyReadOptions::default())
    }

    #[test]
    fn test_build_mesh_normalizes() {
        let geometry = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(10.0, 10.0, 10.0),
                Point3f::new(14.0, 10.0, 10.0),
                Point3f::new(10.0, 11.0, 10.0),
            ],
            vec![[0, 1, 2]],
        );

        let (mesh, normalization) = build_mesh(geometry);
        assert_relative_eq!(normalization.scale, 0.5);
        assert!(mesh.geometry.has_normals());

        let bbox = mesh.geometry.bounding_box().unwrap();
        assert_relative_eq!(bbox.center(), Point3f::origin(), epsilon = 1e-5);
        assert_relative_eq!(bbox.max_extent(), 2.0, epsilon = 1e-5);
        assert_eq!(mesh.material, Material::flat(DEFAULT_MESH_COLOR).double_sided());
    }

    #[test]
    fn test_point_cloud_gets_no_normals() {
        let geometry = TriangleMesh::from_points(vec![Point3f::new(0.0, 0.0, 0.0), Point3f::new(1.0, 2.0, 3.0)]);
        let (mesh, _) = build_mesh(geometry);
        assert!(!mesh.geometry.has_normals());
        assert!(mesh.geometry.is_point_cloud());
    }

    #[test]
    fn test_single_point_is_centered_not_scaled() {
        let geometry = TriangleMesh::from_points(vec![Point3f::new(4.0, 5.0, 6.0)]);
        let (mesh, normalization) = build_mesh(geometry);

        assert!(normalization.degenerate);
        assert_eq!(normalization.scale, 1.0);
        assert_relative_eq!(mesh.geometry.vertices[0], Point3f::origin(), epsilon = 1e-6);
    }

    #[test]
    fn test_placeholder() {
        let placeholder = placeholder_mesh();
        assert_eq!(placeholder.material.color, PLACEHOLDER_COLOR);
        assert_eq!(placeholder.material.side, FaceSide::Front);
        assert!(!placeholder.material.vertex_colors);

        let bbox = placeholder.geometry.bounding_box().unwrap();
        assert_relative_eq!(bbox.max_extent(), 1.0, epsilon = 1e-5);
        for vertex in &placeholder.geometry.vertices {
            assert_relative_eq!(vertex.coords.norm(), PLACEHOLDER_RADIUS, epsilon = 1e-5);
        }
    }

    #[tokio::test]
    async fn test_load_colored_mesh() {
        let loader = loader(MemoryAssetSource::new().with_asset("models/a_gt.ply", COLORED_PLY));
        let outcome = loader.load("models/a_gt.ply", &no_progress()).await;

        assert!(outcome.is_loaded());
        let mesh = outcome.mesh();
        assert!(mesh.material.vertex_colors);
        assert_eq!(mesh.material.side, FaceSide::Double);
        assert_eq!(mesh.material.shininess, 30.0);
        assert_eq!(mesh.geometry.colors.as_ref().unwrap()[0], [255, 0, 0]);
    }

    #[tokio::test]
    async fn test_load_uncolored_points() {
        let loader = loader(MemoryAssetSource::new().with_asset("p.ply", PLAIN_POINTS_PLY));
        let outcome = loader.load("p.ply", &no_progress()).await;

        let LoadOutcome::Loaded { mesh, normalization } = outcome else {
            panic!("expected a loaded model");
        };
        assert_eq!(mesh.material.color, DEFAULT_MESH_COLOR);
        assert!(!mesh.material.vertex_colors);
        assert_relative_eq!(normalization.scale, 0.5);
    }

    #[tokio::test]
    async fn test_progress_reaches_borrowing_callback() {
        let loader = loader(MemoryAssetSource::new().with_asset("a.ply", COLORED_PLY));
        let seen = std::sync::Mutex::new(Vec::new());
        let outcome = loader
            .load("a.ply", &|progress: LoadProgress| seen.lock().unwrap().push(progress))
            .await;

        assert!(outcome.is_loaded());
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].loaded, COLORED_PLY.len() as u64);
        assert_eq!(seen[0].fraction(), Some(1.0));
    }

    #[tokio::test]
    async fn test_missing_file_yields_placeholder() {
        let loader = loader(MemoryAssetSource::new());
        let outcome = loader.load("missing_gt.ply", &no_progress()).await;

        assert!(matches!(outcome.error(), Some(LoadError::Fetch { .. })));
        assert_eq!(outcome.mesh().material.color, PLACEHOLDER_COLOR);
    }

    #[tokio::test]
    async fn test_garbage_yields_placeholder() {
        let loader = loader(MemoryAssetSource::new().with_asset("bad.ply", "not a ply file"));
        let outcome = loader.load("bad.ply", &no_progress()).await;

        assert!(matches!(outcome.error(), Some(LoadError::Parse { .. })));
        assert_eq!(outcome.into_mesh().material.color, PLACEHOLDER_COLOR);
    }
}
