//! End-to-end tests of selection, loading, the frame loop and camera sync,
//! run against an in-memory asset source and a renderer that only records calls.

use std::sync::Arc;

use approx::assert_relative_eq;
use nalgebra::Point3;
use tokio::runtime::Handle;
use twinview_core::{Drawable, Error, Result};
use twinview_io::{AssetCatalog, MemoryAssetSource, PlyReadOptions};
use twinview_render::{Camera, Scene, SceneRenderer, DEFAULT_MESH_COLOR, PLACEHOLDER_COLOR};
use twinview_viewer::{
    animate, apply_completion, create_viewer, placeholder_mesh, Applied, CameraSync, Container, LoadCompletion,
    LoadDispatcher, LoadError, LoadOutcome, ModelLoader, Selection, Side, ViewerConfig, ViewerInstance, Viewers,
};

const TRIANGLE_PLY: &str = "ply
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
0 0 0 255 0 0
8 0 0 0 255 0
0 4 2 0 0 255
3 0 1 2
";

const POINTS_PLY: &str = "ply
format ascii 1.0
element vertex 4
property float x
property float y
property float z
end_header
100 100 100
101 100 100
100 103 100
100 100 101
";

#[derive(Default)]
struct RecordingRenderer {
    size: (f32, f32),
    pixel_ratio: f32,
    renders: usize,
    mesh_counts: Vec<usize>,
    fail: bool,
}

impl SceneRenderer for RecordingRenderer {
    fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        self.pixel_ratio = pixel_ratio;
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    fn set_size(&mut self, width: f32, height: f32) {
        self.size = (width, height);
    }

    fn size(&self) -> (f32, f32) {
        self.size
    }

    fn render(&mut self, scene: &Scene, _camera: &Camera) -> Result<()> {
        if self.fail {
            return Err(Error::Gpu("device lost".to_string()));
        }
        self.renders += 1;
        self.mesh_counts.push(scene.mesh_count());
        Ok(())
    }
}

fn viewer(side: Side) -> ViewerInstance<RecordingRenderer> {
    let container = Container::new(side.container_id(), 640.0, 480.0, 1.0);
    create_viewer(&container, &ViewerConfig::default(), |_| Ok(RecordingRenderer::default())).unwrap()
}

fn both_viewers() -> Viewers<RecordingRenderer> {
    Viewers::new(Some(viewer(Side::GroundTruth)), Some(viewer(Side::Prediction)))
}

fn source() -> MemoryAssetSource {
    MemoryAssetSource::new()
        .with_asset("assets/models/chair_gt.ply", TRIANGLE_PLY)
        .with_asset("assets/models/chair_pred.ply", POINTS_PLY)
        .with_asset("assets/models/table_gt.ply", POINTS_PLY)
        .with_asset("assets/models/table_pred.ply", TRIANGLE_PLY)
}

fn dispatcher(source: Arc<MemoryAssetSource>) -> LoadDispatcher<MemoryAssetSource> {
    LoadDispatcher::new(Handle::current(), ModelLoader::new(source, PlyReadOptions::default()))
}

async fn apply_next(
    viewers: &mut Viewers<RecordingRenderer>,
    dispatcher: &LoadDispatcher<MemoryAssetSource>,
) -> (Side, Applied) {
    let completion = dispatcher.next_completion().await.unwrap();
    let side = completion.side;
    (side, apply_completion(viewers, completion))
}

#[tokio::test]
async fn selecting_a_model_loads_both_sides() {
    let source = Arc::new(source());
    let mut dispatcher = dispatcher(source.clone());
    let mut viewers = both_viewers();

    let selection = Selection::new(AssetCatalog::from_names(["chair", "table"]), "assets/models", None);
    assert_eq!(selection.load_selected(&mut viewers, &mut dispatcher), 2);

    for _ in 0..2 {
        let (_, applied) = apply_next(&mut viewers, &dispatcher).await;
        assert_eq!(applied, Applied::Loaded);
    }

    let mut requested = source.requested_urls();
    requested.sort();
    assert_eq!(
        requested,
        vec!["assets/models/chair_gt.ply".to_string(), "assets/models/chair_pred.ply".to_string()]
    );

    for side in Side::ALL {
        let viewer = viewers.get(side).unwrap();
        assert_eq!(viewer.scene.mesh_count(), 1);
        assert_relative_eq!(viewer.camera.position, Point3::new(0.0, 0.0, 3.0), epsilon = 1e-6);

        let bbox = viewer.current_mesh().unwrap().geometry.bounding_box().unwrap();
        assert_relative_eq!(bbox.center(), Point3::origin(), epsilon = 1e-5);
        assert_relative_eq!(bbox.max_extent(), 2.0, epsilon = 1e-5);
    }

    let gt = viewers.get(Side::GroundTruth).unwrap().current_mesh().unwrap();
    assert!(gt.material.vertex_colors);
    let pred = viewers.get(Side::Prediction).unwrap().current_mesh().unwrap();
    assert!(!pred.material.vertex_colors);
    assert_eq!(pred.material.color, DEFAULT_MESH_COLOR);
}

#[tokio::test]
async fn reselection_replaces_the_previous_mesh() {
    let mut dispatcher = dispatcher(Arc::new(source()));
    let mut viewers = both_viewers();
    let mut selection = Selection::new(AssetCatalog::from_names(["chair", "table"]), "assets/models", None);

    selection.load_selected(&mut viewers, &mut dispatcher);
    for _ in 0..2 {
        apply_next(&mut viewers, &dispatcher).await;
    }
    let first_gt = viewers.get(Side::GroundTruth).unwrap().current_mesh_id().unwrap();
    assert!(viewers.get(Side::GroundTruth).unwrap().current_mesh().unwrap().geometry.face_count() > 0);

    // Move the camera away so the reset on load is observable
    viewers.gt.as_mut().unwrap().camera.position = Point3::new(1.0, 2.0, 3.0);

    assert!(selection.select("table"));
    selection.load_selected(&mut viewers, &mut dispatcher);
    for _ in 0..2 {
        apply_next(&mut viewers, &dispatcher).await;
    }

    let gt = viewers.get(Side::GroundTruth).unwrap();
    assert_eq!(gt.scene.mesh_count(), 1);
    assert!(!gt.scene.contains(first_gt));
    assert!(gt.current_mesh().unwrap().geometry.is_point_cloud());
    assert_relative_eq!(gt.camera.position, Point3::new(0.0, 0.0, 3.0), epsilon = 1e-6);
}

#[tokio::test]
async fn missing_files_show_the_placeholder() {
    let mut dispatcher = dispatcher(Arc::new(source()));
    let mut viewers = both_viewers();
    let selection = Selection::new(AssetCatalog::default(), "assets/models", Some("sofa".to_string()));

    selection.load_selected(&mut viewers, &mut dispatcher);
    for _ in 0..2 {
        let (_, applied) = apply_next(&mut viewers, &dispatcher).await;
        assert!(matches!(applied, Applied::Failed(message) if message.contains("sofa")));
    }

    for side in Side::ALL {
        let mesh = viewers.get(side).unwrap().current_mesh().unwrap();
        assert_eq!(mesh.material.color, PLACEHOLDER_COLOR);
        let bbox = mesh.geometry.bounding_box().unwrap();
        assert_relative_eq!(bbox.max_extent(), 1.0, epsilon = 1e-5);
    }
}

#[tokio::test]
async fn empty_selection_does_nothing() {
    let source = Arc::new(source());
    let mut dispatcher = dispatcher(source.clone());
    let mut viewers = both_viewers();

    let selection = Selection::new(AssetCatalog::default(), "assets/models", None);
    assert_eq!(selection.load_selected(&mut viewers, &mut dispatcher), 0);
    assert!(dispatcher.try_completions().is_empty());
    assert!(source.requested_urls().is_empty());
}

#[tokio::test]
async fn missing_viewer_is_skipped() {
    let source = Arc::new(source());
    let mut dispatcher = dispatcher(source.clone());
    let mut viewers = Viewers::new(Some(viewer(Side::GroundTruth)), None);

    let selection = Selection::new(AssetCatalog::from_names(["chair"]), "assets/models", None);
    assert_eq!(selection.load_selected(&mut viewers, &mut dispatcher), 1);

    let (side, applied) = apply_next(&mut viewers, &dispatcher).await;
    assert_eq!(side, Side::GroundTruth);
    assert_eq!(applied, Applied::Loaded);
    assert_eq!(source.requested_urls(), vec!["assets/models/chair_gt.ply".to_string()]);
}

#[tokio::test]
async fn superseded_load_is_aborted() {
    let source = Arc::new(source());
    let mut dispatcher = dispatcher(source.clone());
    let mut viewers = Viewers::new(Some(viewer(Side::GroundTruth)), None);
    let mut selection = Selection::new(AssetCatalog::from_names(["chair", "table"]), "assets/models", None);

    // The first task never gets to run before the second one replaces it
    selection.load_selected(&mut viewers, &mut dispatcher);
    selection.select("table");
    selection.load_selected(&mut viewers, &mut dispatcher);

    let completion = dispatcher.next_completion().await.unwrap();
    assert_eq!(completion.url, "assets/models/table_gt.ply");
    assert_eq!(completion.generation, 2);
    assert_eq!(apply_completion(&mut viewers, completion), Applied::Loaded);

    tokio::task::yield_now().await;
    assert!(dispatcher.try_completions().is_empty());
}

#[test]
fn stale_completion_leaves_viewer_untouched() {
    let mut viewers = both_viewers();
    let gt = viewers.gt.as_mut().unwrap();
    let stale = gt.begin_load();
    gt.begin_load();
    gt.camera.position = Point3::new(4.0, 0.0, 0.0);

    let completion = LoadCompletion {
        side: Side::GroundTruth,
        generation: stale,
        url: "assets/models/chair_gt.ply".to_string(),
        outcome: LoadOutcome::Failed {
            reason: LoadError::Empty {
                url: "assets/models/chair_gt.ply".to_string(),
            },
            placeholder: placeholder_mesh(),
        },
    };

    assert_eq!(apply_completion(&mut viewers, completion), Applied::Stale);
    let gt = viewers.get(Side::GroundTruth).unwrap();
    assert_eq!(gt.scene.mesh_count(), 0);
    assert_eq!(gt.camera.position, Point3::new(4.0, 0.0, 0.0));
}

#[test]
fn animate_renders_each_viewer_once() {
    let mut viewers = both_viewers();
    let mut sync = CameraSync::new();

    let report = animate(&mut viewers, &mut sync, 1.0 / 60.0);
    assert_eq!(report.rendered, 2);
    assert_eq!(report.errors, 0);
    assert_eq!(report.controls_changed, 0);
    for side in Side::ALL {
        assert_eq!(viewers.get(side).unwrap().renderer.renders, 1);
    }

    let mut single = Viewers::new(None, Some(viewer(Side::Prediction)));
    let report = animate(&mut single, &mut sync, 1.0 / 60.0);
    assert_eq!(report.rendered, 1);
    assert_eq!(single.get(Side::Prediction).unwrap().renderer.renders, 1);

    let mut none: Viewers<RecordingRenderer> = Viewers::default();
    assert_eq!(animate(&mut none, &mut sync, 1.0 / 60.0).rendered, 0);
}

#[test]
fn render_errors_do_not_stop_the_frame() {
    let mut viewers = both_viewers();
    viewers.gt.as_mut().unwrap().renderer.fail = true;
    let mut sync = CameraSync::new();

    let report = animate(&mut viewers, &mut sync, 1.0 / 60.0);
    assert_eq!(report.errors, 1);
    assert_eq!(report.rendered, 1);
    assert_eq!(viewers.get(Side::Prediction).unwrap().renderer.renders, 1);
}

#[test]
fn cameras_stay_independent_without_sync() {
    let mut viewers = both_viewers();
    let mut sync = CameraSync::new();
    assert!(!sync.is_enabled());

    viewers.gt.as_mut().unwrap().controls.rotate(120.0, 0.0, 480.0);
    let report = animate(&mut viewers, &mut sync, 1.0 / 60.0);

    assert_eq!(report.controls_changed, 1);
    assert_eq!(report.synced_from, None);
    let pred = viewers.get(Side::Prediction).unwrap();
    assert_relative_eq!(pred.camera.position, Point3::new(0.0, 0.0, 3.0), epsilon = 1e-6);
}

#[test]
fn sync_mirrors_without_feedback() {
    let mut viewers = both_viewers();
    let mut sync = CameraSync::new();
    sync.enable();

    viewers.gt.as_mut().unwrap().controls.rotate(120.0, 40.0, 480.0);
    for _ in 0..5 {
        let report = animate(&mut viewers, &mut sync, 1.0 / 60.0);
        assert_eq!(report.synced_from, Some(Side::GroundTruth));
        assert_eq!(report.controls_changed, 1);
    }

    let gt = viewers.get(Side::GroundTruth).unwrap().camera.pose();
    let pred = viewers.get(Side::Prediction).unwrap().camera.pose();
    assert_relative_eq!(gt.position, pred.position, epsilon = 1e-6);
    assert_relative_eq!(gt.rotation, pred.rotation, epsilon = 1e-6);
    assert!(gt.position != Point3::new(0.0, 0.0, 3.0));
}

#[test]
fn ground_truth_wins_a_sync_tie() {
    let mut viewers = both_viewers();
    let mut sync = CameraSync::new();
    sync.enable();

    viewers.gt.as_mut().unwrap().controls.rotate(120.0, 0.0, 480.0);
    viewers.pred.as_mut().unwrap().controls.rotate(-120.0, 0.0, 480.0);
    let report = animate(&mut viewers, &mut sync, 1.0 / 60.0);

    assert_eq!(report.controls_changed, 2);
    assert_eq!(report.synced_from, Some(Side::GroundTruth));
    let gt = viewers.get(Side::GroundTruth).unwrap().camera.position;
    let pred = viewers.get(Side::Prediction).unwrap().camera.position;
    assert_relative_eq!(gt, pred, epsilon = 1e-6);
    assert!(gt.x < 0.0);
}

#[test]
fn factory_sizes_renderer_to_container() {
    let container = Container::new("viewer-pred", 700.0, 350.0, 2.0);
    let viewer = create_viewer(&container, &ViewerConfig::default(), |_| Ok(RecordingRenderer::default())).unwrap();

    assert_eq!(viewer.renderer.size(), (700.0, 350.0));
    assert_eq!(viewer.renderer.drawing_buffer_size(), (1400, 700));
    assert_relative_eq!(viewer.camera.aspect_ratio, 2.0);

    let failed: Result<ViewerInstance<RecordingRenderer>> =
        create_viewer(&container, &ViewerConfig::default(), |_| Err(Error::Gpu("no adapter".to_string())));
    assert!(failed.is_err());
}
