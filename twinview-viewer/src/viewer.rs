//! Viewer instances
//!
//! A [`ViewerInstance`] is one pane: a scene, the camera looking at it, the
//! renderer drawing it and the orbit controller moving the camera. The app
//! owns two of them, one per [`Side`].

use std::fmt;

use twinview_core::Result;
use twinview_io::{GROUND_TRUTH_SUFFIX, PREDICTION_SUFFIX};
use twinview_render::{Camera, ObjectId, Scene, SceneMesh, SceneRenderer};

use crate::config::ViewerConfig;
use crate::controls::OrbitControls;

/// Which of the two panes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    GroundTruth,
    Prediction,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::GroundTruth, Side::Prediction];

    /// Suffix appended to the model name to form this side's file name
    pub fn suffix(self) -> &'static str {
        match self {
            Side::GroundTruth => GROUND_TRUTH_SUFFIX,
            Side::Prediction => PREDICTION_SUFFIX,
        }
    }

    pub fn container_id(self) -> &'static str {
        match self {
            Side::GroundTruth => "viewer-gt",
            Side::Prediction => "viewer-pred",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::GroundTruth => "Ground Truth",
            Side::Prediction => "Prediction",
        }
    }

    pub fn other(self) -> Side {
        match self {
            Side::GroundTruth => Side::Prediction,
            Side::Prediction => Side::GroundTruth,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The region of the window a viewer draws into, in logical pixels
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub id: String,
    pub width: f32,
    pub height: f32,
    pub pixel_ratio: f32,
}

impl Container {
    pub fn new(id: impl Into<String>, width: f32, height: f32, pixel_ratio: f32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            pixel_ratio,
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }

    fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// One pane of the viewer
pub struct ViewerInstance<R: SceneRenderer> {
    pub scene: Scene,
    pub camera: Camera,
    pub renderer: R,
    pub controls: OrbitControls,
    container_id: String,
    current_mesh: Option<ObjectId>,
    generation: u64,
    applied_generation: u64,
}

/// Build a viewer for `container`.
///
/// `make_renderer` creates the renderer; it is then sized to the container and
/// given its pixel ratio.
pub fn create_viewer<R, F>(container: &Container, config: &ViewerConfig, make_renderer: F) -> Result<ViewerInstance<R>>
where
    R: SceneRenderer,
    F: FnOnce(&Container) -> Result<R>,
{
    let aspect_ratio = if container.has_area() {
        container.aspect_ratio()
    } else {
        1.0
    };
    let camera = Camera::new(
        config.home_position,
        config.target,
        config.up,
        config.fov,
        aspect_ratio,
        config.near,
        config.far,
    );

    let mut renderer = make_renderer(container)?;
    renderer.set_pixel_ratio(container.pixel_ratio);
    renderer.set_size(container.width, container.height);

    let controls = OrbitControls::new(&camera, config.target, config.controls.clone());
    let scene = Scene::new(config.lights.clone(), config.background.clone());

    tracing::debug!(
        container = %container.id,
        width = container.width,
        height = container.height,
        pixel_ratio = container.pixel_ratio,
        "Created viewer"
    );

    Ok(ViewerInstance {
        scene,
        camera,
        renderer,
        controls,
        container_id: container.id.clone(),
        current_mesh: None,
        generation: 0,
        applied_generation: 0,
    })
}

impl<R: SceneRenderer> ViewerInstance<R> {
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Resize handler of the viewer's container.
    ///
    /// Returns false when nothing changed or the container has no area.
    pub fn resize(&mut self, container: &Container) -> bool {
        if !container.has_area() {
            return false;
        }
        let unchanged = self.renderer.size() == (container.width, container.height)
            && self.renderer.pixel_ratio() == container.pixel_ratio;
        if unchanged {
            return false;
        }

        self.camera.set_aspect_ratio(container.aspect_ratio());
        self.renderer.set_pixel_ratio(container.pixel_ratio);
        self.renderer.set_size(container.width, container.height);
        true
    }

    /// Start a new load request and return its generation
    pub fn begin_load(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Generation of the newest load request
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True while the newest load request has not been applied
    pub fn is_loading(&self) -> bool {
        self.applied_generation != self.generation
    }

    /// Apply the result of load request `generation`.
    ///
    /// Results of anything but the newest request are dropped and leave the
    /// viewer untouched. Otherwise the camera returns to its home pose and
    /// `mesh` replaces the current mesh.
    pub fn apply_load(&mut self, generation: u64, mesh: SceneMesh) -> bool {
        if generation != self.generation {
            tracing::debug!(
                container = %self.container_id,
                generation,
                latest = self.generation,
                "Discarding stale load"
            );
            return false;
        }

        self.controls.reset(&mut self.camera);
        self.replace_mesh(mesh);
        self.applied_generation = generation;
        true
    }

    /// Detach the current mesh, then attach `mesh` in its place
    pub fn replace_mesh(&mut self, mesh: SceneMesh) -> ObjectId {
        if let Some(previous) = self.current_mesh.take() {
            self.scene.remove(previous);
        }
        let id = self.scene.add(mesh);
        self.current_mesh = Some(id);
        id
    }

    pub fn current_mesh(&self) -> Option<&SceneMesh> {
        self.current_mesh.and_then(|id| self.scene.get(id))
    }

    pub fn current_mesh_id(&self) -> Option<ObjectId> {
        self.current_mesh
    }

    /// Advance the controller; returns whether it moved the camera
    pub fn update_controls(&mut self, dt: f32) -> bool {
        self.controls.update(&mut self.camera, dt)
    }

    pub fn render(&mut self) -> Result<()> {
        self.renderer.render(&self.scene, &self.camera)
    }
}

/// The ground truth and prediction viewers; either may be missing
pub struct Viewers<R: SceneRenderer> {
    pub gt: Option<ViewerInstance<R>>,
    pub pred: Option<ViewerInstance<R>>,
}

impl<R: SceneRenderer> Viewers<R> {
    pub fn new(gt: Option<ViewerInstance<R>>, pred: Option<ViewerInstance<R>>) -> Self {
        Self { gt, pred }
    }

    pub fn get(&self, side: Side) -> Option<&ViewerInstance<R>> {
        match side {
            Side::GroundTruth => self.gt.as_ref(),
            Side::Prediction => self.pred.as_ref(),
        }
    }

    pub fn get_mut(&mut self, side: Side) -> Option<&mut ViewerInstance<R>> {
        match side {
            Side::GroundTruth => self.gt.as_mut(),
            Side::Prediction => self.pred.as_mut(),
        }
    }

    /// Mutable access to both viewers at once
    pub fn pair_mut(&mut self) -> (Option<&mut ViewerInstance<R>>, Option<&mut ViewerInstance<R>>) {
        (self.gt.as_mut(), self.pred.as_mut())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Side, &mut ViewerInstance<R>)> {
        [(Side::GroundTruth, self.gt.as_mut()), (Side::Prediction, self.pred.as_mut())]
            .into_iter()
            .filter_map(|(side, viewer)| viewer.map(|v| (side, v)))
    }
}

impl<R: SceneRenderer> Default for Viewers<R> {
    fn default() -> Self {
        Self { gt: None, pred: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;
    use twinview_core::{Point3f, TriangleMesh};
    use twinview_render::{Material, SceneRenderer};

    #[derive(Default)]
    struct NullRenderer {
        size: (f32, f32),
        pixel_ratio: f32,
    }

    impl SceneRenderer for NullRenderer {
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
        fn render(&mut self, _scene: &Scene, _camera: &Camera) -> Result<()> {
            Ok(())
        }
    }

    fn viewer() -> ViewerInstance<NullRenderer> {
        let container = Container::new("viewer-gt", 800.0, 400.0, 2.0);
        create_viewer(&container, &ViewerConfig::default(), |_| Ok(NullRenderer::default())).unwrap()
    }

    fn point_mesh() -> SceneMesh {
        SceneMesh::new(TriangleMesh::from_points(vec![Point3f::origin()]), Material::default())
    }

    #[test]
    fn test_factory() {
        let viewer = viewer();
        assert_eq!(viewer.container_id(), "viewer-gt");
        assert_eq!(viewer.renderer.size(), (800.0, 400.0));
        assert_eq!(viewer.renderer.pixel_ratio(), 2.0);
        assert_eq!(viewer.renderer.drawing_buffer_size(), (1600, 800));
        assert_relative_eq!(viewer.camera.aspect_ratio, 2.0);
        assert_eq!(viewer.camera.position, Point3::new(0.0, 0.0, 3.0));
        assert_eq!(viewer.scene.lights.lights.len(), 3);
        assert!(viewer.current_mesh().is_none());
    }

    #[test]
    fn test_resize() {
        let mut viewer = viewer();
        assert!(!viewer.resize(&Container::new("viewer-gt", 800.0, 400.0, 2.0)));
        assert!(!viewer.resize(&Container::new("viewer-gt", 0.0, 400.0, 2.0)));

        assert!(viewer.resize(&Container::new("viewer-gt", 300.0, 600.0, 1.0)));
        assert_relative_eq!(viewer.camera.aspect_ratio, 0.5);
        assert_eq!(viewer.renderer.size(), (300.0, 600.0));
        assert_eq!(viewer.renderer.pixel_ratio(), 1.0);
    }

    #[test]
    fn test_replace_keeps_single_mesh() {
        let mut viewer = viewer();
        let first = viewer.replace_mesh(point_mesh());
        let second = viewer.replace_mesh(point_mesh());

        assert_ne!(first, second);
        assert_eq!(viewer.scene.mesh_count(), 1);
        assert!(!viewer.scene.contains(first));
        assert_eq!(viewer.current_mesh_id(), Some(second));
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let mut viewer = viewer();
        let stale = viewer.begin_load();
        let latest = viewer.begin_load();
        assert!(viewer.is_loading());

        viewer.camera.position = Point3::new(5.0, 0.0, 0.0);
        assert!(!viewer.apply_load(stale, point_mesh()));
        assert_eq!(viewer.scene.mesh_count(), 0);
        assert_eq!(viewer.camera.position, Point3::new(5.0, 0.0, 0.0));

        assert!(viewer.apply_load(latest, point_mesh()));
        assert!(!viewer.is_loading());
        assert_eq!(viewer.scene.mesh_count(), 1);
        assert_relative_eq!(viewer.camera.position, Point3::new(0.0, 0.0, 3.0), epsilon = 1e-6);
    }

    #[test]
    fn test_side_naming() {
        assert_eq!(Side::GroundTruth.suffix(), "_gt");
        assert_eq!(Side::Prediction.suffix(), "_pred");
        assert_eq!(Side::Prediction.container_id(), "viewer-pred");
        assert_eq!(Side::GroundTruth.other(), Side::Prediction);
        assert_eq!(Side::Prediction.to_string(), "Prediction");
    }
}
