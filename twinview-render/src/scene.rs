//! Scene graph for a single pane

use std::collections::BTreeMap;

use crate::{background::GradientBackground, light::LightRig, material::Material};
use twinview_core::TriangleMesh;

/// Identifies a mesh inside a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Geometry paired with the material it is drawn with
#[derive(Debug, Clone)]
pub struct SceneMesh {
    pub geometry: TriangleMesh,
    pub material: Material,
}

impl SceneMesh {
    pub fn new(geometry: TriangleMesh, material: Material) -> Self {
        Self { geometry, material }
    }
}

/// Meshes, lights and background of one pane
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub lights: LightRig,
    pub background: GradientBackground,
    meshes: BTreeMap<ObjectId, SceneMesh>,
    next_id: u64,
}

impl Scene {
    pub fn new(lights: LightRig, background: GradientBackground) -> Self {
        Self {
            lights,
            background,
            meshes: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn add(&mut self, mesh: SceneMesh) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.meshes.insert(id, mesh);
        id
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<SceneMesh> {
        self.meshes.remove(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneMesh> {
        self.meshes.get(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.meshes.contains_key(&id)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn meshes(&self) -> impl Iterator<Item = (ObjectId, &SceneMesh)> {
        self.meshes.iter().map(|(id, mesh)| (*id, mesh))
    }
}
