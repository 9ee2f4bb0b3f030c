//! Optional camera mirroring between the two panes

use twinview_render::SceneRenderer;

use crate::viewer::{Side, Viewers};

/// Copies one viewer's camera pose onto the other whenever it moves.
///
/// Inactive until enabled. When both viewers moved in the same frame the ground
/// truth pose is the one copied.
#[derive(Debug, Clone, Default)]
pub struct CameraSync {
    enabled: bool,
    syncing: bool,
}

impl CameraSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self) {
        self.set_enabled(true);
    }

    pub fn disable(&mut self) {
        self.set_enabled(false);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            tracing::info!(enabled, "Camera sync toggled");
        }
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Propagate this frame's controller changes; returns the side that was copied from
    pub fn on_change<R: SceneRenderer>(
        &mut self,
        viewers: &mut Viewers<R>,
        gt_changed: bool,
        pred_changed: bool,
    ) -> Option<Side> {
        if !self.enabled || self.syncing {
            return None;
        }
        let source = match (gt_changed, pred_changed) {
            (true, _) => Side::GroundTruth,
            (false, true) => Side::Prediction,
            (false, false) => return None,
        };
        let (Some(gt), Some(pred)) = viewers.pair_mut() else {
            return None;
        };
        let (from, to) = match source {
            Side::GroundTruth => (gt, pred),
            Side::Prediction => (pred, gt),
        };

        self.syncing = true;
        to.camera.set_pose(from.camera.pose());
        to.controls.follow(from.controls.target, &to.camera);
        self.syncing = false;

        tracing::trace!(%source, "Synced camera");
        Some(source)
    }
}
