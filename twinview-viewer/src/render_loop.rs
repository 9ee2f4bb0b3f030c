//! Per-frame update of both viewers

use twinview_render::SceneRenderer;

use crate::sync::CameraSync;
use crate::viewer::{Side, Viewers};

/// What one frame did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub rendered: usize,
    pub errors: usize,
    pub controls_changed: usize,
    pub synced_from: Option<Side>,
}

/// Advance the controllers by `delta` seconds, apply camera sync, then render
/// every existing viewer once.
///
/// Render errors are logged and counted; they never stop the loop.
pub fn animate<R: SceneRenderer>(viewers: &mut Viewers<R>, sync: &mut CameraSync, delta: f32) -> FrameReport {
    let gt_changed = viewers.gt.as_mut().is_some_and(|v| v.update_controls(delta));
    let pred_changed = viewers.pred.as_mut().is_some_and(|v| v.update_controls(delta));

    let mut report = FrameReport {
        controls_changed: usize::from(gt_changed) + usize::from(pred_changed),
        synced_from: sync.on_change(viewers, gt_changed, pred_changed),
        ..Default::default()
    };

    for (side, viewer) in viewers.iter_mut() {
        match viewer.render() {
            Ok(()) => report.rendered += 1,
            Err(error) => {
                report.errors += 1;
                tracing::error!(%side, %error, "Render failed");
            }
        }
    }

    report
}
