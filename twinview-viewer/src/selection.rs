//! Model selection
//!
//! The selected name maps to one file per side:
//! `<base>/<name>_gt.ply` and `<base>/<name>_pred.ply`.

use twinview_io::{AssetCatalog, AssetSource, MODEL_EXTENSION};
use twinview_render::SceneRenderer;

use crate::dispatch::LoadDispatcher;
use crate::viewer::{Side, Viewers};

/// URL of `name`'s model file for `side`
pub fn model_url(base: &str, name: &str, side: Side) -> String {
    let base = base.trim_end_matches('/');
    let file = format!("{}{}.{}", name, side.suffix(), MODEL_EXTENSION);
    if base.is_empty() {
        file
    } else {
        format!("{}/{}", base, file)
    }
}

/// The model list and which entry is selected
#[derive(Debug, Clone)]
pub struct Selection {
    catalog: AssetCatalog,
    base: String,
    selected: Option<String>,
}

impl Selection {
    /// Select `initial` if given, otherwise the first catalog entry
    pub fn new(catalog: AssetCatalog, base: impl Into<String>, initial: Option<String>) -> Self {
        let selected = initial.or_else(|| catalog.first().map(str::to_string));
        Self {
            catalog,
            base: base.into(),
            selected,
        }
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Change the selection; returns whether it changed
    pub fn select(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.selected.as_deref() == Some(name.as_str()) {
            return false;
        }
        self.selected = Some(name);
        true
    }

    /// Start loading the selected model into every existing viewer.
    ///
    /// Does nothing without a selection. Returns how many loads were started.
    pub fn load_selected<R, S>(&self, viewers: &mut Viewers<R>, dispatcher: &mut LoadDispatcher<S>) -> usize
    where
        R: SceneRenderer,
        S: AssetSource,
    {
        let Some(name) = self.selected.as_deref() else {
            return 0;
        };

        let mut started = 0;
        for side in Side::ALL {
            let Some(viewer) = viewers.get_mut(side) else {
                tracing::debug!(%side, "No viewer, skipping load");
                continue;
            };
            let url = model_url(&self.base, name, side);
            let generation = viewer.begin_load();
            dispatcher.dispatch(side, generation, url);
            started += 1;
        }

        tracing::info!(model = name, loads = started, "Selected model");
        started
    }
}
