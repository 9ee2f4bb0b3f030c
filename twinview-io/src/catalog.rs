//! Discovery of comparable model pairs on disk

use crate::error::{IoError, Result};
use std::path::Path;

/// Suffix of the ground-truth file of a model pair
pub const GROUND_TRUTH_SUFFIX: &str = "_gt";
/// Suffix of the prediction file of a model pair
pub const PREDICTION_SUFFIX: &str = "_pred";
/// Extension of model files
pub const MODEL_EXTENSION: &str = "ply";

/// Sorted list of asset names that have a ground-truth file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetCatalog {
    names: Vec<String>,
}

impl AssetCatalog {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        Self { names }
    }

    /// List every `<name>` with a `<name>_gt.ply` in `dir`
    pub fn scan<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IoError::FileNotFound {
                path: dir.display().to_string(),
            },
            _ => IoError::Io(e),
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(MODEL_EXTENSION) {
                continue;
            }
            let Some(name) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|stem| stem.strip_suffix(GROUND_TRUTH_SUFFIX))
            else {
                continue;
            };

            let prediction = dir.join(format!("{}{}.{}", name, PREDICTION_SUFFIX, MODEL_EXTENSION));
            if !prediction.exists() {
                tracing::warn!(name, "ground truth has no matching prediction file");
            }
            names.push(name.to_string());
        }

        let catalog = Self::from_names(names);
        tracing::info!(dir = %dir.display(), models = catalog.len(), "scanned asset catalog");
        Ok(catalog)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn first(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
