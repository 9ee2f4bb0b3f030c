//! Asset fetching
//!
//! Model files are addressed by URL-like relative paths such as
//! `assets/models/chair_gt.ply`. An [`AssetSource`] turns such a path into bytes and
//! reports progress while doing so.

use crate::error::{IoError, Result};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::AsyncReadExt;

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Bytes received so far for one fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl LoadProgress {
    /// Fraction in `0..=1`, when the total size is known
    pub fn fraction(&self) -> Option<f32> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.loaded as f64 / total as f64).min(1.0) as f32),
            None => None,
        }
    }
}

/// Callback receiving [`LoadProgress`] updates
pub type ProgressFn<'a> = dyn Fn(LoadProgress) + Send + Sync + 'a;

/// Something model bytes can be fetched from
pub trait AssetSource: Send + Sync + 'static {
    /// Fetch the complete contents behind `url`
    fn fetch(&self, url: &str, progress: &ProgressFn<'_>) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Reads assets from the local filesystem, relative to a root directory
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for a URL
    pub fn resolve(&self, url: &str) -> PathBuf {
        self.root.join(url.trim_start_matches('/'))
    }
}

impl AssetSource for FsAssetSource {
    fn fetch(&self, url: &str, progress: &ProgressFn<'_>) -> impl Future<Output = Result<Vec<u8>>> + Send {
        let path = self.resolve(url);
        async move {
            let mut file = match tokio::fs::File::open(&path).await {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(IoError::FileNotFound {
                        path: path.display().to_string(),
                    })
                }
                Err(e) => return Err(e.into()),
            };

            let total = file.metadata().await.ok().map(|m| m.len());
            let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
            let mut chunk = vec![0u8; READ_CHUNK_SIZE];

            loop {
                let read = file.read(&mut chunk).await?;
                if read == 0 {
                    break;
                }
                bytes.extend_from_slice(&chunk[..read]);
                progress(LoadProgress {
                    loaded: bytes.len() as u64,
                    total,
                });
            }

            Ok(bytes)
        }
    }
}

/// Serves assets from memory and records every requested URL
#[derive(Debug, Default)]
pub struct MemoryAssetSource {
    assets: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset, builder style
    pub fn with_asset(mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(url, bytes);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.assets.insert(url.into(), bytes.into());
    }

    /// URLs fetched so far, in request order
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl AssetSource for MemoryAssetSource {
    fn fetch(&self, url: &str, progress: &ProgressFn<'_>) -> impl Future<Output = Result<Vec<u8>>> + Send {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        let result = match self.assets.get(url) {
            Some(bytes) => {
                let total = bytes.len() as u64;
                progress(LoadProgress {
                    loaded: total,
                    total: Some(total),
                });
                Ok(bytes.clone())
            }
            None => Err(IoError::FileNotFound {
                path: url.to_string(),
            }),
        };
        std::future::ready(result)
    }
}
