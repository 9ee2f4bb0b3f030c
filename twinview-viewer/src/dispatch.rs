//! Background load tasks
//!
//! Loads run on a tokio runtime. Their completions come back to the UI thread
//! over a channel and are applied there, between frames.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use twinview_io::AssetSource;
use twinview_render::SceneRenderer;

use crate::loader::{log_progress, LoadOutcome, ModelLoader};
use crate::viewer::{Side, Viewers};

/// A finished load, tagged with the request it answers
#[derive(Debug)]
pub struct LoadCompletion {
    pub side: Side,
    pub generation: u64,
    pub url: String,
    pub outcome: LoadOutcome,
}

/// What applying a completion did
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Loaded,
    /// A placeholder was attached; carries the error message
    Failed(String),
    /// A newer request superseded this one
    Stale,
    /// The side has no viewer
    NoViewer,
}

/// Spawns load tasks, at most one in flight per side
pub struct LoadDispatcher<S: AssetSource> {
    runtime: Handle,
    loader: Arc<ModelLoader<S>>,
    sender: flume::Sender<LoadCompletion>,
    receiver: flume::Receiver<LoadCompletion>,
    in_flight: HashMap<Side, AbortHandle>,
}

impl<S: AssetSource> LoadDispatcher<S> {
    pub fn new(runtime: Handle, loader: ModelLoader<S>) -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            runtime,
            loader: Arc::new(loader),
            sender,
            receiver,
            in_flight: HashMap::new(),
        }
    }

    pub fn loader(&self) -> &ModelLoader<S> {
        &self.loader
    }

    /// Start loading `url` for `side`, aborting whatever that side was still loading
    pub fn dispatch(&mut self, side: Side, generation: u64, url: String) {
        if let Some(previous) = self.in_flight.remove(&side) {
            if !previous.is_finished() {
                tracing::debug!(%side, "Aborting previous load");
            }
            previous.abort();
        }

        let loader = self.loader.clone();
        let sender = self.sender.clone();
        let task = self.runtime.spawn(async move {
            let progress = log_progress(url.clone());
            let outcome = loader.load(&url, &progress).await;
            let completion = LoadCompletion {
                side,
                generation,
                url,
                outcome,
            };
            if sender.send(completion).is_err() {
                tracing::debug!(%side, "Load finished after the viewer shut down");
            }
        });

        self.in_flight.insert(side, task.abort_handle());
    }

    /// Completions received so far, without waiting
    pub fn try_completions(&self) -> Vec<LoadCompletion> {
        self.receiver.try_iter().collect()
    }

    /// Wait for the next completion
    pub async fn next_completion(&self) -> Option<LoadCompletion> {
        self.receiver.recv_async().await.ok()
    }
}

/// Hand a completion to the viewer it belongs to
pub fn apply_completion<R: SceneRenderer>(viewers: &mut Viewers<R>, completion: LoadCompletion) -> Applied {
    let Some(viewer) = viewers.get_mut(completion.side) else {
        return Applied::NoViewer;
    };

    let error = completion.outcome.error().map(|e| e.to_string());
    if !viewer.apply_load(completion.generation, completion.outcome.into_mesh()) {
        tracing::debug!(side = %completion.side, url = %completion.url, "Ignoring superseded load");
        return Applied::Stale;
    }

    match error {
        Some(message) => Applied::Failed(message),
        None => Applied::Loaded,
    }
}
