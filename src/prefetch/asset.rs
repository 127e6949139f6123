use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::DecodeError;

/// Progress of one entry's decode.
pub enum AssetState<T> {
    Loading,
    Ready(Arc<T>),
    Failed(Arc<DecodeError>),
}

impl<T> AssetState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, AssetState::Loading)
    }
}

impl<T> Clone for AssetState<T> {
    fn clone(&self) -> Self {
        match self {
            AssetState::Loading => AssetState::Loading,
            AssetState::Ready(value) => AssetState::Ready(value.clone()),
            AssetState::Failed(err) => AssetState::Failed(err.clone()),
        }
    }
}

impl<T> fmt::Debug for AssetState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetState::Loading => f.write_str("Loading"),
            AssetState::Ready(_) => f.write_str("Ready"),
            AssetState::Failed(err) => write!(f, "Failed({err})"),
        }
    }
}

/// The decode result for one entry index.
///
/// Starts out [`AssetState::Loading`] and moves exactly once to `Ready` or
/// `Failed`. Any number of tasks may [`wait`](Self::wait) for that move, before
/// or after it happens.
pub struct AsyncAsset<T> {
    index: usize,
    state: watch::Receiver<AssetState<T>>,
}

impl<T> AsyncAsset<T> {
    /// A fresh `Loading` asset and the handle that completes it.
    pub(crate) fn pending(index: usize) -> (Arc<Self>, Completion<T>) {
        let (tx, rx) = watch::channel(AssetState::Loading);
        let asset = Arc::new(Self { index, state: rx });
        (
            asset,
            Completion {
                index,
                tx: Some(tx),
            },
        )
    }

    /// The entry index this asset decodes.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AssetState<T> {
        self.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// Wait for the decode to finish.
    pub async fn wait(&self) -> Result<Arc<T>, Arc<DecodeError>> {
        let mut rx = self.state.clone();
        let state = match rx.wait_for(|state| !state.is_loading()).await {
            Ok(state) => state.clone(),
            // Unreachable while `Completion` publishes on drop, kept total anyway.
            Err(_) => AssetState::Failed(Arc::new(DecodeError::Abandoned { index: self.index })),
        };

        match state {
            AssetState::Ready(value) => Ok(value),
            AssetState::Failed(err) => Err(err),
            AssetState::Loading => Err(Arc::new(DecodeError::Abandoned { index: self.index })),
        }
    }
}

impl<T> fmt::Debug for AsyncAsset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncAsset")
            .field("index", &self.index)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

/// Write side of an [`AsyncAsset`]. Dropping it unfinished marks the asset
/// abandoned, so waiters never hang on a decode task that died.
pub(crate) struct Completion<T> {
    index: usize,
    tx: Option<watch::Sender<AssetState<T>>>,
}

impl<T> Completion<T> {
    pub(crate) fn finish(mut self, result: Result<T, DecodeError>) {
        let state = match result {
            Ok(value) => AssetState::Ready(Arc::new(value)),
            Err(err) => AssetState::Failed(Arc::new(err)),
        };
        if let Some(tx) = self.tx.take() {
            tx.send_replace(state);
        }
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            tx.send_replace(AssetState::Failed(Arc::new(DecodeError::Abandoned {
                index: self.index,
            })));
        }
    }
}
