use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

use super::asset::AsyncAsset;
use crate::error::{DecodeError, WindowError};

/// Entries kept on each side of the focus by default.
pub const DEFAULT_RADIUS: usize = 2;

/// Produces the displayable value for an entry index.
#[async_trait]
pub trait EntryDecoder: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    /// Number of entries; valid indices are `0..entry_count()`.
    fn entry_count(&self) -> usize;

    async fn decode(&self, index: usize) -> Result<Self::Output, DecodeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Cached entries are kept within `focus - radius ..= focus + radius`.
    pub radius: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
        }
    }
}

struct WindowState<T> {
    cache: BTreeMap<usize, Arc<AsyncAsset<T>>>,
    focus: Option<usize>,
}

struct Shared<D: EntryDecoder> {
    decoder: D,
    radius: usize,
    state: Mutex<WindowState<D::Output>>,
}

impl<D: EntryDecoder> Shared<D> {
    /// Create an asset for `index` and start decoding it in the background.
    fn start(self: &Arc<Self>, index: usize) -> Arc<AsyncAsset<D::Output>> {
        let (asset, completion) = AsyncAsset::pending(index);
        let shared = self.clone();
        tokio::spawn(async move {
            debug!(index, "decode started");
            let result = shared.decoder.decode(index).await;
            debug!(index, ok = result.is_ok(), "decode finished");
            completion.finish(result);
        });
        asset
    }

    /// Prefetch the immediate neighbours of `index` once its asset is done,
    /// unless a newer `load` has moved the focus in the meantime.
    async fn watch(self: Arc<Self>, index: usize, asset: Arc<AsyncAsset<D::Output>>) {
        let _ = asset.wait().await;
        drop(asset);

        let count = self.decoder.entry_count();
        let mut state = self.state.lock();
        if state.focus != Some(index) {
            debug!(index, focus = ?state.focus, "focus moved, skipping prefetch");
            return;
        }

        let neighbours = [index.checked_sub(1), index.checked_add(1).filter(|&n| n < count)];
        for neighbour in neighbours.into_iter().flatten() {
            if !state.cache.contains_key(&neighbour) {
                debug!(index, neighbour, "prefetching");
                let asset = self.start(neighbour);
                state.cache.insert(neighbour, asset);
            }
        }
    }
}

/// A small set of decoded entries around the entry the user is looking at.
///
/// [`load`](Self::load) returns the asset for an index (starting its decode if
/// needed), makes that index the focus, and drops everything further than
/// `radius` entries away. When the focused asset finishes, its two neighbours
/// are decoded too, so single steps forward or back are usually instant.
/// Neighbour prefetches triggered by an asset that is no longer the focus are
/// skipped.
///
/// Evicted decodes are not cancelled; they finish and their result is dropped.
/// Cloning yields another handle to the same window.
pub struct PrefetchWindow<D: EntryDecoder> {
    shared: Arc<Shared<D>>,
}

impl<D: EntryDecoder> Clone for PrefetchWindow<D> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<D: EntryDecoder> PrefetchWindow<D> {
    pub fn new(decoder: D) -> Self {
        Self::with_config(decoder, WindowConfig::default())
    }

    /// A `radius` of zero is raised to one.
    pub fn with_config(decoder: D, config: WindowConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                decoder,
                radius: config.radius.max(1),
                state: Mutex::new(WindowState {
                    cache: BTreeMap::new(),
                    focus: None,
                }),
            }),
        }
    }

    /// Focus on `index` and return its asset.
    ///
    /// The asset may still be loading; [`AsyncAsset::wait`] yields the result.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn load(&self, index: usize) -> Result<Arc<AsyncAsset<D::Output>>, WindowError> {
        let count = self.shared.decoder.entry_count();
        if index >= count {
            return Err(WindowError::OutOfRange { index, count });
        }

        let asset = {
            let mut state = self.shared.state.lock();

            let asset = match state.cache.get(&index) {
                Some(asset) => {
                    trace!(index, "reusing cached asset");
                    asset.clone()
                }
                None => {
                    let asset = self.shared.start(index);
                    state.cache.insert(index, asset.clone());
                    asset
                }
            };
            state.focus = Some(index);

            let low = index.saturating_sub(self.shared.radius);
            let high = index.saturating_add(self.shared.radius);
            state.cache.retain(|&i, _| {
                let keep = (low..=high).contains(&i);
                if !keep {
                    debug!(index = i, "evicting asset");
                }
                keep
            });

            asset
        };

        tokio::spawn(self.shared.clone().watch(index, asset.clone()));

        Ok(asset)
    }

    /// The cached asset for `index`, without changing the focus.
    pub fn get(&self, index: usize) -> Option<Arc<AsyncAsset<D::Output>>> {
        self.shared.state.lock().cache.get(&index).cloned()
    }

    /// The most recently loaded index.
    pub fn focus(&self) -> Option<usize> {
        self.shared.state.lock().focus
    }

    /// Cached indices in ascending order.
    pub fn cached_indices(&self) -> Vec<usize> {
        self.shared.state.lock().cache.keys().copied().collect()
    }

    /// Number of cached assets.
    pub fn len(&self) -> usize {
        self.shared.state.lock().cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entry_count(&self) -> usize {
        self.shared.decoder.entry_count()
    }

    pub fn radius(&self) -> usize {
        self.shared.radius
    }

    pub fn decoder(&self) -> &D {
        &self.shared.decoder
    }
}
