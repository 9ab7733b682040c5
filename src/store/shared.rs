use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use super::{LoadFailure, VectorStore};

/// Handle to the store currently serving queries.
///
/// Starts out not ready. Readers take an `Arc` snapshot and keep using it even
/// if a rebuilt store is swapped in meanwhile.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    current: Arc<RwLock<Option<Arc<VectorStore>>>>,
}

impl SharedStore {
    /// A handle with no store loaded
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_store(store: VectorStore) -> Self {
        Self {
            current: Arc::new(RwLock::new(Some(Arc::new(store)))),
        }
    }

    /// The store serving queries right now, if any
    #[inline]
    pub async fn snapshot(&self) -> Option<Arc<VectorStore>> {
        self.current.read().await.clone()
    }

    #[inline]
    pub async fn is_ready(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Swap in a new store, returning the one it replaces
    #[inline]
    pub async fn replace(&self, store: VectorStore) -> Option<Arc<VectorStore>> {
        let store = Arc::new(store);
        let previous = self.current.write().await.replace(store);
        info!("Vector store replaced");
        previous
    }

    /// Load a snapshot from disk and swap it in. On failure the current
    /// store, ready or not, is left untouched.
    #[inline]
    pub async fn load_from(&self, path: &Path) -> Result<usize, LoadFailure> {
        let path = path.to_path_buf();
        let store = tokio::task::spawn_blocking(move || VectorStore::load(&path))
            .await
            .map_err(|e| LoadFailure::Io(std::io::Error::other(e)))?
            .inspect_err(|e| warn!("Keeping current vector store: {}", e))?;

        let count = store.len();
        self.replace(store).await;
        Ok(count)
    }
}
