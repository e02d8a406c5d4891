//! Lazily initialized, process-wide collaborator handles.
//!
//! Building an embedding model or opening a store is expensive. Each handle
//! is created on first use, exactly once, even when several tasks ask for it
//! at the same moment; later callers get a clone of the same `Arc`.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use respond_core::error::Result;
use respond_vector::embedding::DynEmbeddingService;
use respond_vector::store::VectorStore;

#[derive(Default)]
pub struct SharedHandles {
    store: OnceCell<Arc<dyn VectorStore>>,
    embedder: OnceCell<Arc<dyn DynEmbeddingService>>,
}

impl SharedHandles {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared store, built by `factory` on first use. A failed factory
    /// leaves the handle empty so a later call can retry.
    pub async fn store<F, Fut>(&self, factory: F) -> Result<Arc<dyn VectorStore>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn VectorStore>>>,
    {
        let store = self
            .store
            .get_or_try_init(|| async move {
                let store = factory().await?;
                info!("Vector store handle initialized");
                Ok::<_, respond_core::RespondError>(store)
            })
            .await?;
        Ok(Arc::clone(store))
    }

    /// The shared embedder, built by `factory` on first use.
    pub async fn embedder<F, Fut>(&self, factory: F) -> Result<Arc<dyn DynEmbeddingService>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn DynEmbeddingService>>>,
    {
        let embedder = self
            .embedder
            .get_or_try_init(|| async move {
                let embedder = factory().await?;
                info!(dimensions = embedder.dimensions(), "Embedding handle initialized");
                Ok::<_, respond_core::RespondError>(embedder)
            })
            .await?;
        Ok(Arc::clone(embedder))
    }

    pub fn is_initialized(&self) -> bool {
        self.store.initialized() && self.embedder.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use respond_core::RespondError;
    use respond_vector::embedding::MockEmbedding;
    use respond_vector::store::InMemoryVectorStore;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_builds_once() {
        let handles = Arc::new(SharedHandles::new());
        let builds = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let handles = Arc::clone(&handles);
            let builds = Arc::clone(&builds);
            tasks.push(tokio::spawn(async move {
                handles
                    .embedder(|| async move {
                        builds.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok(Arc::new(MockEmbedding::with_dimensions(8)) as Arc<dyn DynEmbeddingService>)
                    })
                    .await
                    .unwrap()
            }));
        }

        let embedders: Vec<_> = join_all(tasks).await;
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        for e in &embedders[1..] {
            assert!(Arc::ptr_eq(&embedders[0], e));
        }
    }

    async fn join_all<T>(tasks: Vec<tokio::task::JoinHandle<T>>) -> Vec<T> {
        let mut out = Vec::with_capacity(tasks.len());
        for task in tasks {
            out.push(task.await.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_failed_factory_can_retry() {
        let handles = SharedHandles::new();
        let err = handles
            .store(|| async { Err(RespondError::Dependency("store unreachable".to_string())) })
            .await
            .err()
            .unwrap();
        assert!(matches!(err, RespondError::Dependency(_)));
        assert!(!handles.is_initialized());

        let store = handles
            .store(|| async { Ok(Arc::new(InMemoryVectorStore::new()) as Arc<dyn VectorStore>) })
            .await
            .unwrap();
        assert!(!store.collection_exists("anything").await.unwrap());
    }
}
