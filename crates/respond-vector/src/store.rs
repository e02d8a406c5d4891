//! Vector store contract and a brute-force in-memory implementation.
//!
//! The engine talks to the store only through [`VectorStore`]. The
//! in-memory store scores every point with cosine similarity on each search,
//! which is enough for tests and the command-line tool. It can be persisted
//! as a JSON snapshot between process runs.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use respond_core::error::{RespondError, Result};
use respond_core::types::Payload;

use crate::filter::Filter;
use crate::similarity::cosine_similarity;

/// A search hit with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: Uuid,
    /// Cosine similarity to the query vector.
    pub score: f64,
    pub payload: Payload,
}

/// A point fetched by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    pub payload: Payload,
}

/// Operations the engine requires from a vector database.
///
/// Each call is independent; the trait offers no transactions, so a
/// retrieve followed by `set_payload` is not atomic.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a collection holding vectors of `vector_size` dimensions.
    async fn create_collection(&self, name: &str, vector_size: usize) -> Result<()>;

    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Insert or replace a point. Fails with `DimensionMismatch` when the
    /// vector length differs from the collection's configured size.
    async fn upsert(&self, collection: &str, id: Uuid, vector: Vec<f32>, payload: Payload)
        -> Result<()>;

    /// Top-`limit` points by descending cosine similarity among those
    /// matching `filter`.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredPoint>>;

    /// Up to `limit` points matching `filter`, in storage order, without
    /// scoring against a query vector.
    async fn scroll(&self, collection: &str, limit: usize, filter: Option<&Filter>)
        -> Result<Vec<Record>>;

    /// Fetch points by id. Unknown ids are omitted from the result.
    async fn retrieve(&self, collection: &str, ids: &[Uuid]) -> Result<Vec<Record>>;

    /// Merge `payload` into a point's payload, keeping fields not mentioned.
    async fn set_payload(&self, collection: &str, id: Uuid, payload: Payload) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPoint {
    id: Uuid,
    vector: Vec<f32>,
    payload: Payload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Collection {
    vector_size: usize,
    /// Points in first-insertion order; search ties keep this order.
    points: Vec<StoredPoint>,
    #[serde(skip)]
    positions: HashMap<Uuid, usize>,
}

impl Collection {
    fn new(vector_size: usize) -> Self {
        Self {
            vector_size,
            ..Default::default()
        }
    }

    fn reindex(&mut self) {
        self.positions = self
            .points
            .iter()
            .enumerate()
            .map(|(pos, p)| (p.id, pos))
            .collect();
    }

    fn check_dimensions(&self, len: usize) -> Result<()> {
        if len != self.vector_size {
            return Err(RespondError::DimensionMismatch {
                expected: self.vector_size,
                actual: len,
            });
        }
        Ok(())
    }
}

/// In-memory vector store using brute-force cosine similarity.
///
/// Thread-safe via interior RwLock; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVectorStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> RespondError {
    RespondError::Dependency(format!("Lock poisoned: {}", e))
}

fn missing_collection(name: &str) -> RespondError {
    RespondError::Dependency(format!("Collection '{}' does not exist", name))
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a JSON snapshot. A missing file yields an empty
    /// store.
    pub fn load_snapshot(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No snapshot found, starting empty");
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let mut collections: HashMap<String, Collection> = serde_json::from_str(&content)?;
        for collection in collections.values_mut() {
            collection.reindex();
        }
        info!(path = %path.display(), collections = collections.len(), "Snapshot loaded");
        Ok(Self {
            collections: Arc::new(RwLock::new(collections)),
        })
    }

    /// Write all collections to a JSON snapshot.
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let collections = self.collections.read().map_err(poisoned)?;
        let content = serde_json::to_string(&*collections)?;
        std::fs::write(path, content)?;
        debug!(path = %path.display(), "Snapshot saved");
        Ok(())
    }

    /// Number of points in a collection (0 if it does not exist).
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, |col| col.points.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, vector_size: usize) -> Result<()> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        collections
            .entry(name.to_string())
            .or_insert_with(|| Collection::new(vector_size));
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections.contains_key(name))
    }

    async fn upsert(
        &self,
        collection: &str,
        id: Uuid,
        vector: Vec<f32>,
        payload: Payload,
    ) -> Result<()> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let col = collections
            .get_mut(collection)
            .ok_or_else(|| missing_collection(collection))?;
        col.check_dimensions(vector.len())?;

        let point = StoredPoint {
            id,
            vector,
            payload,
        };
        match col.positions.get(&id) {
            Some(&pos) => col.points[pos] = point,
            None => {
                col.positions.insert(id, col.points.len());
                col.points.push(point);
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read().map_err(poisoned)?;
        let col = collections
            .get(collection)
            .ok_or_else(|| missing_collection(collection))?;
        col.check_dimensions(vector.len())?;

        let mut scored = Vec::new();
        for point in &col.points {
            if filter.is_some_and(|f| !f.matches(&point.payload)) {
                continue;
            }
            scored.push(ScoredPoint {
                id: point.id,
                score: cosine_similarity(vector, &point.vector)?,
                payload: point.payload.clone(),
            });
        }

        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        debug!(collection, hits = scored.len(), "In-memory search");
        Ok(scored)
    }

    async fn scroll(
        &self,
        collection: &str,
        limit: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<Record>> {
        let collections = self.collections.read().map_err(poisoned)?;
        let col = collections
            .get(collection)
            .ok_or_else(|| missing_collection(collection))?;
        Ok(col
            .points
            .iter()
            .filter(|p| filter.map_or(true, |f| f.matches(&p.payload)))
            .take(limit)
            .map(|p| Record {
                id: p.id,
                payload: p.payload.clone(),
            })
            .collect())
    }

    async fn retrieve(&self, collection: &str, ids: &[Uuid]) -> Result<Vec<Record>> {
        let collections = self.collections.read().map_err(poisoned)?;
        let col = collections
            .get(collection)
            .ok_or_else(|| missing_collection(collection))?;
        Ok(ids
            .iter()
            .filter_map(|id| col.positions.get(id))
            .map(|&pos| Record {
                id: col.points[pos].id,
                payload: col.points[pos].payload.clone(),
            })
            .collect())
    }

    async fn set_payload(&self, collection: &str, id: Uuid, payload: Payload) -> Result<()> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let col = collections
            .get_mut(collection)
            .ok_or_else(|| missing_collection(collection))?;
        let pos = *col.positions.get(&id).ok_or(RespondError::NotFound {
            kind: "Point",
            id: id.to_string(),
        })?;
        col.points[pos].payload.extend(payload);
        Ok(())
    }
}
