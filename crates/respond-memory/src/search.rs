//! Hybrid incident search: vector similarity, payload filters, and recency.
//!
//! HybridSearchEngine embeds the query, asks the store for the top matches
//! under the requested filters, and reranks them by age. Reranking only
//! reorders the `limit` hits the store returned; an older but more similar
//! report outside that window is never pulled in.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use respond_core::error::{RespondError, Result};
use respond_core::geo::km_to_meters;
use respond_core::types::{GeoPoint, IncidentPayload, IncidentStatus, Urgency};
use respond_vector::embedding::DynEmbeddingService;
use respond_vector::filter::{Condition, Filter};
use respond_vector::store::VectorStore;

use crate::decay::decay_at;
use crate::evidence::EvidenceSummary;

/// Circle around a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoRadius {
    pub center: GeoPoint,
    pub radius_km: f64,
}

/// Filters applied to search queries. All set filters must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub zone_id: Option<String>,
    pub urgency: Option<Urgency>,
    pub status: Option<IncidentStatus>,
    /// Only incidents whose event time falls within the trailing window.
    pub last_hours: Option<u32>,
    pub geo: Option<GeoRadius>,
}

impl SearchFilters {
    pub fn zone(zone_id: impl Into<String>) -> Self {
        Self {
            zone_id: Some(zone_id.into()),
            ..Default::default()
        }
    }

    /// Translate into a store filter as of `now`.
    pub fn to_filter(&self, now: DateTime<Utc>) -> Result<Option<Filter>> {
        if let Some(geo) = &self.geo {
            if !(geo.radius_km > 0.0) {
                return Err(RespondError::Validation(format!(
                    "radius_km must be positive, got {}",
                    geo.radius_km
                )));
            }
            GeoPoint::new(geo.center.lat, geo.center.lon)?;
        }

        // A window reaching past the earliest representable time covers
        // every incident, so it adds no condition.
        let since = self
            .last_hours
            .and_then(|h| Duration::try_hours(i64::from(h)))
            .and_then(|window| now.checked_sub_signed(window))
            .map(|start| start.timestamp() as f64);

        Ok(Filter::combine([
            self.zone_id.as_ref().map(|zone| Condition::Match {
                key: "zone_id".to_string(),
                value: json!(zone),
            }),
            self.urgency.map(|urgency| Condition::Match {
                key: "urgency".to_string(),
                value: json!(urgency),
            }),
            self.status.map(|status| Condition::Match {
                key: "status".to_string(),
                value: json!(status),
            }),
            since.map(|gte| Condition::Range {
                key: "timestamp_unix".to_string(),
                gte: Some(gte),
                lte: None,
            }),
            self.geo.map(|geo| Condition::GeoRadius {
                key: "location".to_string(),
                center: geo.center,
                radius_m: km_to_meters(geo.radius_km),
            }),
        ]))
    }
}

/// A reranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: Uuid,
    /// Raw cosine similarity from the store.
    pub score: f64,
    pub decay_factor: f64,
    /// `score * decay_factor`; results are ordered by this.
    pub final_score: f64,
    pub age_seconds: i64,
    pub evidence: EvidenceSummary,
    pub payload: IncidentPayload,
}

/// Search engine combining vector similarity, metadata filtering, and
/// recency decay.
#[derive(Clone)]
pub struct HybridSearchEngine {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn DynEmbeddingService>,
    collection: String,
    max_limit: usize,
}

impl HybridSearchEngine {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn DynEmbeddingService>,
        collection: impl Into<String>,
        max_limit: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            collection: collection.into(),
            max_limit,
        }
    }

    /// Search incidents as of the current wall clock.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>> {
        self.search_at(query, limit, filters, Utc::now()).await
    }

    /// Search incidents, computing the time window and ages against `now`.
    pub async fn search_at(
        &self,
        query: &str,
        limit: usize,
        filters: &SearchFilters,
        now: DateTime<Utc>,
    ) -> Result<Vec<SearchResult>> {
        if limit == 0 || limit > self.max_limit {
            return Err(RespondError::Validation(format!(
                "limit must be within 1..={}, got {}",
                self.max_limit, limit
            )));
        }

        let query_vec = self.embedder.embed_boxed(query).await?;
        let filter = filters.to_filter(now)?;

        let hits = self
            .store
            .search(&self.collection, &query_vec, limit, filter.as_ref())
            .await?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let payload = IncidentPayload::from_payload(hit.payload)?;
            let decay = decay_at(hit.score, payload.timestamp_unix, now);
            results.push(SearchResult {
                id: hit.id,
                score: hit.score,
                decay_factor: decay.decay_factor,
                final_score: decay.final_score,
                age_seconds: decay.age_seconds,
                evidence: EvidenceSummary::from_incident(&payload),
                payload,
            });
        }

        // Stable: equal final scores keep the store's order.
        results.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            collection = %self.collection,
            limit,
            filtered = filter.is_some(),
            hits = results.len(),
            "Hybrid search complete"
        );

        Ok(results)
    }
}
