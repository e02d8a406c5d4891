//! Incident ingestion.
//!
//! `IncidentIngester` validates a report, fills defaults, embeds the text
//! and stores it. `SmartIngester` first looks for a recent incident in the
//! same zone describing the same thing and, if one is close enough,
//! reinforces it instead of creating a duplicate.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use respond_core::config::{DedupConfig, StoreConfig};
use respond_core::error::{RespondError, Result};
use respond_core::geo::is_valid_lat_lon;
use respond_core::types::{Incident, IncidentPayload, NewIncident};
use respond_vector::embedding::DynEmbeddingService;
use respond_vector::store::VectorStore;

use crate::reinforcement::{round4, ReinforcementEngine};
use crate::repository::IncidentRepository;
use crate::search::{HybridSearchEngine, SearchFilters};

/// Which collections `ensure_collections` had to create.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionSetup {
    pub created: Vec<String>,
    pub existing: Vec<String>,
}

/// Create the incident, event and deployment collections if they are
/// missing.
pub async fn ensure_collections(store: &dyn VectorStore, config: &StoreConfig) -> Result<CollectionSetup> {
    let mut setup = CollectionSetup::default();
    for name in [
        config.incidents_collection(),
        config.events_collection(),
        config.deployments_collection(),
    ] {
        if store.collection_exists(&name).await? {
            debug!(collection = %name, "Collection already exists");
            setup.existing.push(name);
        } else {
            store.create_collection(&name, config.vector_size).await?;
            info!(collection = %name, vector_size = config.vector_size, "Created collection");
            setup.created.push(name);
        }
    }
    Ok(setup)
}

/// Check a report before anything is embedded or stored.
pub fn validate_new_incident(new: &NewIncident) -> Result<()> {
    if new.text.trim().is_empty() {
        return Err(RespondError::Validation(
            "text is required and cannot be empty".to_string(),
        ));
    }
    if let Some(confidence) = new.confidence_score {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(RespondError::Validation(format!(
                "confidence_score must be within [0, 1], got {}",
                confidence
            )));
        }
    }
    if let Some(location) = new.location {
        if !is_valid_lat_lon(location.lat, location.lon) {
            return Err(RespondError::Validation(format!(
                "Invalid coordinates: lat={}, lon={}",
                location.lat, location.lon
            )));
        }
    }
    Ok(())
}

/// Stores new incidents.
#[derive(Clone)]
pub struct IncidentIngester {
    incidents: IncidentRepository,
    embedder: Arc<dyn DynEmbeddingService>,
    default_confidence: f64,
}

impl IncidentIngester {
    pub fn new(
        incidents: IncidentRepository,
        embedder: Arc<dyn DynEmbeddingService>,
        default_confidence: f64,
    ) -> Self {
        Self {
            incidents,
            embedder,
            default_confidence,
        }
    }

    /// Validate, fill defaults, embed and store a report as a new incident.
    pub async fn ingest(&self, new: NewIncident) -> Result<Incident> {
        if let Err(e) = validate_new_incident(&new) {
            warn!(source = %new.source_type, error = %e, "Rejected incident report");
            return Err(e);
        }

        let now = Utc::now();
        let timestamp = new.timestamp.unwrap_or(now);
        let payload = IncidentPayload {
            text: new.text,
            source_type: new.source_type,
            urgency: new.urgency.unwrap_or_default(),
            status: new.status.unwrap_or_default(),
            zone_id: new.zone_id.unwrap_or_else(|| "unknown".to_string()),
            confidence_score: new.confidence_score.unwrap_or(self.default_confidence),
            location: new.location,
            timestamp: Some(timestamp),
            timestamp_unix: Some(timestamp.timestamp()),
            evidence_chain: Vec::new(),
            reinforced_count: 0,
            created_at: Some(now),
            updated_at: Some(now),
        };

        let vector = self.embedder.embed_boxed(&payload.text).await?;
        let id = Uuid::new_v4();
        self.incidents.insert(id, vector, &payload).await?;

        info!(
            incident_id = %id,
            source = %payload.source_type,
            zone_id = %payload.zone_id,
            urgency = %payload.urgency,
            "Ingested incident"
        );

        Ok(Incident { id, payload })
    }
}

/// Result of smart ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestOutcome {
    /// The new incident, or the existing one that was reinforced.
    pub incident_id: Uuid,
    pub deduplicated: bool,
    /// Raw similarity to the reinforced incident.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_confidence: Option<f64>,
    /// The stored incident when one was created.
    #[serde(skip)]
    pub created: Option<Incident>,
}

/// Ingester that merges near-duplicate reports into existing incidents.
#[derive(Clone)]
pub struct SmartIngester {
    ingester: IncidentIngester,
    search: HybridSearchEngine,
    reinforcement: ReinforcementEngine,
    policy: DedupConfig,
}

impl SmartIngester {
    pub fn new(
        ingester: IncidentIngester,
        search: HybridSearchEngine,
        reinforcement: ReinforcementEngine,
        policy: DedupConfig,
    ) -> Self {
        Self {
            ingester,
            search,
            reinforcement,
            policy,
        }
    }

    /// Reinforce a recent matching incident, or create a new one.
    ///
    /// Candidates are incidents from the trailing dedup window, restricted to
    /// the report's zone when it names one. Only the top reranked candidate
    /// is considered, compared on its raw similarity.
    pub async fn ingest(&self, new: NewIncident) -> Result<IngestOutcome> {
        if let Err(e) = validate_new_incident(&new) {
            warn!(source = %new.source_type, error = %e, "Rejected incident report");
            return Err(e);
        }

        let filters = SearchFilters {
            zone_id: new.zone_id.clone(),
            last_hours: Some(self.policy.window_hours),
            ..Default::default()
        };
        let candidates = self
            .search
            .search(&new.text, self.policy.candidates, &filters)
            .await?;

        if let Some(top) = candidates.first() {
            debug!(candidate = %top.id, similarity = top.score, "Top dedup candidate");
            if top.score >= self.policy.threshold {
                let outcome = self
                    .reinforcement
                    .reinforce(top.id, new.source_type, &new.text)
                    .await?;
                info!(
                    incident_id = %top.id,
                    similarity = round4(top.score),
                    "Deduplicated report into existing incident"
                );
                return Ok(IngestOutcome {
                    incident_id: top.id,
                    deduplicated: true,
                    similarity: Some(round4(top.score)),
                    new_confidence: Some(outcome.new_confidence),
                    created: None,
                });
            }
        }

        let incident = self.ingester.ingest(new).await?;
        Ok(IngestOutcome {
            incident_id: incident.id,
            deduplicated: false,
            similarity: None,
            new_confidence: None,
            created: Some(incident),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use respond_core::types::{GeoPoint, SourceType, Urgency};

    #[test]
    fn test_validate_accepts_minimal_report() {
        let new = NewIncident::new("Flooding on main road", SourceType::Social);
        assert!(validate_new_incident(&new).is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_text() {
        let new = NewIncident::new("   ", SourceType::Call);
        assert!(validate_new_incident(&new).unwrap_err().is_validation());
    }

    #[test]
    fn test_validate_rejects_confidence_out_of_range() {
        let mut new = NewIncident::new("Gas leak", SourceType::Sensor);
        new.confidence_score = Some(1.2);
        assert!(validate_new_incident(&new).unwrap_err().is_validation());
    }

    #[test]
    fn test_validate_rejects_bad_location() {
        let new = NewIncident::new("Landslide", SourceType::Satellite)
            .with_urgency(Urgency::High)
            .with_location(GeoPoint { lat: 95.0, lon: 10.0 });
        assert!(validate_new_incident(&new).unwrap_err().is_validation());
    }
}
