//! Disaster event clustering via embedding similarity.
//!
//! Each new incident is compared with existing events in its zone. A close
//! enough event absorbs the incident; otherwise the incident starts a new
//! event whose vector is the incident's text embedding.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use respond_core::config::EventConfig;
use respond_core::error::Result;
use respond_core::types::{DisasterEvent, EventPayload, EventStatus, IncidentPayload};
use respond_vector::embedding::DynEmbeddingService;
use respond_vector::filter::{Condition, Filter};

use crate::repository::{fields, EventRepository};

/// Where an incident ended up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAssignment {
    pub event_id: Uuid,
    pub is_new: bool,
    /// Similarity to the joined event; `None` for a new event.
    pub similarity: Option<f64>,
}

/// Event title from incident text: trimmed, and cut to `max_chars` with a
/// trailing `...` when longer.
pub fn generate_title(text: &str, max_chars: usize) -> String {
    let title = text.trim();
    if title.chars().count() <= max_chars {
        return title.to_string();
    }
    let mut cut: String = title.chars().take(max_chars.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

/// Assigns incidents to disaster events.
#[derive(Clone)]
pub struct EventClusterer {
    events: EventRepository,
    embedder: Arc<dyn DynEmbeddingService>,
    policy: EventConfig,
}

impl EventClusterer {
    pub fn new(
        events: EventRepository,
        embedder: Arc<dyn DynEmbeddingService>,
        policy: EventConfig,
    ) -> Self {
        Self {
            events,
            embedder,
            policy,
        }
    }

    /// Attach the incident to the best matching event in its zone, or create
    /// a new event for it.
    ///
    /// Reads the event and writes it back without a lock; concurrent
    /// assignments to the same event can drop a member.
    pub async fn assign(&self, incident_id: Uuid, incident: &IncidentPayload) -> Result<EventAssignment> {
        let vector = self.embedder.embed_boxed(&incident.text).await?;
        let zone_filter = Filter {
            must: vec![Condition::Match {
                key: "zone_id".to_string(),
                value: json!(incident.zone_id),
            }],
        };

        let hits = self
            .events
            .store()
            .search(
                self.events.collection(),
                &vector,
                self.policy.candidates,
                Some(&zone_filter),
            )
            .await?;

        if let Some(top) = hits.into_iter().next() {
            debug!(event_id = %top.id, similarity = top.score, "Top event candidate");
            if top.score >= self.policy.threshold {
                let existing = EventPayload::from_payload(top.payload)?;
                self.add_incident(top.id, incident_id, incident, existing).await?;
                info!(
                    incident_id = %incident_id,
                    event_id = %top.id,
                    similarity = top.score,
                    "Attached incident to event"
                );
                return Ok(EventAssignment {
                    event_id: top.id,
                    is_new: false,
                    similarity: Some(top.score),
                });
            }
        }

        let event_id = self.create_event(incident_id, incident, vector).await?;
        Ok(EventAssignment {
            event_id,
            is_new: true,
            similarity: None,
        })
    }

    pub async fn get_event(&self, event_id: Uuid) -> Result<DisasterEvent> {
        self.events.get(event_id).await
    }

    async fn create_event(
        &self,
        incident_id: Uuid,
        incident: &IncidentPayload,
        vector: Vec<f32>,
    ) -> Result<Uuid> {
        let now = Utc::now();
        let event = EventPayload {
            title: generate_title(&incident.text, self.policy.title_max_chars),
            zone_id: incident.zone_id.clone(),
            incident_ids: vec![incident_id],
            incident_count: 1,
            urgency_max: incident.urgency,
            status: EventStatus::Active,
            created_at: now,
            updated_at: now,
            timestamp_unix: now.timestamp(),
        };

        let event_id = Uuid::new_v4();
        self.events.insert(event_id, vector, &event).await?;

        info!(
            event_id = %event_id,
            incident_id = %incident_id,
            zone_id = %event.zone_id,
            title = %event.title,
            "Created disaster event"
        );
        Ok(event_id)
    }

    async fn add_incident(
        &self,
        event_id: Uuid,
        incident_id: Uuid,
        incident: &IncidentPayload,
        existing: EventPayload,
    ) -> Result<()> {
        let mut incident_ids = existing.incident_ids;
        if !incident_ids.contains(&incident_id) {
            incident_ids.push(incident_id);
        }
        let urgency_max = existing.urgency_max.max_ordinal(incident.urgency);

        self.events
            .update(
                event_id,
                fields([
                    ("incident_count", json!(incident_ids.len())),
                    ("incident_ids", json!(incident_ids)),
                    ("urgency_max", json!(urgency_max)),
                    ("updated_at", json!(Utc::now())),
                ]),
            )
            .await
    }
}
