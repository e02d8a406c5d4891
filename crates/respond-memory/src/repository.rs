//! Typed access to the incident, event and deployment collections.
//!
//! Wraps a [`VectorStore`] and converts between store payloads and the
//! domain records. Partial updates go through `set_payload`, so fields not
//! mentioned in an update are left untouched.

use std::sync::Arc;

use uuid::Uuid;

use respond_core::error::{RespondError, Result};
use respond_core::types::{DisasterEvent, EventPayload, Incident, IncidentPayload, Payload};
use respond_vector::filter::Filter;
use respond_vector::store::VectorStore;

use crate::deployment::{Deployment, DeploymentPayload};

/// Repository for incidents in the situation-reports collection.
#[derive(Clone)]
pub struct IncidentRepository {
    store: Arc<dyn VectorStore>,
    collection: String,
}

impl IncidentRepository {
    pub fn new(store: Arc<dyn VectorStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Store a new incident with its text embedding.
    pub async fn insert(&self, id: Uuid, vector: Vec<f32>, incident: &IncidentPayload) -> Result<()> {
        self.store
            .upsert(&self.collection, id, vector, incident.to_payload()?)
            .await
    }

    /// Find an incident by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Incident>> {
        let record = self
            .store
            .retrieve(&self.collection, &[id])
            .await?
            .into_iter()
            .next();

        match record {
            Some(record) => Ok(Some(Incident {
                id: record.id,
                payload: IncidentPayload::from_payload(record.payload)?,
            })),
            None => Ok(None),
        }
    }

    /// Like [`Self::find_by_id`] but a missing incident is an error.
    pub async fn get(&self, id: Uuid) -> Result<Incident> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RespondError::incident_not_found(id))
    }

    /// Overwrite the given top-level fields in one write.
    pub async fn update(&self, id: Uuid, fields: Payload) -> Result<()> {
        self.store
            .set_payload(&self.collection, id, fields)
            .await
            .map_err(|e| match e {
                RespondError::NotFound { .. } => RespondError::incident_not_found(id),
                other => other,
            })
    }
}

/// Repository for disaster events.
#[derive(Clone)]
pub struct EventRepository {
    store: Arc<dyn VectorStore>,
    collection: String,
}

impl EventRepository {
    pub fn new(store: Arc<dyn VectorStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub async fn insert(&self, id: Uuid, vector: Vec<f32>, event: &EventPayload) -> Result<()> {
        self.store
            .upsert(&self.collection, id, vector, event.to_payload()?)
            .await
    }

    pub async fn get(&self, id: Uuid) -> Result<DisasterEvent> {
        let record = self
            .store
            .retrieve(&self.collection, &[id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RespondError::event_not_found(id))?;

        Ok(DisasterEvent {
            id: record.id,
            payload: EventPayload::from_payload(record.payload)?,
        })
    }

    pub async fn update(&self, id: Uuid, fields: Payload) -> Result<()> {
        self.store
            .set_payload(&self.collection, id, fields)
            .await
            .map_err(|e| match e {
                RespondError::NotFound { .. } => RespondError::event_not_found(id),
                other => other,
            })
    }
}

/// Repository for resource deployments.
#[derive(Clone)]
pub struct DeploymentRepository {
    store: Arc<dyn VectorStore>,
    collection: String,
}

impl DeploymentRepository {
    pub fn new(store: Arc<dyn VectorStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub async fn insert(&self, id: Uuid, vector: Vec<f32>, deployment: &DeploymentPayload) -> Result<()> {
        self.store
            .upsert(&self.collection, id, vector, deployment.to_payload()?)
            .await
    }

    pub async fn get(&self, id: Uuid) -> Result<Deployment> {
        let record = self
            .store
            .retrieve(&self.collection, &[id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RespondError::deployment_not_found(id))?;

        Ok(Deployment {
            id: record.id,
            payload: DeploymentPayload::from_payload(record.payload)?,
        })
    }

    pub async fn update(&self, id: Uuid, fields: Payload) -> Result<()> {
        self.store
            .set_payload(&self.collection, id, fields)
            .await
            .map_err(|e| match e {
                RespondError::NotFound { .. } => RespondError::deployment_not_found(id),
                other => other,
            })
    }

    /// Up to `limit` deployments matching `filter`, in creation order.
    pub async fn list(&self, limit: usize, filter: Option<&Filter>) -> Result<Vec<Deployment>> {
        self.store
            .scroll(&self.collection, limit, filter)
            .await?
            .into_iter()
            .map(|record| -> Result<Deployment> {
                Ok(Deployment {
                    id: record.id,
                    payload: DeploymentPayload::from_payload(record.payload)?,
                })
            })
            .collect()
    }
}

/// Build a partial payload from `(field, value)` pairs.
pub(crate) fn fields<const N: usize>(pairs: [(&str, serde_json::Value); N]) -> Payload {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
