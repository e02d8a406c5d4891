//! Resource deployments: which unit was sent against which incidents, and
//! how far along it is.
//!
//! A deployment records a recommended action being carried out. Any of the
//! five statuses may be set at any time; units in assigned, en_route or
//! on_site count as active.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use respond_core::error::{RespondError, Result};
use respond_core::types::{into_object, DeploymentStatus, Payload};
use respond_vector::embedding::DynEmbeddingService;
use respond_vector::filter::{Condition, Filter};

use crate::recommend::ActionType;
use crate::repository::{fields, DeploymentRepository};

/// Most deployments returned by one active listing.
pub const ACTIVE_LIST_LIMIT: usize = 50;

/// Deployment fields as persisted in the deployments collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentPayload {
    pub action_type: ActionType,
    pub incident_ids: Vec<Uuid>,
    pub incident_count: usize,
    pub assigned_unit: String,
    #[serde(default)]
    pub status: DeploymentStatus,
    #[serde(default)]
    pub zone_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub timestamp_unix: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeploymentPayload {
    pub fn to_payload(&self) -> Result<Payload> {
        into_object(serde_json::to_value(self)?)
    }

    pub fn from_payload(payload: Payload) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(payload))?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: Uuid,
    #[serde(flatten)]
    pub payload: DeploymentPayload,
}

/// Input for dispatching a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDeployment {
    pub action_type: ActionType,
    pub incident_ids: Vec<Uuid>,
    pub assigned_unit: String,
    #[serde(default)]
    pub status: Option<DeploymentStatus>,
    #[serde(default)]
    pub zone_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewDeployment {
    pub fn new(action_type: ActionType, incident_ids: Vec<Uuid>, assigned_unit: impl Into<String>) -> Self {
        Self {
            action_type,
            incident_ids,
            assigned_unit: assigned_unit.into(),
            status: None,
            zone_id: None,
            notes: None,
        }
    }

    pub fn with_zone(mut self, zone_id: impl Into<String>) -> Self {
        self.zone_id = Some(zone_id.into());
        self
    }

    pub fn with_status(mut self, status: DeploymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Check a dispatch request before anything is embedded or stored.
pub fn validate_new_deployment(new: &NewDeployment) -> Result<()> {
    if new.incident_ids.is_empty() {
        return Err(RespondError::Validation(
            "At least one incident_id is required".to_string(),
        ));
    }
    if new.assigned_unit.trim().is_empty() {
        return Err(RespondError::Validation(
            "assigned_unit is required".to_string(),
        ));
    }
    Ok(())
}

/// Result of a deployment status update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentUpdate {
    pub deployment_id: Uuid,
    pub old_status: DeploymentStatus,
    pub new_status: DeploymentStatus,
}

/// Tracks deployed units in the deployments collection.
#[derive(Clone)]
pub struct DeploymentTracker {
    deployments: DeploymentRepository,
    embedder: Arc<dyn DynEmbeddingService>,
}

impl DeploymentTracker {
    pub fn new(deployments: DeploymentRepository, embedder: Arc<dyn DynEmbeddingService>) -> Self {
        Self {
            deployments,
            embedder,
        }
    }

    /// Record a unit dispatched against one or more incidents.
    ///
    /// The vector embeds "<action> <unit>", so deployments can later be
    /// searched by what was sent.
    pub async fn create(&self, new: NewDeployment) -> Result<Deployment> {
        if let Err(e) = validate_new_deployment(&new) {
            warn!(action = %new.action_type, error = %e, "Rejected deployment");
            return Err(e);
        }

        let now = Utc::now();
        let mut incident_ids: Vec<Uuid> = Vec::with_capacity(new.incident_ids.len());
        for id in new.incident_ids {
            if !incident_ids.contains(&id) {
                incident_ids.push(id);
            }
        }
        let payload = DeploymentPayload {
            action_type: new.action_type,
            incident_count: incident_ids.len(),
            incident_ids,
            assigned_unit: new.assigned_unit.trim().to_string(),
            status: new.status.unwrap_or_default(),
            zone_id: new.zone_id,
            notes: new.notes,
            timestamp_unix: now.timestamp(),
            created_at: now,
            updated_at: now,
        };

        let embed_text = format!("{} {}", payload.action_type, payload.assigned_unit);
        let vector = self.embedder.embed_boxed(&embed_text).await?;
        let id = Uuid::new_v4();
        self.deployments.insert(id, vector, &payload).await?;

        info!(
            deployment_id = %id,
            action = %payload.action_type,
            unit = %payload.assigned_unit,
            incidents = payload.incident_count,
            "Created deployment"
        );
        Ok(Deployment { id, payload })
    }

    /// Set a deployment's status, and its notes when given, in one write.
    pub async fn update_status(
        &self,
        deployment_id: Uuid,
        new_status: DeploymentStatus,
        notes: Option<String>,
    ) -> Result<DeploymentUpdate> {
        let deployment = self.deployments.get(deployment_id).await?;
        let old_status = deployment.payload.status;

        let mut update = fields([
            ("status", json!(new_status)),
            ("updated_at", json!(Utc::now())),
        ]);
        if let Some(notes) = notes.filter(|n| !n.trim().is_empty()) {
            update.insert("notes".to_string(), json!(notes));
        }
        self.deployments.update(deployment_id, update).await?;

        info!(
            deployment_id = %deployment_id,
            from = %old_status,
            to = %new_status,
            "Deployment status updated"
        );
        Ok(DeploymentUpdate {
            deployment_id,
            old_status,
            new_status,
        })
    }

    pub async fn get(&self, deployment_id: Uuid) -> Result<Deployment> {
        self.deployments.get(deployment_id).await
    }

    /// Active deployments, oldest first, optionally limited to one zone.
    pub async fn list_active(&self, zone_id: Option<&str>) -> Result<Vec<Deployment>> {
        let filter = Filter::combine([
            Some(Condition::MatchAny {
                key: "status".to_string(),
                any: DeploymentStatus::ACTIVE.iter().map(|s| json!(s)).collect(),
            }),
            zone_id.map(|zone| Condition::Match {
                key: "zone_id".to_string(),
                value: json!(zone),
            }),
        ]);
        self.deployments.list(ACTIVE_LIST_LIMIT, filter.as_ref()).await
    }
}
