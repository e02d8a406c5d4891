//! Incident status lifecycle with validated transitions.
//!
//! pending -> acknowledged -> resolved. Re-resolving a resolved incident is
//! accepted and changes nothing.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use respond_core::error::{RespondError, Result};
use respond_core::types::IncidentStatus;

use crate::repository::{fields, IncidentRepository};

/// Allowed targets for each status.
pub const TRANSITIONS: [(IncidentStatus, &[IncidentStatus]); 3] = [
    (IncidentStatus::Pending, &[IncidentStatus::Acknowledged]),
    (IncidentStatus::Acknowledged, &[IncidentStatus::Resolved]),
    (IncidentStatus::Resolved, &[IncidentStatus::Resolved]),
];

pub fn allowed_targets(from: IncidentStatus) -> &'static [IncidentStatus] {
    TRANSITIONS
        .iter()
        .find(|(status, _)| *status == from)
        .map(|(_, targets)| *targets)
        .unwrap_or(&[])
}

/// Validate that a status transition is allowed.
pub fn validate_transition(from: IncidentStatus, to: IncidentStatus) -> Result<()> {
    let allowed = allowed_targets(from);
    if allowed.contains(&to) {
        Ok(())
    } else {
        Err(RespondError::InvalidTransition {
            from,
            to,
            allowed: allowed.to_vec(),
        })
    }
}

/// Result of a status update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub incident_id: Uuid,
    pub old_status: IncidentStatus,
    pub new_status: IncidentStatus,
    /// False for the resolved -> resolved no-op.
    pub changed: bool,
}

/// Applies validated status changes to stored incidents.
#[derive(Clone)]
pub struct StatusLifecycle {
    incidents: IncidentRepository,
}

impl StatusLifecycle {
    pub fn new(incidents: IncidentRepository) -> Self {
        Self { incidents }
    }

    /// Move an incident to `new_status`, writing `status` and `updated_at`
    /// together. Rejected transitions leave the incident untouched.
    pub async fn transition(&self, incident_id: Uuid, new_status: IncidentStatus) -> Result<StatusChange> {
        let incident = self.incidents.get(incident_id).await?;
        let old_status = incident.payload.status;

        if let Err(e) = validate_transition(old_status, new_status) {
            warn!(
                incident_id = %incident_id,
                from = %old_status,
                to = %new_status,
                "Rejected status transition"
            );
            return Err(e);
        }

        if old_status == new_status {
            return Ok(StatusChange {
                incident_id,
                old_status,
                new_status,
                changed: false,
            });
        }

        self.incidents
            .update(
                incident_id,
                fields([
                    ("status", json!(new_status)),
                    ("updated_at", json!(Utc::now())),
                ]),
            )
            .await?;

        info!(
            incident_id = %incident_id,
            from = %old_status,
            to = %new_status,
            "Incident status updated"
        );

        Ok(StatusChange {
            incident_id,
            old_status,
            new_status,
            changed: true,
        })
    }
}
