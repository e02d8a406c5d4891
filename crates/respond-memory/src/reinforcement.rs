//! Confidence reinforcement from corroborating reports.
//!
//! A new report is compared with the incident's original text. Reports that
//! are similar enough raise the incident's confidence; every report, accepted
//! or not, is appended to the evidence chain.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use respond_core::config::MemoryConfig;
use respond_core::error::{RespondError, Result};
use respond_core::types::{Evidence, SourceType};
use respond_vector::embedding::DynEmbeddingService;
use respond_vector::similarity::cosine_similarity;

use crate::repository::{fields, IncidentRepository};

/// Round to 4 decimal places, the precision stored in the evidence chain.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Confidence update for one piece of evidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reinforcement {
    pub accepted: bool,
    pub new_confidence: f64,
    pub reinforced_count: u32,
}

/// Decide acceptance and compute the new confidence.
///
/// Accepted evidence boosts confidence by `min(max_boost, similarity *
/// boost_factor)`, capped at 1.0. Rejected evidence changes nothing.
pub fn apply_reinforcement(
    confidence: f64,
    reinforced_count: u32,
    similarity: f64,
    policy: &MemoryConfig,
) -> Reinforcement {
    if similarity < policy.accept_threshold {
        return Reinforcement {
            accepted: false,
            new_confidence: confidence,
            reinforced_count,
        };
    }

    let boost = (similarity * policy.boost_factor).min(policy.max_boost);
    Reinforcement {
        accepted: true,
        new_confidence: (confidence + boost).min(1.0),
        reinforced_count: reinforced_count + 1,
    }
}

/// Result of reinforcing an incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReinforceOutcome {
    pub incident_id: Uuid,
    pub old_confidence: f64,
    pub new_confidence: f64,
    pub similarity: f64,
    pub accepted: bool,
    pub reinforced_count: u32,
}

/// Applies new evidence to stored incidents.
///
/// Reads the incident, then writes it back. Two reinforcements of the same
/// incident running at once both read the old chain and the later write
/// wins, dropping the other's evidence entry.
#[derive(Clone)]
pub struct ReinforcementEngine {
    incidents: IncidentRepository,
    embedder: Arc<dyn DynEmbeddingService>,
    policy: MemoryConfig,
}

impl ReinforcementEngine {
    pub fn new(
        incidents: IncidentRepository,
        embedder: Arc<dyn DynEmbeddingService>,
        policy: MemoryConfig,
    ) -> Self {
        Self {
            incidents,
            embedder,
            policy,
        }
    }

    /// Compare `text` with the incident's original report and record it as
    /// evidence. Not idempotent: retrying appends a second entry.
    pub async fn reinforce(
        &self,
        incident_id: Uuid,
        source_type: SourceType,
        text: &str,
    ) -> Result<ReinforceOutcome> {
        let incident = self.incidents.get(incident_id).await?;

        if text.trim().is_empty() {
            warn!(incident_id = %incident_id, "Rejected blank evidence text");
            return Err(RespondError::Validation(
                "Evidence text cannot be empty".to_string(),
            ));
        }

        let original = self.embedder.embed_boxed(&incident.payload.text).await?;
        let candidate = self.embedder.embed_boxed(text).await?;
        let similarity = cosine_similarity(&original, &candidate)?;

        let old_confidence = incident.payload.confidence_score;
        let update = apply_reinforcement(
            old_confidence,
            incident.payload.reinforced_count,
            similarity,
            &self.policy,
        );

        let now = Utc::now();
        let mut chain = incident.payload.evidence_chain;
        chain.push(Evidence {
            source_type,
            text: text.to_string(),
            similarity: round4(similarity),
            timestamp: now,
            accepted: update.accepted,
        });

        self.incidents
            .update(
                incident_id,
                fields([
                    ("confidence_score", json!(update.new_confidence)),
                    ("evidence_chain", serde_json::to_value(&chain)?),
                    ("reinforced_count", json!(update.reinforced_count)),
                    ("updated_at", json!(now)),
                ]),
            )
            .await?;

        info!(
            incident_id = %incident_id,
            source = %source_type,
            similarity = round4(similarity),
            accepted = update.accepted,
            old_confidence,
            new_confidence = update.new_confidence,
            evidence_count = chain.len(),
            "Incident reinforced"
        );

        Ok(ReinforceOutcome {
            incident_id,
            old_confidence,
            new_confidence: update.new_confidence,
            similarity: round4(similarity),
            accepted: update.accepted,
            reinforced_count: update.reinforced_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> MemoryConfig {
        MemoryConfig::default()
    }

    #[test]
    fn test_accepted_similarity_boosts_confidence() {
        let r = apply_reinforcement(0.5, 0, 0.9, &policy());
        assert!(r.accepted);
        assert!((r.new_confidence - 0.59).abs() < 1e-12);
        assert_eq!(r.reinforced_count, 1);
    }

    #[test]
    fn test_rejected_similarity_leaves_confidence() {
        let r = apply_reinforcement(0.5, 2, 0.3, &policy());
        assert!(!r.accepted);
        assert_eq!(r.new_confidence, 0.5);
        assert_eq!(r.reinforced_count, 2);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let r = apply_reinforcement(0.5, 0, 0.50, &policy());
        assert!(r.accepted);
        assert!((r.new_confidence - 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_boost_is_capped() {
        let loose = MemoryConfig {
            boost_factor: 0.5,
            ..policy()
        };
        let r = apply_reinforcement(0.5, 0, 1.0, &loose);
        assert!((r.new_confidence - 0.65).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_never_exceeds_one() {
        let r = apply_reinforcement(0.97, 5, 1.0, &policy());
        assert_eq!(r.new_confidence, 1.0);
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(0.82), 0.82);
    }
}
