//! Evidence summaries attached to search results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use respond_core::types::{Evidence, GeoPoint, IncidentPayload, IncidentStatus, SourceType, Urgency};

/// What is known about an incident and how well it is corroborated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSummary {
    pub primary_text: String,
    pub primary_source: SourceType,
    pub timestamp: Option<DateTime<Utc>>,
    pub location: Option<GeoPoint>,
    pub confidence_score: f64,
    pub status: IncidentStatus,
    pub urgency: Urgency,
    pub zone_id: String,
    /// Chain length, rejected entries included.
    pub evidence_count: usize,
    pub accepted_evidence_count: usize,
    /// At least one accepted corroborating report.
    pub is_multi_source_confirmed: bool,
    pub evidence_chain: Vec<Evidence>,
}

impl EvidenceSummary {
    pub fn from_incident(incident: &IncidentPayload) -> Self {
        let accepted_evidence_count = incident
            .evidence_chain
            .iter()
            .filter(|e| e.accepted)
            .count();

        Self {
            primary_text: incident.text.clone(),
            primary_source: incident.source_type,
            timestamp: incident.timestamp,
            location: incident.location,
            confidence_score: incident.confidence_score,
            status: incident.status,
            urgency: incident.urgency,
            zone_id: incident.zone_id.clone(),
            evidence_count: incident.evidence_chain.len(),
            accepted_evidence_count,
            is_multi_source_confirmed: accepted_evidence_count >= 1,
            evidence_chain: incident.evidence_chain.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(accepted: bool) -> Evidence {
        Evidence {
            source_type: SourceType::Social,
            text: "Smoke seen".to_string(),
            similarity: if accepted { 0.82 } else { 0.31 },
            timestamp: Utc::now(),
            accepted,
        }
    }

    fn incident(chain: Vec<Evidence>) -> IncidentPayload {
        IncidentPayload::from_payload(
            serde_json::json!({
                "text": "Fire near school",
                "source_type": "call",
                "urgency": "critical",
                "zone_id": "zone-1",
            })
            .as_object()
            .unwrap()
            .clone(),
        )
        .map(|mut p| {
            p.evidence_chain = chain;
            p
        })
        .unwrap()
    }

    #[test]
    fn test_summary_without_evidence() {
        let summary = EvidenceSummary::from_incident(&incident(vec![]));
        assert_eq!(summary.primary_text, "Fire near school");
        assert_eq!(summary.primary_source, SourceType::Call);
        assert_eq!(summary.urgency, Urgency::Critical);
        assert_eq!(summary.status, IncidentStatus::Pending);
        assert_eq!(summary.evidence_count, 0);
        assert!(!summary.is_multi_source_confirmed);
    }

    #[test]
    fn test_rejected_evidence_counts_but_does_not_confirm() {
        let summary = EvidenceSummary::from_incident(&incident(vec![evidence(false)]));
        assert_eq!(summary.evidence_count, 1);
        assert_eq!(summary.accepted_evidence_count, 0);
        assert!(!summary.is_multi_source_confirmed);
    }

    #[test]
    fn test_accepted_evidence_confirms() {
        let chain = vec![evidence(false), evidence(true)];
        let summary = EvidenceSummary::from_incident(&incident(chain.clone()));
        assert_eq!(summary.evidence_count, 2);
        assert_eq!(summary.accepted_evidence_count, 1);
        assert!(summary.is_multi_source_confirmed);
        assert_eq!(summary.evidence_chain, chain);
    }
}
