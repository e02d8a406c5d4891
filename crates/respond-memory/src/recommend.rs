//! Keyword-driven action recommendations over search results.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use respond_core::error::{RespondError, Result};
use respond_core::types::{IncidentStatus, Urgency};

use crate::search::{HybridSearchEngine, SearchFilters, SearchResult};

/// Operational response an incident calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    DispatchFireBrigade,
    IssueEvacuationAlert,
    PrioritizeHeavyEquipment,
    DispatchSearchAndRescue,
}

impl ActionType {
    pub const ALL: [ActionType; 4] = [
        ActionType::DispatchFireBrigade,
        ActionType::IssueEvacuationAlert,
        ActionType::PrioritizeHeavyEquipment,
        ActionType::DispatchSearchAndRescue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::DispatchFireBrigade => "DISPATCH_FIRE_BRIGADE",
            ActionType::IssueEvacuationAlert => "ISSUE_EVACUATION_ALERT",
            ActionType::PrioritizeHeavyEquipment => "PRIORITIZE_HEAVY_EQUIPMENT",
            ActionType::DispatchSearchAndRescue => "DISPATCH_SEARCH_AND_RESCUE",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionType {
    type Err = RespondError;
    fn from_str(s: &str) -> Result<Self> {
        ActionType::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| {
                RespondError::Validation(format!(
                    "action_type must be one of [{}], got '{}'",
                    ActionType::ALL.map(|a| a.as_str()).join(", "),
                    s
                ))
            })
    }
}

/// Highest priority an action can reach.
pub const MAX_PRIORITY: u8 = 5;

/// `(keyword, action, base priority)`, matched against lowercased incident
/// text in this order.
pub const ACTION_RULES: [(&str, ActionType, u8); 8] = [
    ("fire", ActionType::DispatchFireBrigade, 4),
    ("smoke", ActionType::DispatchFireBrigade, 4),
    ("flood", ActionType::IssueEvacuationAlert, 4),
    ("water", ActionType::IssueEvacuationAlert, 3),
    ("collapse", ActionType::PrioritizeHeavyEquipment, 4),
    ("trapped", ActionType::DispatchSearchAndRescue, 5),
    ("earthquake", ActionType::DispatchSearchAndRescue, 5),
    ("explosion", ActionType::DispatchFireBrigade, 5),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub action_type: ActionType,
    pub priority: u8,
    pub reason: String,
    pub incident_ids: Vec<Uuid>,
}

/// An incident the recommendation was based on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceUsed {
    pub id: Uuid,
    pub text: String,
    pub urgency: Urgency,
    pub status: IncidentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub query: String,
    /// Highest priority first.
    pub actions: Vec<Action>,
    pub evidence_used: Vec<EvidenceUsed>,
}

/// Turns search results into a prioritized action list.
#[derive(Clone)]
pub struct ActionRecommender {
    search: HybridSearchEngine,
}

impl ActionRecommender {
    pub fn new(search: HybridSearchEngine) -> Self {
        Self { search }
    }

    pub async fn recommend(&self, query: &str, limit: usize, zone_id: Option<&str>) -> Result<Recommendation> {
        let filters = SearchFilters {
            zone_id: zone_id.map(str::to_string),
            ..Default::default()
        };
        let results = self.search.search(query, limit, &filters).await?;
        let recommendation = recommend_from_results(query, &results);

        info!(
            query = %query,
            incidents = results.len(),
            actions = recommendation.actions.len(),
            "Generated action recommendations"
        );
        Ok(recommendation)
    }
}

/// Build recommendations from already-ranked results.
///
/// Each keyword hit yields its rule's action, raised by one for critical
/// urgency and by one for multi-source confirmation, capped at
/// [`MAX_PRIORITY`]. Actions of the same type merge: the higher priority
/// and its reason win, and incident ids accumulate.
pub fn recommend_from_results(query: &str, results: &[SearchResult]) -> Recommendation {
    let mut actions: Vec<Action> = Vec::new();
    let mut evidence_used = Vec::with_capacity(results.len());

    for result in results {
        let payload = &result.payload;
        let text = payload.text.to_lowercase();
        let critical = payload.urgency == Urgency::Critical;
        let pending = payload.status == IncidentStatus::Pending;
        let confirmed = result.evidence.is_multi_source_confirmed;

        evidence_used.push(EvidenceUsed {
            id: result.id,
            text: payload.text.clone(),
            urgency: payload.urgency,
            status: payload.status,
        });

        for (keyword, action_type, base_priority) in ACTION_RULES {
            if !text.contains(keyword) {
                continue;
            }
            let priority = (base_priority + u8::from(critical) + u8::from(confirmed)).min(MAX_PRIORITY);

            let mut reason = format!("Detected '{}' in incident report", keyword);
            if critical {
                reason.push_str("; urgency is critical");
            }
            if confirmed {
                reason.push_str("; multi-source confirmed");
            }
            if pending {
                reason.push_str("; awaiting response");
            }

            match actions.iter_mut().find(|a| a.action_type == action_type) {
                Some(existing) => {
                    if priority > existing.priority {
                        existing.priority = priority;
                        existing.reason = reason;
                    }
                    if !existing.incident_ids.contains(&result.id) {
                        existing.incident_ids.push(result.id);
                    }
                }
                None => actions.push(Action {
                    action_type,
                    priority,
                    reason,
                    incident_ids: vec![result.id],
                }),
            }
        }

        if critical && pending {
            match actions
                .iter_mut()
                .find(|a| a.action_type == ActionType::DispatchSearchAndRescue)
            {
                Some(existing) => {
                    if !existing.incident_ids.contains(&result.id) {
                        existing.incident_ids.push(result.id);
                    }
                }
                None => actions.push(Action {
                    action_type: ActionType::DispatchSearchAndRescue,
                    priority: if confirmed { 5 } else { 4 },
                    reason: format!("Critical pending incident in {}", payload.zone_id),
                    incident_ids: vec![result.id],
                }),
            }
        }
    }

    // Stable: equal priorities keep first-seen order.
    actions.sort_by(|a, b| b.priority.cmp(&a.priority));

    Recommendation {
        query: query.to_string(),
        actions,
        evidence_used,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::EvidenceSummary;
    use chrono::Utc;
    use respond_core::types::{Evidence, IncidentPayload, SourceType};

    fn result(text: &str, urgency: Urgency, status: IncidentStatus, confirmed: bool) -> SearchResult {
        let mut payload = IncidentPayload::from_payload(
            serde_json::json!({"text": text, "source_type": "call", "zone_id": "zone-7"})
                .as_object()
                .unwrap()
                .clone(),
        )
        .unwrap();
        payload.urgency = urgency;
        payload.status = status;
        if confirmed {
            payload.evidence_chain.push(Evidence {
                source_type: SourceType::Social,
                text: "seen it too".to_string(),
                similarity: 0.9,
                timestamp: Utc::now(),
                accepted: true,
            });
        }
        SearchResult {
            id: Uuid::new_v4(),
            score: 0.9,
            decay_factor: 1.0,
            final_score: 0.9,
            age_seconds: 0,
            evidence: EvidenceSummary::from_incident(&payload),
            payload,
        }
    }

    #[test]
    fn test_keyword_maps_to_action() {
        let results = [result("Flood in the basement", Urgency::Medium, IncidentStatus::Acknowledged, false)];
        let rec = recommend_from_results("flood", &results);
        assert_eq!(rec.actions.len(), 1);
        assert_eq!(rec.actions[0].action_type, ActionType::IssueEvacuationAlert);
        assert_eq!(rec.actions[0].priority, 4);
        assert_eq!(rec.evidence_used.len(), 1);
    }

    #[test]
    fn test_priority_boosts_are_capped() {
        let results = [result("Smoke everywhere", Urgency::Critical, IncidentStatus::Acknowledged, true)];
        let rec = recommend_from_results("smoke", &results);
        assert_eq!(rec.actions[0].priority, MAX_PRIORITY);
        assert!(rec.actions[0].reason.contains("urgency is critical"));
        assert!(rec.actions[0].reason.contains("multi-source confirmed"));
    }

    #[test]
    fn test_same_action_merges_incidents() {
        let results = [
            result("Fire at the depot", Urgency::Low, IncidentStatus::Resolved, false),
            result("Smoke from the depot", Urgency::Low, IncidentStatus::Resolved, false),
        ];
        let rec = recommend_from_results("depot", &results);
        assert_eq!(rec.actions.len(), 1);
        assert_eq!(rec.actions[0].incident_ids.len(), 2);
    }

    #[test]
    fn test_critical_pending_adds_search_and_rescue() {
        let results = [result("Water main burst", Urgency::Critical, IncidentStatus::Pending, false)];
        let rec = recommend_from_results("water", &results);
        let types: Vec<ActionType> = rec.actions.iter().map(|a| a.action_type).collect();
        assert_eq!(
            types,
            vec![ActionType::IssueEvacuationAlert, ActionType::DispatchSearchAndRescue]
        );
        assert_eq!(rec.actions[1].reason, "Critical pending incident in zone-7");
    }

    #[test]
    fn test_actions_sorted_by_priority() {
        let results = [
            result("Water on the road", Urgency::Low, IncidentStatus::Resolved, false),
            result("People trapped under rubble", Urgency::Low, IncidentStatus::Resolved, false),
        ];
        let rec = recommend_from_results("help", &results);
        assert_eq!(rec.actions[0].action_type, ActionType::DispatchSearchAndRescue);
        assert_eq!(rec.actions[0].priority, 5);
        assert_eq!(rec.actions[1].priority, 3);
    }

    #[test]
    fn test_action_type_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&ActionType::DispatchSearchAndRescue).unwrap(),
            "\"DISPATCH_SEARCH_AND_RESCUE\""
        );
    }

    #[test]
    fn test_action_type_parses_its_wire_name() {
        for action in ActionType::ALL {
            let wire = serde_json::to_string(&action).unwrap();
            assert_eq!(wire.trim_matches('"'), action.as_str());
            assert_eq!(action.as_str().parse::<ActionType>().unwrap(), action);
        }
        assert!("SEND_DRONES".parse::<ActionType>().unwrap_err().is_validation());
    }
}
