use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{RespondError, Result};
use crate::geo;

/// Field map stored alongside a vector in the store.
pub type Payload = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// Enums
// =============================================================================

/// Channel an incident report or piece of evidence arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Social,
    Satellite,
    Call,
    Sensor,
    Report,
}

impl SourceType {
    pub const ALL: [SourceType; 5] = [
        SourceType::Social,
        SourceType::Satellite,
        SourceType::Call,
        SourceType::Sensor,
        SourceType::Report,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Social => "social",
            SourceType::Satellite => "satellite",
            SourceType::Call => "call",
            SourceType::Sensor => "sensor",
            SourceType::Report => "report",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceType {
    type Err = RespondError;
    fn from_str(s: &str) -> Result<Self> {
        SourceType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| unsupported("source_type", s, &SourceType::ALL.map(|t| t.as_str())))
    }
}

/// Operational urgency of an incident.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

/// Urgency ordinal scale used for event aggregation.
pub const URGENCY_ORDINALS: [(Urgency, u8); 4] = [
    (Urgency::Critical, 4),
    (Urgency::High, 3),
    (Urgency::Medium, 2),
    (Urgency::Low, 1),
];

impl Urgency {
    pub const ALL: [Urgency; 4] = [
        Urgency::Critical,
        Urgency::High,
        Urgency::Medium,
        Urgency::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Critical => "critical",
            Urgency::High => "high",
            Urgency::Medium => "medium",
            Urgency::Low => "low",
        }
    }

    pub fn ordinal(self) -> u8 {
        URGENCY_ORDINALS
            .iter()
            .find(|(u, _)| *u == self)
            .map(|(_, ord)| *ord)
            .unwrap_or(0)
    }

    /// The more urgent of `self` and `other`; `self` wins ties.
    pub fn max_ordinal(self, other: Urgency) -> Urgency {
        if other.ordinal() > self.ordinal() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Urgency {
    type Err = RespondError;
    fn from_str(s: &str) -> Result<Self> {
        Urgency::ALL
            .into_iter()
            .find(|u| u.as_str() == s)
            .ok_or_else(|| unsupported("urgency", s, &Urgency::ALL.map(|u| u.as_str())))
    }
}

/// Incident lifecycle state. Transitions are governed by the lifecycle table
/// in `respond-memory`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    #[default]
    Pending,
    Acknowledged,
    Resolved,
}

impl IncidentStatus {
    pub const ALL: [IncidentStatus; 3] = [
        IncidentStatus::Pending,
        IncidentStatus::Acknowledged,
        IncidentStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Pending => "pending",
            IncidentStatus::Acknowledged => "acknowledged",
            IncidentStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IncidentStatus {
    type Err = RespondError;
    fn from_str(s: &str) -> Result<Self> {
        IncidentStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| unsupported("status", s, &IncidentStatus::ALL.map(|st| st.as_str())))
    }
}

/// Disaster event state. Events are created active and not evolved further.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    #[default]
    Active,
}

/// Progress of a unit deployed against one or more incidents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    #[default]
    Assigned,
    EnRoute,
    OnSite,
    Completed,
    Cancelled,
}

impl DeploymentStatus {
    pub const ALL: [DeploymentStatus; 5] = [
        DeploymentStatus::Assigned,
        DeploymentStatus::EnRoute,
        DeploymentStatus::OnSite,
        DeploymentStatus::Completed,
        DeploymentStatus::Cancelled,
    ];

    /// Statuses of units still committed to an incident.
    pub const ACTIVE: [DeploymentStatus; 3] = [
        DeploymentStatus::Assigned,
        DeploymentStatus::EnRoute,
        DeploymentStatus::OnSite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Assigned => "assigned",
            DeploymentStatus::EnRoute => "en_route",
            DeploymentStatus::OnSite => "on_site",
            DeploymentStatus::Completed => "completed",
            DeploymentStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        DeploymentStatus::ACTIVE.contains(self)
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeploymentStatus {
    type Err = RespondError;
    fn from_str(s: &str) -> Result<Self> {
        DeploymentStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| unsupported("status", s, &DeploymentStatus::ALL.map(|st| st.as_str())))
    }
}

fn unsupported(field: &str, value: &str, allowed: &[&str]) -> RespondError {
    RespondError::Validation(format!(
        "{} must be one of [{}], got '{}'",
        field,
        allowed.join(", "),
        value
    ))
}

// =============================================================================
// Value objects
// =============================================================================

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Build a point, rejecting coordinates outside the valid ranges.
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !geo::is_valid_lat_lon(lat, lon) {
            return Err(RespondError::Validation(format!(
                "Invalid coordinates: lat={}, lon={}",
                lat, lon
            )));
        }
        Ok(Self { lat, lon })
    }
}

/// One piece of evidence submitted against an incident. Never modified after
/// it is appended to the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub source_type: SourceType,
    pub text: String,
    /// Similarity to the incident's original text at submission time.
    pub similarity: f64,
    pub timestamp: DateTime<Utc>,
    pub accepted: bool,
}

fn default_zone() -> String {
    "unknown".to_string()
}

fn default_confidence() -> f64 {
    0.5
}

/// Incident fields as persisted in the situation-reports collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentPayload {
    pub text: String,
    pub source_type: SourceType,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub status: IncidentStatus,
    #[serde(default = "default_zone")]
    pub zone_id: String,
    #[serde(default = "default_confidence")]
    pub confidence_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub timestamp_unix: Option<i64>,
    #[serde(default)]
    pub evidence_chain: Vec<Evidence>,
    #[serde(default)]
    pub reinforced_count: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl IncidentPayload {
    pub fn to_payload(&self) -> Result<Payload> {
        into_object(serde_json::to_value(self)?)
    }

    pub fn from_payload(payload: Payload) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(payload))?)
    }
}

/// An incident together with its store identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: Uuid,
    #[serde(flatten)]
    pub payload: IncidentPayload,
}

/// Disaster event fields as persisted in the events collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    pub title: String,
    #[serde(default = "default_zone")]
    pub zone_id: String,
    #[serde(default)]
    pub incident_ids: Vec<Uuid>,
    #[serde(default)]
    pub incident_count: usize,
    #[serde(default = "lowest_urgency")]
    pub urgency_max: Urgency,
    #[serde(default)]
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub timestamp_unix: i64,
}

fn lowest_urgency() -> Urgency {
    Urgency::Low
}

impl EventPayload {
    pub fn to_payload(&self) -> Result<Payload> {
        into_object(serde_json::to_value(self)?)
    }

    pub fn from_payload(payload: Payload) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(payload))?)
    }
}

/// A cluster of related incidents sharing one underlying situation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterEvent {
    pub id: Uuid,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// Input for creating a new incident. Unset optional fields take the
/// ingestion defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIncident {
    pub text: String,
    pub source_type: SourceType,
    #[serde(default)]
    pub urgency: Option<Urgency>,
    #[serde(default)]
    pub status: Option<IncidentStatus>,
    #[serde(default)]
    pub zone_id: Option<String>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewIncident {
    pub fn new(text: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            text: text.into(),
            source_type,
            urgency: None,
            status: None,
            zone_id: None,
            confidence_score: None,
            location: None,
            timestamp: None,
        }
    }

    pub fn with_zone(mut self, zone_id: impl Into<String>) -> Self {
        self.zone_id = Some(zone_id.into());
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = Some(urgency);
        self
    }

    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Unwrap a serialized record into a store payload.
pub fn into_object(value: serde_json::Value) -> Result<Payload> {
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(RespondError::Serialization(format!(
            "expected a JSON object payload, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> IncidentPayload {
        IncidentPayload {
            text: "Fire near school".to_string(),
            source_type: SourceType::Call,
            urgency: Urgency::Critical,
            status: IncidentStatus::Pending,
            zone_id: "zone-1".to_string(),
            confidence_score: 0.5,
            location: Some(GeoPoint { lat: 12.9, lon: 77.6 }),
            timestamp: Some(Utc::now()),
            timestamp_unix: Some(Utc::now().timestamp()),
            evidence_chain: vec![],
            reinforced_count: 0,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_enum_serde_snake_case() {
        assert_eq!(serde_json::to_string(&SourceType::Satellite).unwrap(), "\"satellite\"");
        assert_eq!(serde_json::to_string(&Urgency::Critical).unwrap(), "\"critical\"");
        assert_eq!(
            serde_json::to_string(&IncidentStatus::Acknowledged).unwrap(),
            "\"acknowledged\""
        );
        assert_eq!(serde_json::to_string(&EventStatus::Active).unwrap(), "\"active\"");
    }

    #[test]
    fn test_enum_from_str() {
        assert_eq!("sensor".parse::<SourceType>().unwrap(), SourceType::Sensor);
        assert_eq!("low".parse::<Urgency>().unwrap(), Urgency::Low);
        assert_eq!(
            "resolved".parse::<IncidentStatus>().unwrap(),
            IncidentStatus::Resolved
        );
    }

    #[test]
    fn test_enum_from_str_rejects_unsupported() {
        let err = "carrier-pigeon".parse::<SourceType>().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("carrier-pigeon"));
        assert!("urgent".parse::<Urgency>().is_err());
        assert!("closed".parse::<IncidentStatus>().is_err());
    }

    #[test]
    fn test_deployment_status_strings_and_activity() {
        assert_eq!(
            serde_json::to_string(&DeploymentStatus::EnRoute).unwrap(),
            "\"en_route\""
        );
        assert_eq!(
            "on_site".parse::<DeploymentStatus>().unwrap(),
            DeploymentStatus::OnSite
        );
        assert!("dispatched".parse::<DeploymentStatus>().unwrap_err().is_validation());
        let active: Vec<_> = DeploymentStatus::ALL
            .into_iter()
            .filter(DeploymentStatus::is_active)
            .collect();
        assert_eq!(active, DeploymentStatus::ACTIVE);
    }

    #[test]
    fn test_urgency_ordinals() {
        assert_eq!(Urgency::Critical.ordinal(), 4);
        assert_eq!(Urgency::High.ordinal(), 3);
        assert_eq!(Urgency::Medium.ordinal(), 2);
        assert_eq!(Urgency::Low.ordinal(), 1);
    }

    #[test]
    fn test_urgency_max_ordinal() {
        assert_eq!(Urgency::Low.max_ordinal(Urgency::High), Urgency::High);
        assert_eq!(Urgency::Critical.max_ordinal(Urgency::Medium), Urgency::Critical);
        assert_eq!(Urgency::Medium.max_ordinal(Urgency::Medium), Urgency::Medium);
    }

    #[test]
    fn test_geo_point_validation() {
        assert!(GeoPoint::new(90.0, -180.0).is_ok());
        assert!(GeoPoint::new(90.1, 0.0).is_err());
        assert!(GeoPoint::new(0.0, 180.5).is_err());
    }

    #[test]
    fn test_incident_payload_roundtrip_through_map() {
        let payload = sample_payload();
        let map = payload.to_payload().unwrap();
        assert_eq!(map["zone_id"], "zone-1");
        assert_eq!(map["urgency"], "critical");
        let restored = IncidentPayload::from_payload(map).unwrap();
        assert_eq!(restored, payload);
    }

    #[test]
    fn test_incident_payload_defaults_for_missing_fields() {
        let map = serde_json::json!({"text": "Flooding", "source_type": "social"});
        let payload = IncidentPayload::from_payload(map.as_object().unwrap().clone()).unwrap();
        assert_eq!(payload.urgency, Urgency::Medium);
        assert_eq!(payload.status, IncidentStatus::Pending);
        assert_eq!(payload.zone_id, "unknown");
        assert!((payload.confidence_score - 0.5).abs() < f64::EPSILON);
        assert!(payload.evidence_chain.is_empty());
        assert!(payload.timestamp_unix.is_none());
    }

    #[test]
    fn test_location_omitted_when_absent() {
        let mut payload = sample_payload();
        payload.location = None;
        let map = payload.to_payload().unwrap();
        assert!(!map.contains_key("location"));
    }

    #[test]
    fn test_incident_flattens_payload() {
        let incident = Incident {
            id: Uuid::new_v4(),
            payload: sample_payload(),
        };
        let value = serde_json::to_value(&incident).unwrap();
        assert!(value.get("id").is_some());
        assert_eq!(value["text"], "Fire near school");
    }

    #[test]
    fn test_new_incident_builder() {
        let input = NewIncident::new("Bridge collapse", SourceType::Report)
            .with_zone("zone-2")
            .with_urgency(Urgency::High);
        assert_eq!(input.zone_id.as_deref(), Some("zone-2"));
        assert_eq!(input.urgency, Some(Urgency::High));
        assert!(input.status.is_none());
    }
}
