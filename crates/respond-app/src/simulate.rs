//! Random disaster report generator for demos and load testing.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use respond_core::types::{GeoPoint, IncidentStatus, NewIncident, SourceType, Urgency};

/// Report templates per disaster kind.
const TEMPLATES: [(&str, [&str; 5]); 5] = [
    (
        "fire",
        [
            "Fire spotted near residential block, heavy smoke visible",
            "Major fire outbreak in commercial area, flames spreading",
            "Fire reported in warehouse district, smoke visible from distance",
            "Building fire in downtown area, evacuation underway",
            "Fire alarm triggered in apartment complex, smoke detected",
        ],
    ),
    (
        "flood",
        [
            "Flash flood warning, water rising rapidly in metro area",
            "Flooding reported in low-lying areas, roads submerged",
            "River overflow causing flooding in residential zones",
            "Heavy rainfall causing urban flooding, drainage overwhelmed",
            "Emergency flood alert, water entering basement levels",
        ],
    ),
    (
        "building_collapse",
        [
            "Building collapse near school, people trapped",
            "Partial building collapse in old town area, rescue needed",
            "Construction site collapse, workers trapped under debris",
            "Multi-story building collapse reported, emergency response needed",
            "Wall collapse in residential area, people feared trapped",
        ],
    ),
    (
        "bridge_collapse",
        [
            "Bridge collapsed near hospital zone, vehicles stuck",
            "Pedestrian bridge collapse, multiple injuries reported",
            "Old bridge structure collapsed, traffic disrupted",
            "Bridge deck collapse near river crossing, rescue underway",
            "Railway bridge collapse reported, trains halted",
        ],
    ),
    (
        "earthquake_aftershock",
        [
            "Aftershock felt in downtown area, buildings shaking",
            "Earthquake aftershock reported, minor damage to structures",
            "Tremors felt across multiple zones, panic among residents",
            "Seismic activity detected, aftershock warning issued",
            "Ground shaking reported, possible aftershock event",
        ],
    ),
];

const SOURCES: [SourceType; 4] = [
    SourceType::Social,
    SourceType::Sensor,
    SourceType::Call,
    SourceType::Report,
];

/// Urgency with selection weights.
const URGENCY_WEIGHTS: [(Urgency, f64); 4] = [
    (Urgency::Critical, 0.40),
    (Urgency::High, 0.30),
    (Urgency::Medium, 0.20),
    (Urgency::Low, 0.10),
];

const ZONES: [&str; 4] = ["zone-1", "zone-2", "zone-3", "zone-4"];

/// Bounding box of generated coordinates (Delhi region).
const LAT_RANGE: (f64, f64) = (28.55, 28.75);
const LON_RANGE: (f64, f64) = (77.05, 77.35);

/// One generated report and its disaster kind.
pub struct SimulatedReport {
    pub kind: &'static str,
    pub incident: NewIncident,
}

/// Generate a random report.
pub fn generate_report<R: Rng + ?Sized>(rng: &mut R) -> SimulatedReport {
    let (kind, texts) = TEMPLATES[rng.random_range(0..TEMPLATES.len())];
    let text = texts[rng.random_range(0..texts.len())];

    let urgency = URGENCY_WEIGHTS
        .choose_weighted(rng, |(_, weight)| *weight)
        .map(|(urgency, _)| *urgency)
        .unwrap_or_default();
    let source = SOURCES.choose(rng).copied().unwrap_or(SourceType::Report);
    let zone = ZONES.choose(rng).copied().unwrap_or("zone-1");

    let round4 = |v: f64| (v * 10_000.0).round() / 10_000.0;
    let location = GeoPoint {
        lat: round4(rng.random_range(LAT_RANGE.0..LAT_RANGE.1)),
        lon: round4(rng.random_range(LON_RANGE.0..LON_RANGE.1)),
    };

    let mut incident = NewIncident::new(text, source)
        .with_urgency(urgency)
        .with_zone(zone)
        .with_location(location);
    incident.status = Some(IncidentStatus::Pending);

    SimulatedReport { kind, incident }
}

/// Per-report line printed by the simulate command.
#[derive(Debug, Serialize)]
pub struct SimulationLine {
    pub seq: usize,
    pub kind: &'static str,
    pub urgency: Urgency,
    pub zone_id: String,
    pub incident_id: Uuid,
    pub deduplicated: bool,
    pub event_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use respond_core::geo::is_valid_lat_lon;

    #[test]
    fn test_generated_reports_are_valid() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let report = generate_report(&mut rng);
            let incident = report.incident;
            assert!(!incident.text.trim().is_empty());
            assert!(ZONES.contains(&incident.zone_id.as_deref().unwrap()));
            let location = incident.location.unwrap();
            assert!(is_valid_lat_lon(location.lat, location.lon));
            assert!((LAT_RANGE.0..=LAT_RANGE.1).contains(&location.lat));
            assert!(TEMPLATES.iter().any(|(kind, _)| *kind == report.kind));
        }
    }

    #[test]
    fn test_all_urgencies_appear() {
        let mut rng = rand::rng();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..2_000 {
            seen.insert(generate_report(&mut rng).incident.urgency.unwrap());
        }
        assert_eq!(seen.len(), 4);
    }
}
