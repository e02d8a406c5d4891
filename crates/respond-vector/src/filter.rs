//! Payload filters understood by the vector store.
//!
//! Mirrors the subset of Qdrant's filter model the engine relies on: a
//! conjunction of keyword matches, numeric ranges, and geo-radius checks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use respond_core::geo::haversine_meters;
use respond_core::types::{GeoPoint, Payload};

/// A single predicate over a payload field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Condition {
    /// Field equals the given value.
    Match { key: String, value: Value },
    /// Field equals any of the given values.
    MatchAny { key: String, any: Vec<Value> },
    /// Numeric field within the inclusive bounds.
    Range {
        key: String,
        gte: Option<f64>,
        lte: Option<f64>,
    },
    /// `{lat, lon}` field within `radius_m` metres of `center`.
    GeoRadius {
        key: String,
        center: GeoPoint,
        radius_m: f64,
    },
}

impl Condition {
    pub fn matches(&self, payload: &Payload) -> bool {
        match self {
            Condition::Match { key, value } => payload.get(key) == Some(value),
            Condition::MatchAny { key, any } => payload.get(key).is_some_and(|v| any.contains(v)),
            Condition::Range { key, gte, lte } => {
                let Some(n) = payload.get(key).and_then(Value::as_f64) else {
                    return false;
                };
                gte.map_or(true, |lo| n >= lo) && lte.map_or(true, |hi| n <= hi)
            }
            Condition::GeoRadius {
                key,
                center,
                radius_m,
            } => payload
                .get(key)
                .and_then(|v| serde_json::from_value::<GeoPoint>(v.clone()).ok())
                .is_some_and(|point| haversine_meters(*center, point) <= *radius_m),
        }
    }
}

/// Conjunction of conditions. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub must: Vec<Condition>,
}

impl Filter {
    /// Combine optional conditions, returning `None` when none are set.
    pub fn combine(conditions: impl IntoIterator<Item = Option<Condition>>) -> Option<Filter> {
        let must: Vec<Condition> = conditions.into_iter().flatten().collect();
        if must.is_empty() {
            None
        } else {
            Some(Filter { must })
        }
    }

    pub fn matches(&self, payload: &Payload) -> bool {
        self.must.iter().all(|c| c.matches(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_match_condition() {
        let p = payload(json!({"zone_id": "zone-1"}));
        let hit = Condition::Match {
            key: "zone_id".into(),
            value: json!("zone-1"),
        };
        let miss = Condition::Match {
            key: "zone_id".into(),
            value: json!("zone-2"),
        };
        assert!(hit.matches(&p));
        assert!(!miss.matches(&p));
    }

    #[test]
    fn test_match_condition_missing_field() {
        let cond = Condition::Match {
            key: "status".into(),
            value: json!("pending"),
        };
        assert!(!cond.matches(&payload(json!({}))));
    }

    #[test]
    fn test_match_any_condition() {
        let cond = Condition::MatchAny {
            key: "status".into(),
            any: vec![json!("assigned"), json!("en_route")],
        };
        assert!(cond.matches(&payload(json!({"status": "en_route"}))));
        assert!(!cond.matches(&payload(json!({"status": "completed"}))));
        assert!(!cond.matches(&payload(json!({}))));
    }

    #[test]
    fn test_range_condition_inclusive() {
        let cond = Condition::Range {
            key: "timestamp_unix".into(),
            gte: Some(100.0),
            lte: None,
        };
        assert!(cond.matches(&payload(json!({"timestamp_unix": 100}))));
        assert!(cond.matches(&payload(json!({"timestamp_unix": 150}))));
        assert!(!cond.matches(&payload(json!({"timestamp_unix": 99}))));
        assert!(!cond.matches(&payload(json!({"timestamp_unix": null}))));
    }

    #[test]
    fn test_geo_radius_condition() {
        let cond = Condition::GeoRadius {
            key: "location".into(),
            center: GeoPoint { lat: 0.0, lon: 0.0 },
            radius_m: 5_000.0,
        };
        // ~1.1 km away.
        assert!(cond.matches(&payload(json!({"location": {"lat": 0.01, "lon": 0.0}}))));
        // ~111 km away.
        assert!(!cond.matches(&payload(json!({"location": {"lat": 1.0, "lon": 0.0}}))));
        assert!(!cond.matches(&payload(json!({}))));
    }

    #[test]
    fn test_combine_drops_none() {
        assert!(Filter::combine([None, None]).is_none());
        let filter = Filter::combine([
            None,
            Some(Condition::Match {
                key: "urgency".into(),
                value: json!("high"),
            }),
        ])
        .unwrap();
        assert_eq!(filter.must.len(), 1);
    }

    #[test]
    fn test_filter_is_conjunctive() {
        let filter = Filter {
            must: vec![
                Condition::Match {
                    key: "zone_id".into(),
                    value: json!("zone-1"),
                },
                Condition::Match {
                    key: "urgency".into(),
                    value: json!("critical"),
                },
            ],
        };
        assert!(filter.matches(&payload(json!({"zone_id": "zone-1", "urgency": "critical"}))));
        assert!(!filter.matches(&payload(json!({"zone_id": "zone-1", "urgency": "low"}))));
    }
}
