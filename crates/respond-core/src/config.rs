use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RespondError, Result};

/// Top-level configuration for the RESPOND engine.
///
/// Loaded from `~/.respond/config.toml` by default. Every section falls back
/// to its defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RespondConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub events: EventConfig,
}

impl RespondConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RespondConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check threshold ranges and their ordering.
    ///
    /// Merging reports into one incident must demand more similarity than
    /// accepting corroborating evidence, and clustering into an event more
    /// than either: accept < dedup < event.
    pub fn validate(&self) -> Result<()> {
        let thresholds = [
            ("memory.accept_threshold", self.memory.accept_threshold),
            ("dedup.threshold", self.dedup.threshold),
            ("events.threshold", self.events.threshold),
            ("memory.default_confidence", self.memory.default_confidence),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(RespondError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if !(self.memory.accept_threshold < self.dedup.threshold
            && self.dedup.threshold < self.events.threshold)
        {
            return Err(RespondError::Config(format!(
                "thresholds must satisfy accept ({}) < dedup ({}) < events ({})",
                self.memory.accept_threshold, self.dedup.threshold, self.events.threshold
            )));
        }

        if self.search.default_limit == 0 || self.search.default_limit > self.search.max_limit {
            return Err(RespondError::Config(format!(
                "search.default_limit must be within 1..={}, got {}",
                self.search.max_limit, self.search.default_limit
            )));
        }

        if self.store.vector_size == 0 {
            return Err(RespondError::Config("store.vector_size must be > 0".to_string()));
        }

        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// JSON snapshot of the in-memory store used by the command-line tool.
    pub snapshot_path: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            snapshot_path: "~/.respond/store.json".to_string(),
        }
    }
}

/// Vector store layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Prefix prepended to every collection name.
    pub collection_prefix: String,
    /// Dimension of text embedding vectors.
    pub vector_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection_prefix: "respond_".to_string(),
            vector_size: 384,
        }
    }
}

impl StoreConfig {
    pub fn incidents_collection(&self) -> String {
        format!("{}situation_reports", self.collection_prefix)
    }

    pub fn events_collection(&self) -> String {
        format!("{}disaster_events", self.collection_prefix)
    }

    pub fn deployments_collection(&self) -> String {
        format!("{}resource_deployments", self.collection_prefix)
    }
}

/// Embedding backend configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Directory holding `model.onnx` and `tokenizer.json`. Only read when
    /// the binary is built with the `onnx` feature.
    pub model_dir: Option<String>,
}

/// Search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Default number of results.
    pub default_limit: usize,
    /// Maximum number of results a single query may request.
    pub max_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

/// Reinforcement policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Minimum similarity for evidence to count as corroborating.
    pub accept_threshold: f64,
    /// Upper bound on a single confidence boost.
    pub max_boost: f64,
    /// Boost per unit of similarity.
    pub boost_factor: f64,
    /// Confidence assigned to newly ingested incidents.
    pub default_confidence: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.50,
            max_boost: 0.15,
            boost_factor: 0.10,
            default_confidence: 0.5,
        }
    }
}

/// Auto-deduplication policy for smart ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Minimum raw similarity for a new report to be merged into an existing
    /// incident.
    pub threshold: f64,
    /// Trailing window, in hours, of incidents considered for merging.
    pub window_hours: u32,
    /// Number of candidates fetched from the store.
    pub candidates: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            threshold: 0.70,
            window_hours: 2,
            candidates: 3,
        }
    }
}

/// Disaster event clustering policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Minimum similarity for an incident to join an existing event.
    pub threshold: f64,
    /// Number of candidate events fetched from the store.
    pub candidates: usize,
    /// Maximum event title length in characters, ellipsis included.
    pub title_max_chars: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            threshold: 0.75,
            candidates: 3,
            title_max_chars: 60,
        }
    }
}
