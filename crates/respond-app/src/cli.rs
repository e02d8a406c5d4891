//! CLI argument definitions for the `respond` tool.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use respond_core::types::{
    DeploymentStatus, GeoPoint, IncidentStatus, NewIncident, SourceType, Urgency,
};
use respond_memory::{ActionType, GeoRadius, NewDeployment, SearchFilters};

/// RESPOND - incident memory and evidence fusion for disaster response.
#[derive(Parser, Debug)]
#[command(name = "respond", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Path to the JSON store snapshot.
    #[arg(short = 's', long = "snapshot", global = true)]
    pub snapshot: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the incident, event and deployment collections.
    Setup {
        /// Also write the effective configuration to the config path if no
        /// file exists there yet.
        #[arg(long)]
        write_config: bool,
    },
    /// Ingest an incident report.
    Ingest(IngestArgs),
    /// Add corroborating evidence to an incident.
    Reinforce {
        incident_id: Uuid,
        #[arg(long)]
        source: SourceType,
        #[arg(long)]
        text: String,
    },
    /// Change an incident's status.
    Status {
        incident_id: Uuid,
        status: IncidentStatus,
    },
    /// Search incidents, reranked by recency.
    Search(SearchArgs),
    /// Recommend response actions for a query.
    Recommend {
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
        #[arg(long)]
        zone: Option<String>,
    },
    /// Show a disaster event.
    Event { event_id: Uuid },
    /// Track response units dispatched to incidents.
    #[command(subcommand)]
    Deployment(DeploymentCommand),
    /// Ingest randomly generated disaster reports.
    Simulate {
        #[arg(long, default_value_t = 10)]
        count: usize,
        /// Pause between reports, in milliseconds.
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum DeploymentCommand {
    /// Dispatch a unit against one or more incidents.
    Create(CreateDeploymentArgs),
    /// Change a deployment's status.
    Status {
        deployment_id: Uuid,
        status: DeploymentStatus,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show a deployment.
    Show { deployment_id: Uuid },
    /// List deployments still assigned, en route or on site.
    Active {
        #[arg(long)]
        zone: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct CreateDeploymentArgs {
    #[arg(long)]
    pub action: ActionType,
    /// Incident served by the unit; repeat for several.
    #[arg(long = "incident", required = true)]
    pub incidents: Vec<Uuid>,
    #[arg(long)]
    pub unit: String,
    #[arg(long)]
    pub status: Option<DeploymentStatus>,
    #[arg(long)]
    pub zone: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

impl CreateDeploymentArgs {
    pub fn to_new_deployment(&self) -> NewDeployment {
        let mut new = NewDeployment::new(self.action, self.incidents.clone(), self.unit.clone());
        new.status = self.status;
        new.zone_id = self.zone.clone();
        new.notes = self.notes.clone();
        new
    }
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    #[arg(long)]
    pub text: String,
    #[arg(long)]
    pub source: SourceType,
    #[arg(long)]
    pub urgency: Option<Urgency>,
    #[arg(long)]
    pub zone: Option<String>,
    #[arg(long)]
    pub confidence: Option<f64>,
    #[arg(long, requires = "lon")]
    pub lat: Option<f64>,
    #[arg(long, requires = "lat")]
    pub lon: Option<f64>,
    /// Store as a new incident without deduplication or event clustering.
    #[arg(long)]
    pub raw: bool,
}

impl IngestArgs {
    pub fn to_new_incident(&self) -> NewIncident {
        let mut new = NewIncident::new(self.text.clone(), self.source);
        new.urgency = self.urgency;
        new.zone_id = self.zone.clone();
        new.confidence_score = self.confidence;
        if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            new.location = Some(GeoPoint { lat, lon });
        }
        new
    }
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    pub query: String,
    #[arg(long)]
    pub limit: Option<usize>,
    #[arg(long)]
    pub zone: Option<String>,
    #[arg(long)]
    pub urgency: Option<Urgency>,
    #[arg(long)]
    pub status: Option<IncidentStatus>,
    #[arg(long)]
    pub last_hours: Option<u32>,
    #[arg(long, requires_all = ["lon", "radius_km"])]
    pub lat: Option<f64>,
    #[arg(long, requires_all = ["lat", "radius_km"])]
    pub lon: Option<f64>,
    #[arg(long, requires_all = ["lat", "lon"])]
    pub radius_km: Option<f64>,
}

impl SearchArgs {
    pub fn filters(&self) -> SearchFilters {
        let geo = match (self.lat, self.lon, self.radius_km) {
            (Some(lat), Some(lon), Some(radius_km)) => Some(GeoRadius {
                center: GeoPoint { lat, lon },
                radius_km,
            }),
            _ => None,
        };
        SearchFilters {
            zone_id: self.zone.clone(),
            urgency: self.urgency,
            status: self.status,
            last_hours: self.last_hours,
            geo,
        }
    }
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > RESPOND_CONFIG env var > ~/.respond/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("RESPOND_CONFIG") {
            return PathBuf::from(p);
        }
        home_dir()
            .map(|home| home.join(".respond").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Resolve the snapshot path.
    ///
    /// Priority: --snapshot flag > config file value (with `~/` expanded).
    pub fn resolve_snapshot_path(&self, config_value: &str) -> PathBuf {
        if let Some(ref p) = self.snapshot {
            return p.clone();
        }
        expand_home(config_value)
    }
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let var = "USERPROFILE";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";
    std::env::var(var).ok().map(PathBuf::from)
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
