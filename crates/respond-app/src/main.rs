//! RESPOND command-line tool - composition root.
//!
//! 1. Parse arguments and load configuration from TOML
//! 2. Install the tracing subscriber
//! 3. Open the store snapshot and build the embedder
//! 4. Run one command against the engine and print JSON
//! 5. Persist the snapshot after commands that write

mod cli;
mod simulate;

use std::sync::Arc;

use clap::Parser;
use serde::Serialize;

use respond_core::config::RespondConfig;
use respond_memory::{Respond, SharedHandles};
use respond_vector::embedding::DynEmbeddingService;
use respond_vector::store::{InMemoryVectorStore, VectorStore};

use cli::{CliArgs, Command, DeploymentCommand};
use simulate::{generate_report, SimulationLine};

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Build the text embedder for this build.
///
/// With the `onnx` feature and `embedding.model_dir` set, loads the ONNX
/// model; otherwise falls back to deterministic hash embeddings.
fn build_embedder(config: &RespondConfig) -> respond_core::Result<Arc<dyn DynEmbeddingService>> {
    #[cfg(feature = "onnx")]
    if let Some(dir) = &config.embedding.model_dir {
        let service = respond_vector::OnnxEmbeddingService::from_directory(&cli::expand_home(dir))?;
        return Ok(Arc::new(service));
    }

    #[cfg(not(feature = "onnx"))]
    if config.embedding.model_dir.is_some() {
        tracing::warn!("embedding.model_dir is set but this build lacks the `onnx` feature");
    }

    tracing::info!("Using hash-based mock embeddings");
    Ok(Arc::new(respond_vector::MockEmbedding::with_dimensions(
        config.store.vector_size,
    )))
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let args = CliArgs::parse();

    // Config, loaded before tracing so its log level can apply.
    let config_file = args.resolve_config_path();
    let (config, config_error) = match RespondConfig::load(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (RespondConfig::default(), Some(e)),
    };

    // Tracing. Logs go to stderr; stdout carries the JSON output.
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.general.log_level.clone());
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .init();

    match config_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) if config_file.exists() => {
            tracing::warn!(path = %config_file.display(), error = %e, "Invalid configuration, using defaults")
        }
        Some(_) => tracing::debug!(path = %config_file.display(), "No configuration file, using defaults"),
    }

    // Store and embedder.
    let snapshot_path = args.resolve_snapshot_path(&config.general.snapshot_path);
    let snapshot = InMemoryVectorStore::load_snapshot(&snapshot_path)?;

    let handles = SharedHandles::new();
    let store = handles
        .store(|| async { Ok(Arc::new(snapshot.clone()) as Arc<dyn VectorStore>) })
        .await?;
    let embedder = handles.embedder(|| async { build_embedder(&config) }).await?;

    let respond = Respond::new(config.clone(), store, embedder)?;
    let setup = respond.ensure_collections().await?;

    let writes = match args.command {
        Command::Setup { write_config } => {
            if write_config && !config_file.exists() {
                config.save(&config_file)?;
            }
            print_json(&setup)?;
            !setup.created.is_empty()
        }
        Command::Ingest(ingest) => {
            let new = ingest.to_new_incident();
            if ingest.raw {
                print_json(&respond.ingest(new).await?)?;
            } else {
                print_json(&respond.ingest_report(new).await?)?;
            }
            true
        }
        Command::Reinforce {
            incident_id,
            source,
            text,
        } => {
            print_json(&respond.reinforce(incident_id, source, &text).await?)?;
            true
        }
        Command::Status { incident_id, status } => {
            let change = respond.update_status(incident_id, status).await?;
            print_json(&change)?;
            change.changed
        }
        Command::Search(search) => {
            let limit = search.limit.unwrap_or(config.search.default_limit);
            let results = respond.search(&search.query, limit, &search.filters()).await?;
            print_json(&results)?;
            false
        }
        Command::Recommend { query, limit, zone } => {
            print_json(&respond.recommend(&query, limit, zone.as_deref()).await?)?;
            false
        }
        Command::Event { event_id } => {
            print_json(&respond.get_event(event_id).await?)?;
            false
        }
        Command::Deployment(deployment) => run_deployment(&respond, deployment).await?,
        Command::Simulate { count, interval_ms } => {
            run_simulation(&respond, count, interval_ms).await?;
            true
        }
    };

    if writes || !setup.created.is_empty() {
        snapshot.save_snapshot(&snapshot_path)?;
        tracing::info!(path = %snapshot_path.display(), "Snapshot saved");
    }

    Ok(())
}

/// Run a deployment subcommand. Returns whether the store was written.
async fn run_deployment(respond: &Respond, command: DeploymentCommand) -> AppResult<bool> {
    match command {
        DeploymentCommand::Create(create) => {
            print_json(&respond.create_deployment(create.to_new_deployment()).await?)?;
            Ok(true)
        }
        DeploymentCommand::Status {
            deployment_id,
            status,
            notes,
        } => {
            print_json(&respond.update_deployment_status(deployment_id, status, notes).await?)?;
            Ok(true)
        }
        DeploymentCommand::Show { deployment_id } => {
            print_json(&respond.get_deployment(deployment_id).await?)?;
            Ok(false)
        }
        DeploymentCommand::Active { zone } => {
            print_json(&respond.list_active_deployments(zone.as_deref()).await?)?;
            Ok(false)
        }
    }
}

/// Feed `count` random reports through deduplication and clustering,
/// printing one JSON line per report.
async fn run_simulation(respond: &Respond, count: usize, interval_ms: u64) -> AppResult<()> {
    tracing::info!(count, interval_ms, "Starting disaster simulation");
    let mut deduplicated = 0usize;

    for seq in 1..=count {
        // The RNG is not Send; keep it out of the await below.
        let report = generate_report(&mut rand::rng());
        let urgency = report.incident.urgency.unwrap_or_default();
        let zone_id = report.incident.zone_id.clone().unwrap_or_default();

        let outcome = respond.ingest_report(report.incident).await?;
        if outcome.ingest.deduplicated {
            deduplicated += 1;
        }

        let line = SimulationLine {
            seq,
            kind: report.kind,
            urgency,
            zone_id,
            incident_id: outcome.ingest.incident_id,
            deduplicated: outcome.ingest.deduplicated,
            event_id: outcome.event.map(|e| e.event_id),
        };
        println!("{}", serde_json::to_string(&line)?);

        if interval_ms > 0 && seq < count {
            tokio::time::sleep(std::time::Duration::from_millis(interval_ms)).await;
        }
    }

    tracing::info!(count, deduplicated, "Simulation finished");
    Ok(())
}
