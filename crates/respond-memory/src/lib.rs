//! RESPOND memory crate - incident memory and evidence fusion.
//!
//! Reranks similarity search by recency, merges corroborating reports into
//! existing incidents, clusters incidents into disaster events and enforces
//! the incident status lifecycle. Deployed response units are tracked
//! against the incidents they serve. [`Respond`] wires the engines together
//! over one store and one embedder.

pub mod cluster;
pub mod decay;
pub mod deployment;
pub mod evidence;
pub mod handles;
pub mod ingest;
pub mod lifecycle;
pub mod recommend;
pub mod reinforcement;
pub mod repository;
pub mod search;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use respond_core::config::RespondConfig;
use respond_core::error::{RespondError, Result};
use respond_core::types::{
    DeploymentStatus, DisasterEvent, Incident, IncidentStatus, NewIncident, SourceType,
};
use respond_vector::embedding::DynEmbeddingService;
use respond_vector::store::VectorStore;

pub use cluster::{EventAssignment, EventClusterer};
pub use decay::{decay, decay_at, Decay};
pub use deployment::{Deployment, DeploymentTracker, DeploymentUpdate, NewDeployment};
pub use evidence::EvidenceSummary;
pub use handles::SharedHandles;
pub use ingest::{ensure_collections, CollectionSetup, IncidentIngester, IngestOutcome, SmartIngester};
pub use lifecycle::{StatusChange, StatusLifecycle};
pub use recommend::{ActionRecommender, ActionType, Recommendation};
pub use reinforcement::{ReinforceOutcome, ReinforcementEngine};
pub use repository::{DeploymentRepository, EventRepository, IncidentRepository};
pub use search::{GeoRadius, HybridSearchEngine, SearchFilters, SearchResult};

/// Outcome of ingesting a report end to end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportOutcome {
    #[serde(flatten)]
    pub ingest: IngestOutcome,
    /// Event assignment for a newly created incident. Reports merged into an
    /// existing incident are not re-clustered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventAssignment>,
}

/// The engine facade: all operations over a shared store and embedder.
#[derive(Clone)]
pub struct Respond {
    config: RespondConfig,
    store: Arc<dyn VectorStore>,
    incidents: IncidentRepository,
    ingester: IncidentIngester,
    smart: SmartIngester,
    search: HybridSearchEngine,
    reinforcement: ReinforcementEngine,
    lifecycle: StatusLifecycle,
    clusterer: EventClusterer,
    recommender: ActionRecommender,
    deployments: DeploymentTracker,
}

impl Respond {
    /// Wire the engines together.
    ///
    /// Fails with `DimensionMismatch` when the embedder does not produce
    /// vectors of the configured store size.
    pub fn new(
        config: RespondConfig,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn DynEmbeddingService>,
    ) -> Result<Self> {
        config.validate()?;
        if embedder.dimensions() != config.store.vector_size {
            return Err(RespondError::DimensionMismatch {
                expected: config.store.vector_size,
                actual: embedder.dimensions(),
            });
        }

        let incidents = IncidentRepository::new(Arc::clone(&store), config.store.incidents_collection());
        let events = EventRepository::new(Arc::clone(&store), config.store.events_collection());
        let deployments = DeploymentRepository::new(Arc::clone(&store), config.store.deployments_collection());

        let search = HybridSearchEngine::new(
            Arc::clone(&store),
            Arc::clone(&embedder),
            config.store.incidents_collection(),
            config.search.max_limit,
        );
        let reinforcement = ReinforcementEngine::new(
            incidents.clone(),
            Arc::clone(&embedder),
            config.memory.clone(),
        );
        let ingester = IncidentIngester::new(
            incidents.clone(),
            Arc::clone(&embedder),
            config.memory.default_confidence,
        );
        let smart = SmartIngester::new(
            ingester.clone(),
            search.clone(),
            reinforcement.clone(),
            config.dedup.clone(),
        );
        let clusterer = EventClusterer::new(events, Arc::clone(&embedder), config.events.clone());
        let deployments = DeploymentTracker::new(deployments, Arc::clone(&embedder));

        Ok(Self {
            lifecycle: StatusLifecycle::new(incidents.clone()),
            recommender: ActionRecommender::new(search.clone()),
            config,
            store,
            incidents,
            ingester,
            smart,
            search,
            reinforcement,
            clusterer,
            deployments,
        })
    }

    pub fn config(&self) -> &RespondConfig {
        &self.config
    }

    /// Create the incident, event and deployment collections if they are
    /// missing.
    pub async fn ensure_collections(&self) -> Result<CollectionSetup> {
        ensure_collections(self.store.as_ref(), &self.config.store).await
    }

    /// Store a report as a new incident, without deduplication or
    /// clustering.
    pub async fn ingest(&self, new: NewIncident) -> Result<Incident> {
        self.ingester.ingest(new).await
    }

    /// Ingest a report with deduplication, then cluster a newly created
    /// incident into a disaster event.
    pub async fn ingest_report(&self, new: NewIncident) -> Result<ReportOutcome> {
        let ingest = self.smart.ingest(new).await?;
        let event = match &ingest.created {
            Some(incident) => Some(self.clusterer.assign(incident.id, &incident.payload).await?),
            None => None,
        };

        info!(
            incident_id = %ingest.incident_id,
            deduplicated = ingest.deduplicated,
            event_id = ?event.as_ref().map(|e| e.event_id),
            "Report processed"
        );
        Ok(ReportOutcome { ingest, event })
    }

    pub async fn search(&self, query: &str, limit: usize, filters: &SearchFilters) -> Result<Vec<SearchResult>> {
        self.search.search(query, limit, filters).await
    }

    pub async fn reinforce(&self, incident_id: Uuid, source_type: SourceType, text: &str) -> Result<ReinforceOutcome> {
        self.reinforcement.reinforce(incident_id, source_type, text).await
    }

    pub async fn update_status(&self, incident_id: Uuid, status: IncidentStatus) -> Result<StatusChange> {
        self.lifecycle.transition(incident_id, status).await
    }

    /// Attach an existing incident to an event, or start one for it.
    pub async fn assign_event(&self, incident_id: Uuid) -> Result<EventAssignment> {
        let incident = self.incidents.get(incident_id).await?;
        self.clusterer.assign(incident.id, &incident.payload).await
    }

    pub async fn recommend(&self, query: &str, limit: usize, zone_id: Option<&str>) -> Result<Recommendation> {
        self.recommender.recommend(query, limit, zone_id).await
    }

    pub async fn get_incident(&self, incident_id: Uuid) -> Result<Incident> {
        self.incidents.get(incident_id).await
    }

    pub async fn get_event(&self, event_id: Uuid) -> Result<DisasterEvent> {
        self.clusterer.get_event(event_id).await
    }

    /// Dispatch a unit against existing incidents.
    ///
    /// Every referenced incident must exist; a missing one fails with
    /// `NotFound` before anything is stored.
    pub async fn create_deployment(&self, new: NewDeployment) -> Result<Deployment> {
        deployment::validate_new_deployment(&new)?;
        for id in &new.incident_ids {
            self.incidents.get(*id).await?;
        }
        self.deployments.create(new).await
    }

    pub async fn update_deployment_status(
        &self,
        deployment_id: Uuid,
        status: DeploymentStatus,
        notes: Option<String>,
    ) -> Result<DeploymentUpdate> {
        self.deployments.update_status(deployment_id, status, notes).await
    }

    pub async fn get_deployment(&self, deployment_id: Uuid) -> Result<Deployment> {
        self.deployments.get(deployment_id).await
    }

    pub async fn list_active_deployments(&self, zone_id: Option<&str>) -> Result<Vec<Deployment>> {
        self.deployments.list_active(zone_id).await
    }
}
