//! Application state shared by all handlers.

use crate::auth::JwtService;
use std::sync::Arc;
use tubely_core::Config;
use tubely_db::VideoRepository;
use tubely_processing::{
    IngestPolicy, IngestionOrchestrator, MediaToolkit, TempStagingStore,
};
use tubely_storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub repository: Arc<dyn VideoRepository>,
    pub storage: Arc<dyn Storage>,
    pub orchestrator: Arc<IngestionOrchestrator>,
    pub jwt: Arc<JwtService>,
}

impl AppState {
    /// Wire the ingestion pipeline from its collaborators.
    pub fn new(
        config: Config,
        repository: Arc<dyn VideoRepository>,
        storage: Arc<dyn Storage>,
        toolkit: Arc<dyn MediaToolkit>,
    ) -> Self {
        let orchestrator = IngestionOrchestrator::new(
            repository.clone(),
            storage.clone(),
            toolkit,
            TempStagingStore::new(config.ingest.staging_dir.clone()),
            IngestPolicy::from_config(&config.ingest),
        );
        let jwt = JwtService::new(config.jwt_secret());

        Self {
            config,
            repository,
            storage,
            orchestrator: Arc::new(orchestrator),
            jwt: Arc::new(jwt),
        }
    }
}
