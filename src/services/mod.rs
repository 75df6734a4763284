//! Business logic services

pub mod collections;
pub mod dedup;
pub mod enrichment;
pub mod imports;

use std::sync::Arc;

use crate::{
    config::{EnrichmentConfig, ImportConfig},
    error::AppResult,
    repository::{LibraryStore, Repository},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub imports: imports::ImportService,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        import_config: ImportConfig,
        enrichment_config: &EnrichmentConfig,
    ) -> AppResult<Self> {
        let store: Arc<dyn LibraryStore> = Arc::new(repository.clone());
        let enrichment = enrichment::EnrichmentClient::from_config(enrichment_config)?;

        Ok(Self {
            imports: imports::ImportService::new(store, enrichment, import_config),
            repository,
        })
    }
}
