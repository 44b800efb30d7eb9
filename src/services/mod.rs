//! Business logic services

pub mod catalog;
pub mod lending;

use crate::{config::CatalogConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub lending: lending::LendingService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, catalog_config: &CatalogConfig) -> Self {
        let catalog = catalog::CatalogService::new(repository.clone(), catalog_config.default_limit);
        Self {
            lending: lending::LendingService::new(repository, catalog.clone()),
            catalog,
        }
    }
}
