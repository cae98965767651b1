//! Business logic services

pub mod catalog;
pub mod circulation;
pub mod requests;
pub mod stats;

use crate::repository::Repository;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub requests: requests::RequestsService,
    pub circulation: circulation::CirculationService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            requests: requests::RequestsService::new(repository.clone()),
            circulation: circulation::CirculationService::new(repository.clone()),
            stats: stats::StatsService::new(repository),
        }
    }
}
