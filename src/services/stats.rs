//! Summary counts for the librarian dashboard

use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, repository::Repository};

/// Circulation summary counts
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub books_total: i64,
    pub books_with_stock: i64,
    pub requests_pending: i64,
    pub issues_active: i64,
    pub issues_overdue: i64,
}

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_stats(&self) -> AppResult<StatsResponse> {
        let (books_total, books_with_stock) = self.repository.books.counts().await?;
        let requests_pending = self.repository.requests.count_pending().await?;
        let issues_active = self.repository.issues.count_active().await?;
        let issues_overdue = self.repository.issues.count_overdue().await?;

        Ok(StatsResponse {
            books_total,
            books_with_stock,
            requests_pending,
            issues_active,
            issues_overdue,
        })
    }
}
