//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, issues, requests, stats};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Circulation API",
        version = "1.0.0",
        description = "Library circulation REST API: catalog, borrow requests and issue ledger",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::list_available_books,
        books::get_book,
        books::get_book_by_isbn,
        books::create_book,
        books::delete_book,
        // Requests
        requests::create_request,
        requests::decide_request,
        requests::cancel_request,
        requests::get_request,
        requests::list_requests,
        requests::list_pending_requests,
        requests::list_student_requests,
        // Issues
        issues::create_issue,
        issues::return_issue,
        issues::get_issue,
        issues::list_overdue_issues,
        issues::list_user_issues,
        issues::list_book_issues,
        // Stats
        stats::get_stats,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::BookQuery,
            // Requests
            crate::models::request::BorrowRequestDetails,
            crate::models::request::CreateRequest,
            crate::models::request::DecideRequest,
            crate::models::request::RequestQuery,
            crate::models::request::RequestStatus,
            crate::models::request::RequestAction,
            // Issues
            crate::models::issue::LibraryIssue,
            crate::models::issue::LibraryIssueDetails,
            crate::models::issue::CreateIssue,
            crate::models::issue::ReturnCopy,
            crate::models::issue::IssueQuery,
            crate::models::issue::IssueStatus,
            issues::IssueResponse,
            // Users
            crate::models::user::Principal,
            crate::models::user::Role,
            // Stats
            crate::services::stats::StatsResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "requests", description = "Borrow request workflow"),
        (name = "issues", description = "Circulation ledger"),
        (name = "stats", description = "Statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
