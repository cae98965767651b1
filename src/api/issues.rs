//! Circulation ledger endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::issue::{CreateIssue, IssueQuery, LibraryIssue, LibraryIssueDetails, ReturnCopy},
};

use super::{AuthenticatedUser, PaginatedResponse};

/// Issue response with the created ledger entry
#[derive(Serialize, ToSchema)]
pub struct IssueResponse {
    /// Ledger entry
    pub issue: LibraryIssue,
    /// Status message
    pub message: String,
}

/// Issue a copy to a borrower (librarian)
#[utoipa::path(
    post,
    path = "/issues",
    tag = "issues",
    security(("bearer_auth" = [])),
    request_body = CreateIssue,
    responses(
        (status = 201, description = "Copy issued", body = IssueResponse),
        (status = 403, description = "Not a librarian"),
        (status = 404, description = "Book or borrower not found"),
        (status = 409, description = "No copies available"),
        (status = 422, description = "Borrower role not eligible")
    )
)]
pub async fn create_issue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateIssue>,
) -> AppResult<(StatusCode, Json<IssueResponse>)> {
    claims.require_staff()?;

    let issue = state
        .services
        .circulation
        .issue(request.book_id, request.borrower_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IssueResponse {
            issue,
            message: "Book issued successfully".to_string(),
        }),
    ))
}

/// Return a copy, optionally recording a fine (librarian)
#[utoipa::path(
    post,
    path = "/issues/{id}/return",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Ledger entry ID")
    ),
    request_body = ReturnCopy,
    responses(
        (status = 200, description = "Copy returned", body = IssueResponse),
        (status = 403, description = "Not a librarian"),
        (status = 404, description = "Entry not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_issue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<ReturnCopy>,
) -> AppResult<Json<IssueResponse>> {
    claims.require_staff()?;

    let issue = state
        .services
        .circulation
        .return_copy(id, request.fine_amount)
        .await?;

    Ok(Json(IssueResponse {
        issue,
        message: "Book returned successfully".to_string(),
    }))
}

/// Get a ledger entry by ID. Borrowers may only read their own.
#[utoipa::path(
    get,
    path = "/issues/{id}",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Ledger entry ID")
    ),
    responses(
        (status = 200, description = "Ledger entry", body = LibraryIssueDetails),
        (status = 404, description = "Entry not found")
    )
)]
pub async fn get_issue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<LibraryIssueDetails>> {
    let issue = state.services.circulation.get_issue(id).await?;
    claims.require_self_or_staff(issue.borrower_id)?;
    Ok(Json(issue))
}

/// List overdue entries (librarian). Derived view - nothing is mutated.
#[utoipa::path(
    get,
    path = "/issues/overdue",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(IssueQuery),
    responses(
        (status = 200, description = "Overdue entries", body = PaginatedResponse<LibraryIssueDetails>),
        (status = 403, description = "Not a librarian")
    )
)]
pub async fn list_overdue_issues(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<IssueQuery>,
) -> AppResult<Json<PaginatedResponse<LibraryIssueDetails>>> {
    claims.require_staff()?;

    let (issues, total) = state
        .services
        .circulation
        .list_overdue(query.page, query.per_page)
        .await?;
    Ok(Json(PaginatedResponse::new(
        issues,
        total,
        query.page,
        query.per_page,
    )))
}

/// List ledger entries for a borrower
#[utoipa::path(
    get,
    path = "/users/{id}/issues",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Borrower user ID"),
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<i64>, Query, description = "Items per page (default: 20)")
    ),
    responses(
        (status = 200, description = "Borrower's ledger entries", body = PaginatedResponse<LibraryIssueDetails>),
        (status = 403, description = "Not the borrower or a librarian"),
        (status = 404, description = "User not found")
    )
)]
pub async fn list_user_issues(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i64>,
    Query(query): Query<IssueQuery>,
) -> AppResult<Json<PaginatedResponse<LibraryIssueDetails>>> {
    claims.require_self_or_staff(user_id)?;

    let (issues, total) = state
        .services
        .circulation
        .list_by_borrower(user_id, query.page, query.per_page)
        .await?;
    Ok(Json(PaginatedResponse::new(
        issues,
        total,
        query.page,
        query.per_page,
    )))
}

/// List ledger entries for a book (librarian)
#[utoipa::path(
    get,
    path = "/books/{id}/issues",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Book ID"),
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<i64>, Query, description = "Items per page (default: 20)")
    ),
    responses(
        (status = 200, description = "Book's ledger entries", body = PaginatedResponse<LibraryIssueDetails>),
        (status = 403, description = "Not a librarian"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn list_book_issues(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i64>,
    Query(query): Query<IssueQuery>,
) -> AppResult<Json<PaginatedResponse<LibraryIssueDetails>>> {
    claims.require_staff()?;

    let (issues, total) = state
        .services
        .circulation
        .list_by_book(book_id, query.page, query.per_page)
        .await?;
    Ok(Json(PaginatedResponse::new(
        issues,
        total,
        query.page,
        query.per_page,
    )))
}
