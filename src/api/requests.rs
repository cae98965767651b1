//! Borrow request workflow endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::request::{BorrowRequestDetails, CreateRequest, DecideRequest, RequestQuery},
};

use super::{AuthenticatedUser, PaginatedResponse};

/// Create a borrow request (student, for themselves)
#[utoipa::path(
    post,
    path = "/requests",
    tag = "requests",
    security(("bearer_auth" = [])),
    request_body = CreateRequest,
    responses(
        (status = 201, description = "Request created", body = BorrowRequestDetails),
        (status = 403, description = "Not a student"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Duplicate pending request or no copies available")
    )
)]
pub async fn create_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateRequest>,
) -> AppResult<(StatusCode, Json<BorrowRequestDetails>)> {
    claims.require_student()?;

    let created = state
        .services
        .requests
        .create_request(claims.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Approve or reject a pending request (librarian)
#[utoipa::path(
    post,
    path = "/requests/{id}/decide",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Request ID")
    ),
    request_body = DecideRequest,
    responses(
        (status = 200, description = "Decision recorded", body = BorrowRequestDetails),
        (status = 400, description = "Unknown action"),
        (status = 403, description = "Not a librarian"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "No copies available to approve"),
        (status = 422, description = "Request is not pending")
    )
)]
pub async fn decide_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(decision): Json<DecideRequest>,
) -> AppResult<Json<BorrowRequestDetails>> {
    claims.require_staff()?;

    let decided = state
        .services
        .requests
        .decide(id, &decision.action, claims.user_id, decision.remarks.as_deref())
        .await?;
    Ok(Json(decided))
}

/// Cancel a pending request (requester only)
#[utoipa::path(
    post,
    path = "/requests/{id}/cancel",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Request cancelled", body = BorrowRequestDetails),
        (status = 403, description = "Not the requester"),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Request is not pending")
    )
)]
pub async fn cancel_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowRequestDetails>> {
    let cancelled = state.services.requests.cancel(id, claims.user_id).await?;
    Ok(Json(cancelled))
}

/// Get request by ID. Students may only read their own requests.
#[utoipa::path(
    get,
    path = "/requests/{id}",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Request details", body = BorrowRequestDetails),
        (status = 404, description = "Request not found")
    )
)]
pub async fn get_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowRequestDetails>> {
    let request = state.services.requests.get_request(id).await?;
    claims.require_self_or_staff(request.student_id)?;
    Ok(Json(request))
}

/// List requests, optionally filtered by status (librarian)
#[utoipa::path(
    get,
    path = "/requests",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(RequestQuery),
    responses(
        (status = 200, description = "List of requests", body = PaginatedResponse<BorrowRequestDetails>),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Not a librarian")
    )
)]
pub async fn list_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<RequestQuery>,
) -> AppResult<Json<PaginatedResponse<BorrowRequestDetails>>> {
    claims.require_staff()?;

    let status = query
        .status
        .as_deref()
        .ok_or_else(|| AppError::Validation("status query parameter is required".to_string()))?;

    let (requests, total) = state
        .services
        .requests
        .list_by_status(status, query.page, query.per_page)
        .await?;
    Ok(Json(PaginatedResponse::new(
        requests,
        total,
        query.page,
        query.per_page,
    )))
}

/// List pending requests oldest-first (librarian)
#[utoipa::path(
    get,
    path = "/requests/pending",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<i64>, Query, description = "Items per page (default: 20)")
    ),
    responses(
        (status = 200, description = "Pending requests in FIFO order", body = PaginatedResponse<BorrowRequestDetails>),
        (status = 403, description = "Not a librarian")
    )
)]
pub async fn list_pending_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<RequestQuery>,
) -> AppResult<Json<PaginatedResponse<BorrowRequestDetails>>> {
    claims.require_staff()?;

    let (requests, total) = state
        .services
        .requests
        .list_pending(query.page, query.per_page)
        .await?;
    Ok(Json(PaginatedResponse::new(
        requests,
        total,
        query.page,
        query.per_page,
    )))
}

/// List a student's requests, newest first
#[utoipa::path(
    get,
    path = "/students/{id}/requests",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Student user ID"),
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<i64>, Query, description = "Items per page (default: 20)")
    ),
    responses(
        (status = 200, description = "Student's requests", body = PaginatedResponse<BorrowRequestDetails>),
        (status = 403, description = "Not the student or a librarian")
    )
)]
pub async fn list_student_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(student_id): Path<i64>,
    Query(query): Query<RequestQuery>,
) -> AppResult<Json<PaginatedResponse<BorrowRequestDetails>>> {
    claims.require_self_or_staff(student_id)?;

    let (requests, total) = state
        .services
        .requests
        .list_by_student(student_id, query.page, query.per_page)
        .await?;
    Ok(Json(PaginatedResponse::new(
        requests,
        total,
        query.page,
        query.per_page,
    )))
}
