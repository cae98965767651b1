//! Borrow request workflow service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        request::{BorrowRequestDetails, CreateRequest, RequestAction, RequestStatus},
        user::Role,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct RequestsService {
    repository: Repository,
}

impl RequestsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Create a PENDING request for a student.
    ///
    /// The stock check here is advisory: it does not reserve a copy, and the
    /// book may be depleted again before the request is approved or issued.
    pub async fn create_request(
        &self,
        student_id: i64,
        request: CreateRequest,
    ) -> AppResult<BorrowRequestDetails> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        self.repository
            .users
            .get_with_role(student_id, Role::Student)
            .await?;

        let book = self.repository.books.get_by_id(request.book_id).await?;

        if self
            .repository
            .requests
            .has_pending(student_id, request.book_id)
            .await?
        {
            return Err(AppError::Conflict(
                "You already have a pending request for this book".to_string(),
            ));
        }

        if !book.has_stock() {
            return Err(AppError::NoStock(
                "No copies available for this book".to_string(),
            ));
        }

        let created = self
            .repository
            .requests
            .create(student_id, request.book_id, request.remarks.as_deref())
            .await?;

        tracing::info!(
            request_id = created.id,
            student_id,
            book_id = request.book_id,
            "borrow request created"
        );

        Ok(created)
    }

    /// Apply a librarian decision (APPROVE/REJECT) to a pending request
    pub async fn decide(
        &self,
        request_id: i64,
        action: &str,
        librarian_id: i64,
        remarks: Option<&str>,
    ) -> AppResult<BorrowRequestDetails> {
        let action: RequestAction = action
            .parse()
            .map_err(AppError::Validation)?;

        self.repository.users.get_by_id(librarian_id).await?;

        let decided = self
            .repository
            .requests
            .decide(request_id, action, librarian_id, remarks)
            .await?;

        tracing::info!(
            request_id,
            librarian_id,
            status = %decided.status,
            "borrow request decided"
        );

        Ok(decided)
    }

    /// Cancel a pending request on behalf of its requester
    pub async fn cancel(&self, request_id: i64, student_id: i64) -> AppResult<BorrowRequestDetails> {
        let cancelled = self.repository.requests.cancel(request_id, student_id).await?;
        tracing::info!(request_id, student_id, "borrow request cancelled");
        Ok(cancelled)
    }

    /// Get request by ID
    pub async fn get_request(&self, id: i64) -> AppResult<BorrowRequestDetails> {
        self.repository.requests.get_by_id(id).await
    }

    /// Requests made by a student, newest first
    pub async fn list_by_student(
        &self,
        student_id: i64,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> AppResult<(Vec<BorrowRequestDetails>, i64)> {
        self.repository
            .requests
            .list_by_student(student_id, page, per_page)
            .await
    }

    /// Requests filtered by status (parsed case-insensitively)
    pub async fn list_by_status(
        &self,
        status: &str,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> AppResult<(Vec<BorrowRequestDetails>, i64)> {
        let status: RequestStatus = status.parse().map_err(AppError::Validation)?;
        self.repository
            .requests
            .list_by_status(status, page, per_page)
            .await
    }

    /// Pending requests, oldest first
    pub async fn list_pending(
        &self,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> AppResult<(Vec<BorrowRequestDetails>, i64)> {
        self.repository.requests.list_pending(page, per_page).await
    }
}
