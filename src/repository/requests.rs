//! Borrow requests repository.
//!
//! Decisions and cancellations run inside a transaction holding a row lock
//! on the request, so a terminal state can never be left twice.

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::request::{
        BorrowRequest, BorrowRequestDetails, RequestAction, RequestStatus,
    },
};

use super::books::page_bounds;

const DETAILS_SELECT: &str = r#"
    SELECT r.id, r.student_id, r.book_id,
           b.title AS book_title, b.isbn AS book_isbn,
           r.requested_at, r.status, r.decided_by, r.decided_at, r.remarks
    FROM book_requests r
    LEFT JOIN books b ON b.id = r.book_id
"#;

#[derive(Clone)]
pub struct RequestsRepository {
    pool: Pool<Postgres>,
}

impl RequestsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get request by ID with book details
    pub async fn get_by_id(&self, id: i64) -> AppResult<BorrowRequestDetails> {
        sqlx::query_as::<_, BorrowRequestDetails>(&format!("{} WHERE r.id = $1", DETAILS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::RequestNotFound(format!("Book request with id {} not found", id))
            })
    }

    /// Whether the student already holds a PENDING request for this book
    pub async fn has_pending(&self, student_id: i64, book_id: i64) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM book_requests
                WHERE student_id = $1 AND book_id = $2 AND status = 'PENDING'
            )
            "#,
        )
        .bind(student_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create a PENDING request
    pub async fn create(
        &self,
        student_id: i64,
        book_id: i64,
        remarks: Option<&str>,
    ) -> AppResult<BorrowRequestDetails> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO book_requests (student_id, book_id, status, remarks)
            VALUES ($1, $2, 'PENDING', $3)
            RETURNING id
            "#,
        )
        .bind(student_id)
        .bind(book_id)
        .bind(remarks)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Partial unique index on (student_id, book_id) WHERE PENDING,
            // in case of a concurrent insert racing the has_pending check
            if let sqlx::Error::Database(db) = &e {
                if db.code().as_deref() == Some("23505") {
                    return AppError::Conflict(
                        "You already have a pending request for this book".to_string(),
                    );
                }
            }
            AppError::Database(e)
        })?;

        self.get_by_id(id).await
    }

    /// Apply a librarian decision to a PENDING request.
    ///
    /// The request row is locked for the duration so the stock check (for
    /// APPROVE) and the transition commit together. Approving records the
    /// decision only - it neither decrements stock nor creates a ledger row.
    pub async fn decide(
        &self,
        request_id: i64,
        action: RequestAction,
        librarian_id: i64,
        remarks: Option<&str>,
    ) -> AppResult<BorrowRequestDetails> {
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, BorrowRequest>(
            "SELECT * FROM book_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::RequestNotFound(format!("Book request with id {} not found", request_id))
        })?;

        if request.status != RequestStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Only pending requests can be processed (current status: {})",
                request.status
            )));
        }

        let status = match action {
            RequestAction::Approve => {
                // Advisory check at decision time; the copy is not reserved
                let available: Option<i32> =
                    sqlx::query_scalar("SELECT available_copies FROM books WHERE id = $1")
                        .bind(request.book_id)
                        .fetch_optional(&mut *tx)
                        .await?;

                if available.unwrap_or(0) <= 0 {
                    return Err(AppError::NoStock(
                        "No copies available to approve this request".to_string(),
                    ));
                }
                RequestStatus::Approved
            }
            RequestAction::Reject => RequestStatus::Rejected,
        };

        sqlx::query(
            r#"
            UPDATE book_requests
            SET status = $1, decided_by = $2, decided_at = now(),
                remarks = COALESCE($3, remarks), updated_at = now()
            WHERE id = $4
            "#,
        )
        .bind(status)
        .bind(librarian_id)
        .bind(remarks)
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_by_id(request_id).await
    }

    /// Cancel a PENDING request; only the requester may cancel
    pub async fn cancel(&self, request_id: i64, student_id: i64) -> AppResult<BorrowRequestDetails> {
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, BorrowRequest>(
            "SELECT * FROM book_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::RequestNotFound(format!("Book request with id {} not found", request_id))
        })?;

        if request.student_id != student_id {
            return Err(AppError::Authorization(
                "You can only cancel your own requests".to_string(),
            ));
        }

        if request.status != RequestStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Only pending requests can be cancelled (current status: {})",
                request.status
            )));
        }

        sqlx::query(
            "UPDATE book_requests SET status = 'CANCELLED', updated_at = now() WHERE id = $1",
        )
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_by_id(request_id).await
    }

    /// Requests made by a student, newest first
    pub async fn list_by_student(
        &self,
        student_id: i64,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> AppResult<(Vec<BorrowRequestDetails>, i64)> {
        let (limit, offset) = page_bounds(page, per_page);

        let requests = sqlx::query_as::<_, BorrowRequestDetails>(&format!(
            "{} WHERE r.student_id = $1 ORDER BY r.requested_at DESC LIMIT $2 OFFSET $3",
            DETAILS_SELECT
        ))
        .bind(student_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM book_requests WHERE student_id = $1")
                .bind(student_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((requests, total))
    }

    /// Requests in a given status
    pub async fn list_by_status(
        &self,
        status: RequestStatus,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> AppResult<(Vec<BorrowRequestDetails>, i64)> {
        let (limit, offset) = page_bounds(page, per_page);

        let requests = sqlx::query_as::<_, BorrowRequestDetails>(&format!(
            "{} WHERE r.status = $1 ORDER BY r.requested_at DESC LIMIT $2 OFFSET $3",
            DETAILS_SELECT
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_requests WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        Ok((requests, total))
    }

    /// Pending requests, oldest first for FIFO servicing at the desk
    pub async fn list_pending(
        &self,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> AppResult<(Vec<BorrowRequestDetails>, i64)> {
        let (limit, offset) = page_bounds(page, per_page);

        let requests = sqlx::query_as::<_, BorrowRequestDetails>(&format!(
            "{} WHERE r.status = 'PENDING' ORDER BY r.requested_at ASC LIMIT $1 OFFSET $2",
            DETAILS_SELECT
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM book_requests WHERE status = 'PENDING'")
                .fetch_one(&self.pool)
                .await?;

        Ok((requests, total))
    }

    /// Count pending requests
    pub async fn count_pending(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM book_requests WHERE status = 'PENDING'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
