//! Circulation ledger repository.
//!
//! `books.available_copies` is the one shared counter in the system and it
//! is only ever touched here, through conditional single-statement UPDATEs
//! inside a transaction. The row lock taken by the UPDATE serializes
//! concurrent issuers; a zero-row update means the guard failed, and the
//! transaction rolls back on drop.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::issue::{due_date, LibraryIssue, LibraryIssueDetails},
};

use super::books::page_bounds;

const DETAILS_SELECT: &str = r#"
    SELECT i.id, i.book_id, b.title AS book_title,
           i.borrower_id, u.email AS borrower_email,
           i.issued_at, i.due_at, i.returned_at, i.fine_amount, i.status
    FROM library_issues i
    LEFT JOIN books b ON b.id = i.book_id
    LEFT JOIN users u ON u.id = i.borrower_id
"#;

fn with_overdue_flag(mut details: LibraryIssueDetails) -> LibraryIssueDetails {
    details.is_overdue =
        details.returned_at.is_none() && details.due_at < Utc::now();
    details
}

#[derive(Clone)]
pub struct IssuesRepository {
    pool: Pool<Postgres>,
}

impl IssuesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get ledger entry by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<LibraryIssueDetails> {
        let details = sqlx::query_as::<_, LibraryIssueDetails>(&format!(
            "{} WHERE i.id = $1",
            DETAILS_SELECT
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::IssueNotFound(format!("Library issue with id {} not found", id)))?;

        Ok(with_overdue_flag(details))
    }

    /// Issue a copy: decrement the book's available count and insert the
    /// ledger row as one indivisible unit. Under concurrent calls racing for
    /// the last copy, exactly one decrement succeeds; the rest observe a
    /// zero-row update and report NoStock.
    pub async fn create(&self, book_id: i64, borrower_id: i64) -> AppResult<LibraryIssue> {
        let mut tx = self.pool.begin().await?;

        let decremented = sqlx::query(
            r#"
            UPDATE books
            SET available_copies = available_copies - 1, updated_at = now()
            WHERE id = $1 AND available_copies > 0
            "#,
        )
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        if decremented.rows_affected() == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
                .bind(book_id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists {
                AppError::NoStock("No copies available for this book".to_string())
            } else {
                AppError::BookNotFound(format!("Book with id {} not found", book_id))
            });
        }

        let now = Utc::now();
        let issue = sqlx::query_as::<_, LibraryIssue>(
            r#"
            INSERT INTO library_issues (book_id, borrower_id, issued_at, due_at, status)
            VALUES ($1, $2, $3, $4, 'ISSUED')
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(borrower_id)
        .bind(now)
        .bind(due_date(now))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            issue_id = issue.id,
            book_id,
            borrower_id,
            due_at = %issue.due_at,
            "copy issued"
        );

        Ok(issue)
    }

    /// Return a copy: flip the entry to RETURNED and increment the book's
    /// available count in one transaction. The status guard on the UPDATE
    /// makes concurrent double-returns lose with AlreadyReturned, so the
    /// counter is incremented exactly once per entry.
    pub async fn return_copy(
        &self,
        issue_id: i64,
        fine_amount: Option<Decimal>,
    ) -> AppResult<LibraryIssue> {
        let mut tx = self.pool.begin().await?;

        // Non-positive fines leave the default 0
        let fine = fine_amount.filter(|f| *f > Decimal::ZERO);

        let returned = sqlx::query_as::<_, LibraryIssue>(
            r#"
            UPDATE library_issues
            SET status = 'RETURNED', returned_at = now(),
                fine_amount = COALESCE($1, fine_amount)
            WHERE id = $2 AND status = 'ISSUED'
            RETURNING *
            "#,
        )
        .bind(fine)
        .bind(issue_id)
        .fetch_optional(&mut *tx)
        .await?;

        let issue = match returned {
            Some(issue) => issue,
            None => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM library_issues WHERE id = $1)")
                        .bind(issue_id)
                        .fetch_one(&mut *tx)
                        .await?;
                return Err(if exists {
                    AppError::AlreadyReturned("Book already returned".to_string())
                } else {
                    AppError::IssueNotFound(format!(
                        "Library issue with id {} not found",
                        issue_id
                    ))
                });
            }
        };

        // The guard keeps a deleted-and-recreated book from overflowing
        // total_copies; for a deleted book the update is a no-op.
        sqlx::query(
            r#"
            UPDATE books
            SET available_copies = available_copies + 1, updated_at = now()
            WHERE id = $1 AND available_copies < total_copies
            "#,
        )
        .bind(issue.book_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            issue_id,
            book_id = issue.book_id,
            fine = %issue.fine_amount,
            "copy returned"
        );

        Ok(issue)
    }

    /// Entries still out past their due date. Derived - status stays ISSUED.
    pub async fn list_overdue(
        &self,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> AppResult<(Vec<LibraryIssueDetails>, i64)> {
        let (limit, offset) = page_bounds(page, per_page);

        let issues = sqlx::query_as::<_, LibraryIssueDetails>(&format!(
            "{} WHERE i.status = 'ISSUED' AND i.due_at < now() ORDER BY i.due_at ASC LIMIT $1 OFFSET $2",
            DETAILS_SELECT
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM library_issues WHERE status = 'ISSUED' AND due_at < now()",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok((issues.into_iter().map(with_overdue_flag).collect(), total))
    }

    /// Ledger entries for a borrower, newest first
    pub async fn list_by_borrower(
        &self,
        borrower_id: i64,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> AppResult<(Vec<LibraryIssueDetails>, i64)> {
        let (limit, offset) = page_bounds(page, per_page);

        let issues = sqlx::query_as::<_, LibraryIssueDetails>(&format!(
            "{} WHERE i.borrower_id = $1 ORDER BY i.issued_at DESC LIMIT $2 OFFSET $3",
            DETAILS_SELECT
        ))
        .bind(borrower_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM library_issues WHERE borrower_id = $1")
                .bind(borrower_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((issues.into_iter().map(with_overdue_flag).collect(), total))
    }

    /// Ledger entries for a book, newest first
    pub async fn list_by_book(
        &self,
        book_id: i64,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> AppResult<(Vec<LibraryIssueDetails>, i64)> {
        let (limit, offset) = page_bounds(page, per_page);

        let issues = sqlx::query_as::<_, LibraryIssueDetails>(&format!(
            "{} WHERE i.book_id = $1 ORDER BY i.issued_at DESC LIMIT $2 OFFSET $3",
            DETAILS_SELECT
        ))
        .bind(book_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM library_issues WHERE book_id = $1")
                .bind(book_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((issues.into_iter().map(with_overdue_flag).collect(), total))
    }

    /// Count active issues
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM library_issues WHERE status = 'ISSUED'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Count overdue issues
    pub async fn count_overdue(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM library_issues WHERE status = 'ISSUED' AND due_at < now()",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
