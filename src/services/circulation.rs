//! Circulation ledger service: issuing and returning physical copies.
//!
//! The atomicity of the counter mutations lives in the issues repository;
//! this layer adds the borrower checks and the read paths.

use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::issue::{LibraryIssue, LibraryIssueDetails},
    repository::Repository,
};

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
}

impl CirculationService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Issue a copy to a borrower. Only students and faculty may borrow.
    pub async fn issue(&self, book_id: i64, borrower_id: i64) -> AppResult<LibraryIssue> {
        let borrower = self.repository.users.get_by_id(borrower_id).await?;

        if !borrower.role.is_borrower() {
            return Err(AppError::RoleNotEligible(
                "Books can only be issued to students or faculty members".to_string(),
            ));
        }

        self.repository.issues.create(book_id, borrower_id).await
    }

    /// Return a copy, optionally recording a fine
    pub async fn return_copy(
        &self,
        issue_id: i64,
        fine_amount: Option<Decimal>,
    ) -> AppResult<LibraryIssue> {
        if let Some(fine) = fine_amount {
            if fine < Decimal::ZERO {
                return Err(AppError::Validation(
                    "fine_amount must not be negative".to_string(),
                ));
            }
        }
        self.repository.issues.return_copy(issue_id, fine_amount).await
    }

    /// Get ledger entry by ID
    pub async fn get_issue(&self, id: i64) -> AppResult<LibraryIssueDetails> {
        self.repository.issues.get_by_id(id).await
    }

    /// Entries still out past their due date
    pub async fn list_overdue(
        &self,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> AppResult<(Vec<LibraryIssueDetails>, i64)> {
        self.repository.issues.list_overdue(page, per_page).await
    }

    /// Ledger entries for a borrower
    pub async fn list_by_borrower(
        &self,
        borrower_id: i64,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> AppResult<(Vec<LibraryIssueDetails>, i64)> {
        self.repository.users.get_by_id(borrower_id).await?;
        self.repository
            .issues
            .list_by_borrower(borrower_id, page, per_page)
            .await
    }

    /// Ledger entries for a book
    pub async fn list_by_book(
        &self,
        book_id: i64,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> AppResult<(Vec<LibraryIssueDetails>, i64)> {
        self.repository.books.get_by_id(book_id).await?;
        self.repository
            .issues
            .list_by_book(book_id, page, per_page)
            .await
    }
}
