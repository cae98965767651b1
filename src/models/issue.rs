//! Ledger entry (library issue) model.
//!
//! One row per issue-and-eventual-return cycle for a single physical copy.
//! Rows are never deleted. "Overdue" is never stored - it is derived at
//! query time from `status == ISSUED && due_at < now`.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Fixed loan policy: a copy is due 15 days after issue
pub const LOAN_PERIOD_DAYS: i64 = 15;

/// Compute the due date for a copy issued at `issued_at`
pub fn due_date(issued_at: DateTime<Utc>) -> DateTime<Utc> {
    issued_at + Duration::days(LOAN_PERIOD_DAYS)
}

/// Persisted issue states. OVERDUE is intentionally absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueStatus {
    Issued,
    Returned,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Issued => "ISSUED",
            IssueStatus::Returned => "RETURNED",
        }
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ISSUED" => Ok(IssueStatus::Issued),
            "RETURNED" => Ok(IssueStatus::Returned),
            _ => Err(format!("Invalid issue status: {}", s)),
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for IssueStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for IssueStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl sqlx::Encode<'_, sqlx::Postgres> for IssueStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

/// Ledger entry row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LibraryIssue {
    pub id: i64,
    pub book_id: i64,
    pub borrower_id: i64,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub fine_amount: Decimal,
    pub status: IssueStatus,
}

impl LibraryIssue {
    /// Derived predicate - never persisted
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == IssueStatus::Issued && self.due_at < now
    }
}

/// Ledger entry with embedded book/borrower details for display
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LibraryIssueDetails {
    pub id: i64,
    pub book_id: i64,
    /// Null when the book row was deleted after the issue
    pub book_title: Option<String>,
    pub borrower_id: i64,
    pub borrower_email: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub fine_amount: Decimal,
    pub status: IssueStatus,
    #[sqlx(skip)]
    pub is_overdue: bool,
}

/// Issue a copy payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateIssue {
    pub book_id: i64,
    pub borrower_id: i64,
}

/// Return a copy payload. A missing or non-positive fine leaves the default 0.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReturnCopy {
    pub fine_amount: Option<Decimal>,
}

/// Ledger list parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct IssueQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
