//! Borrow request model and workflow state machine.
//!
//! A student asks for a book; a librarian approves or rejects; the student
//! may cancel while still pending. Approving a request does NOT issue a copy
//! or touch stock - issuing is a separate desk action (see the ledger).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Request workflow states. PENDING is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(RequestStatus::Pending),
            "APPROVED" => Ok(RequestStatus::Approved),
            "REJECTED" => Ok(RequestStatus::Rejected),
            "CANCELLED" => Ok(RequestStatus::Cancelled),
            _ => Err(format!("Invalid request status: {}", s)),
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for RequestStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for RequestStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl sqlx::Encode<'_, sqlx::Postgres> for RequestStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

/// Decision taken by a librarian on a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestAction {
    Approve,
    Reject,
}

impl std::str::FromStr for RequestAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "APPROVE" => Ok(RequestAction::Approve),
            "REJECT" => Ok(RequestAction::Reject),
            _ => Err(format!("Invalid action: {}. Use APPROVE or REJECT", s)),
        }
    }
}

/// Borrow request row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BorrowRequest {
    pub id: i64,
    pub student_id: i64,
    pub book_id: i64,
    pub requested_at: DateTime<Utc>,
    pub status: RequestStatus,
    pub decided_by: Option<i64>,
    pub decided_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Borrow request with embedded book details for display
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRequestDetails {
    pub id: i64,
    pub student_id: i64,
    pub book_id: i64,
    /// Null when the book row was deleted after the request
    pub book_title: Option<String>,
    pub book_isbn: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub status: RequestStatus,
    pub decided_by: Option<i64>,
    pub decided_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
}

/// Create borrow request payload
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRequest {
    pub book_id: i64,
    #[validate(length(max = 2000, message = "remarks too long"))]
    pub remarks: Option<String>,
}

/// Librarian decision payload. `action` is matched case-insensitively.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DecideRequest {
    pub action: String,
    pub remarks: Option<String>,
}

/// Request list filters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct RequestQuery {
    /// Filter by status (case-insensitive)
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for s in ["PENDING", "APPROVED", "REJECTED", "CANCELLED"] {
            assert_eq!(s.parse::<RequestStatus>().unwrap().as_str(), s);
        }
        assert_eq!("pending".parse::<RequestStatus>().unwrap(), RequestStatus::Pending);
        assert!("ISSUED".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
        assert!(RequestStatus::Cancelled.is_terminal());
    }

    #[test]
    fn action_parsing() {
        assert_eq!("approve".parse::<RequestAction>().unwrap(), RequestAction::Approve);
        assert_eq!("REJECT".parse::<RequestAction>().unwrap(), RequestAction::Reject);
        assert!("issue".parse::<RequestAction>().is_err());
    }
}
