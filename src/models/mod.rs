//! Data models for the circulation service

pub mod book;
pub mod issue;
pub mod request;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookQuery, CreateBook};
pub use issue::{IssueStatus, LibraryIssue, LibraryIssueDetails};
pub use request::{BorrowRequest, BorrowRequestDetails, RequestAction, RequestStatus};
pub use user::{Principal, Role, UserClaims};
