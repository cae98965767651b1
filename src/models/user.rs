//! Principal (external identity) model and JWT claims.
//!
//! Identity and role management live in the main administration backend;
//! this service only reads `{id, role}` and never mutates a user row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::AppError;

/// Roles issued by the identity service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Student,
    Faculty,
    Librarian,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Faculty => "FACULTY",
            Role::Librarian => "LIBRARIAN",
            Role::Admin => "ADMIN",
        }
    }

    /// Whether this role may receive a physical issue
    pub fn is_borrower(&self) -> bool {
        matches!(self, Role::Student | Role::Faculty)
    }

    /// Whether this role may operate the desk (decide requests, issue, return)
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Librarian | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "STUDENT" => Ok(Role::Student),
            "FACULTY" => Ok(Role::Faculty),
            "LIBRARIAN" => Ok(Role::Librarian),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// The users table stores roles as text
impl sqlx::Type<sqlx::Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl sqlx::Encode<'_, sqlx::Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

/// Read-only view of a users row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Principal {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// JWT claims minted by the identity service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i64,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token (used by the identity service and by tests)
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and validate a JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    // Authorization checks

    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Librarian or admin role required".to_string(),
            ))
        }
    }

    /// Staff may act on anyone; everyone else only on themselves
    pub fn require_self_or_staff(&self, user_id: i64) -> Result<(), AppError> {
        if self.role.is_staff() || self.user_id == user_id {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Cannot act on behalf of another user".to_string(),
            ))
        }
    }

    pub fn require_student(&self) -> Result<(), AppError> {
        if self.role == Role::Student {
            Ok(())
        } else {
            Err(AppError::Authorization("Student role required".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(role: Role) -> UserClaims {
        let now = Utc::now();
        UserClaims {
            sub: "42".to_string(),
            user_id: 42,
            role,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        }
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("student".parse::<Role>().unwrap(), Role::Student);
        assert_eq!("Faculty".parse::<Role>().unwrap(), Role::Faculty);
        assert_eq!("LIBRARIAN".parse::<Role>().unwrap(), Role::Librarian);
        assert!("teacher".parse::<Role>().is_err());
    }

    #[test]
    fn borrower_eligibility_set() {
        assert!(Role::Student.is_borrower());
        assert!(Role::Faculty.is_borrower());
        assert!(!Role::Librarian.is_borrower());
        assert!(!Role::Admin.is_borrower());
    }

    #[test]
    fn token_round_trip() {
        let c = claims(Role::Librarian);
        let token = c.create_token("test-secret").unwrap();
        let parsed = UserClaims::from_token(&token, "test-secret").unwrap();
        assert_eq!(parsed.user_id, 42);
        assert_eq!(parsed.role, Role::Librarian);
    }

    #[test]
    fn token_rejects_wrong_secret() {
        let token = claims(Role::Student).create_token("secret-a").unwrap();
        assert!(UserClaims::from_token(&token, "secret-b").is_err());
    }

    #[test]
    fn self_or_staff_check() {
        assert!(claims(Role::Student).require_self_or_staff(42).is_ok());
        assert!(claims(Role::Student).require_self_or_staff(7).is_err());
        assert!(claims(Role::Admin).require_self_or_staff(7).is_ok());
    }
}
