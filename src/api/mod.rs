//! API handlers for the circulation REST endpoints

pub mod books;
pub mod health;
pub mod issues;
pub mod openapi;
pub mod requests;
pub mod stats;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// List of items
    pub items: Vec<T>,
    /// Total number of items
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Items per page
    pub per_page: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Reports the same clamped page/per_page the repositories queried with,
    /// not the caller's raw values.
    pub fn new(items: Vec<T>, total: i64, page: Option<i64>, per_page: Option<i64>) -> Self {
        let (per_page, offset) = crate::repository::books::page_bounds(page, per_page);
        Self {
            items,
            total,
            page: offset / per_page + 1,
            per_page,
        }
    }
}

/// Extractor for the authenticated principal from the JWT token.
/// Tokens are minted by the external identity service.
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Get the Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        // Check for Bearer token
        if !auth_header.starts_with("Bearer ") {
            return Err(AppError::Authentication(
                "Invalid authorization header format".to_string(),
            ));
        }

        let token = &auth_header[7..];

        // Validate JWT token using the secret from configuration
        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::PaginatedResponse;
    use crate::error::ErrorResponse;

    #[test]
    fn paginated_response_reports_clamped_values() {
        let page = PaginatedResponse::<ErrorResponse>::new(Vec::new(), 0, Some(3), Some(10));
        assert_eq!(page.page, 3);
        assert_eq!(page.per_page, 10);

        // oversized per_page is clamped to the repository maximum
        let page = PaginatedResponse::<ErrorResponse>::new(Vec::new(), 0, Some(1), Some(1000));
        assert_eq!(page.per_page, 100);

        // garbage values fall back to the first page
        let page = PaginatedResponse::<ErrorResponse>::new(Vec::new(), 0, Some(0), Some(0));
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 1);

        let page = PaginatedResponse::<ErrorResponse>::new(Vec::new(), 0, None, None);
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 20);
    }
}
