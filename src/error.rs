use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Errors surfaced by the proximity subsystem
///
/// Every variant maps to a stable error code and HTTP status. Store failures
/// are never folded into an empty result set.
#[derive(Debug, Error)]
pub enum ProximityError {
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("User location not set. Please update your profile location.")]
    LocationNotSet,

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Store call timed out: {0}")]
    StoreTimeout(&'static str),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Failures raised by a store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Seed file error: {0}")]
    SeedIo(#[from] std::io::Error),

    #[error("Seed file format error: {0}")]
    SeedFormat(#[from] serde_json::Error),
}

impl ProximityError {
    /// Stable machine-readable code used in error bodies
    pub fn code(&self) -> &'static str {
        match self {
            ProximityError::InvalidLocation(_) => "invalid_location",
            ProximityError::InvalidCoordinates(_) => "invalid_coordinates",
            ProximityError::LocationNotSet => "location_not_set",
            ProximityError::InvalidFilter(_) => "invalid_filter",
            ProximityError::UserNotFound(_) => "user_not_found",
            ProximityError::Unauthorized(_) => "unauthorized",
            ProximityError::StoreTimeout(_) => "store_timeout",
            ProximityError::Store(_) => "store_error",
        }
    }

    /// Whether the caller can fix the request and try again
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl ResponseError for ProximityError {
    fn status_code(&self) -> StatusCode {
        match self {
            ProximityError::InvalidLocation(_)
            | ProximityError::InvalidCoordinates(_)
            | ProximityError::LocationNotSet
            | ProximityError::InvalidFilter(_) => StatusCode::BAD_REQUEST,
            ProximityError::UserNotFound(_) => StatusCode::NOT_FOUND,
            ProximityError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ProximityError::StoreTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProximityError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if self.is_client_error() {
            tracing::debug!("Rejected request ({}): {}", self.code(), self);
        } else {
            tracing::error!("{}", self);
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ProximityError::LocationNotSet.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ProximityError::InvalidFilter("minAge > maxAge".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ProximityError::StoreTimeout("find_within_radius").status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ProximityError::Store(StoreError::Poisoned).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ProximityError::Unauthorized("no token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_client_errors() {
        assert!(ProximityError::InvalidCoordinates("lat".into()).is_client_error());
        assert!(!ProximityError::StoreTimeout("get_user").is_client_error());
    }

    #[actix_web::test]
    async fn test_error_response_body() {
        for (err, status) in [
            (ProximityError::LocationNotSet, 400u16),
            (ProximityError::StoreTimeout("get_policies"), 503u16),
        ] {
            let code = err.code();
            let resp = err.error_response();
            assert_eq!(resp.status().as_u16(), status);

            let bytes = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
            let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body.error, code);
            assert_eq!(body.status_code, status);
        }
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ProximityError::LocationNotSet.code(), "location_not_set");
        assert_eq!(ProximityError::Store(StoreError::Poisoned).code(), "store_error");
    }
}
