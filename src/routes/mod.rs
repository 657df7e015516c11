// Route exports
pub mod nearby;

use actix_web::{error, web, HttpRequest};

use crate::error::ProximityError;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(nearby::configure),
    );
}

/// Malformed JSON bodies become `InvalidLocation`; the only body we accept is a location
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    ProximityError::InvalidLocation(format!("Invalid JSON: {}", err)).into()
}

/// Unparseable query strings become `InvalidFilter`
pub fn handle_query_payload_error(err: error::QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("Query payload error on {}: {}", req.path(), err);
    ProximityError::InvalidFilter(format!("Invalid query: {}", err)).into()
}
