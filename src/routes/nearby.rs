use actix_web::{web, HttpResponse, Responder};
use tracing::Instrument;

use crate::auth::AuthenticatedUser;
use crate::core::ProximityService;
use crate::error::ProximityError;
use crate::models::{
    HealthResponse, NearbyQuery, NearbyResponse, UpdateLocationRequest, UpdateLocationResponse,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: ProximityService,
    pub default_max_distance_km: f64,
}

/// Configure all proximity routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/nearby", web::get().to(find_nearby))
        .route("/update-location", web::post().to(update_location));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.service.store().health_check().await;

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Find nearby users
///
/// GET /api/v1/nearby?maxDistance=50&minAge=21&maxAge=35&interests=hiking,chess
///
/// Response body:
/// ```json
/// { "count": 1, "users": [{ "id": "...", "username": "...", "distance": 1.23 }] }
/// ```
async fn find_nearby(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<NearbyQuery>,
) -> Result<HttpResponse, ProximityError> {
    let span = tracing::info_span!("find_nearby", request_id = %uuid::Uuid::new_v4(), user_id = %user.id);

    async move {
        let filter = query.into_inner().into_filter(state.default_max_distance_km);

        tracing::info!(
            "Finding users within {}km (age {:?}-{:?}, {} interests)",
            filter.max_distance_km,
            filter.min_age,
            filter.max_age,
            filter.interests.len()
        );

        let users = state.service.find_nearby(&user.id, &filter).await?;

        tracing::info!("Returning {} nearby users", users.len());

        Ok(HttpResponse::Ok().json(NearbyResponse::from(users)))
    }
    .instrument(span)
    .await
}

/// Update the caller's location
///
/// POST /api/v1/update-location
///
/// Request body:
/// ```json
/// { "longitude": 28.9784, "latitude": 41.0082, "city": "Istanbul", "country": "TR" }
/// ```
async fn update_location(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<UpdateLocationRequest>,
) -> Result<HttpResponse, ProximityError> {
    let span = tracing::info_span!("update_location", request_id = %uuid::Uuid::new_v4(), user_id = %user.id);

    async move {
        let update = req.into_inner().into_update()?;
        let location = state.service.update_location(&user.id, update).await?;

        Ok(HttpResponse::Ok().json(UpdateLocationResponse {
            message: "Location updated successfully".to_string(),
            location,
        }))
    }
    .instrument(span)
    .await
}
