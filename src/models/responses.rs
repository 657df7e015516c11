use serde::{Deserialize, Serialize};
use crate::models::domain::{NearbyCandidate, StoredLocation};

/// Response for the nearby endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyResponse {
    pub count: usize,
    pub users: Vec<NearbyCandidate>,
}

impl From<Vec<NearbyCandidate>> for NearbyResponse {
    fn from(users: Vec<NearbyCandidate>) -> Self {
        Self {
            count: users.len(),
            users,
        }
    }
}

/// Response for the location update endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateLocationResponse {
    pub message: String,
    pub location: StoredLocation,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
