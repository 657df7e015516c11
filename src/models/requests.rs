use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

use crate::error::ProximityError;
use crate::models::domain::{LocationUpdate, ProximityFilter};

/// Query string of `GET /nearby`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NearbyQuery {
    #[serde(rename = "maxDistance")]
    pub max_distance: Option<f64>,
    #[serde(rename = "minAge")]
    pub min_age: Option<u8>,
    #[serde(rename = "maxAge")]
    pub max_age: Option<u8>,
    /// Comma-separated interest tags
    pub interests: Option<String>,
}

impl NearbyQuery {
    /// Build the filter, falling back to the configured default radius
    pub fn into_filter(self, default_max_distance_km: f64) -> ProximityFilter {
        let interests: HashSet<String> = self
            .interests
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();

        ProximityFilter {
            max_distance_km: self.max_distance.unwrap_or(default_max_distance_km),
            min_age: self.min_age,
            max_age: self.max_age,
            interests,
        }
    }
}

/// Body of `POST /update-location`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateLocationRequest {
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(length(max = 120))]
    pub city: Option<String>,
    #[validate(length(max = 120))]
    pub country: Option<String>,
}

impl UpdateLocationRequest {
    pub fn into_update(self) -> Result<LocationUpdate, ProximityError> {
        let (Some(longitude), Some(latitude)) = (self.longitude, self.latitude) else {
            return Err(ProximityError::InvalidCoordinates(
                "Longitude and latitude are required".to_string(),
            ));
        };

        self.validate()
            .map_err(|errors| ProximityError::InvalidCoordinates(errors.to_string()))?;

        Ok(LocationUpdate {
            longitude,
            latitude,
            city: self.city,
            country: self.country,
        })
    }
}
