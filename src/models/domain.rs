use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ProximityError;

pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;
pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;

/// A point on the globe, longitude first
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    /// The "location not set" sentinel
    pub const UNSET: GeoPoint = GeoPoint { longitude: 0.0, latitude: 0.0 };

    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }

    /// Build a point, rejecting non-finite or out-of-range coordinates
    pub fn checked(longitude: f64, latitude: f64) -> Result<Self, ProximityError> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(ProximityError::InvalidCoordinates(
                "coordinates must be finite numbers".to_string(),
            ));
        }
        if !(MIN_LONGITUDE..=MAX_LONGITUDE).contains(&longitude) {
            return Err(ProximityError::InvalidCoordinates(format!(
                "longitude {} outside [-180, 180]",
                longitude
            )));
        }
        if !(MIN_LATITUDE..=MAX_LATITUDE).contains(&latitude) {
            return Err(ProximityError::InvalidCoordinates(format!(
                "latitude {} outside [-90, 90]",
                latitude
            )));
        }
        Ok(Self { longitude, latitude })
    }

    pub fn is_unset(&self) -> bool {
        self.longitude == 0.0 && self.latitude == 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.longitude.is_finite() && self.latitude.is_finite()
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(point: GeoPoint) -> Self {
        geo::Point::new(point.longitude, point.latitude)
    }
}

impl From<geo::Point<f64>> for GeoPoint {
    fn from(point: geo::Point<f64>) -> Self {
        GeoPoint::new(point.x(), point.y())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PointKind {
    #[default]
    Point,
}

/// Persisted location shape: `{type: "Point", coordinates: [lon, lat], city, country}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLocation {
    #[serde(rename = "type", default)]
    pub kind: PointKind,
    pub coordinates: [f64; 2],
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
}

impl StoredLocation {
    pub fn new(point: GeoPoint, city: String, country: String) -> Self {
        Self {
            kind: PointKind::Point,
            coordinates: [point.longitude, point.latitude],
            city,
            country,
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.coordinates[0], self.coordinates[1])
    }

    pub fn is_set(&self) -> bool {
        !self.point().is_unset()
    }
}

impl Default for StoredLocation {
    fn default() -> Self {
        Self::new(GeoPoint::UNSET, String::new(), String::new())
    }
}

/// A location write; city and country default to empty
#[derive(Debug, Clone, PartialEq)]
pub struct LocationUpdate {
    pub longitude: f64,
    pub latitude: f64,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl LocationUpdate {
    /// Validate the coordinates and build the stored shape
    pub fn into_stored(self) -> Result<StoredLocation, ProximityError> {
        let point = GeoPoint::checked(self.longitude, self.latitude)?;
        Ok(StoredLocation::new(
            point,
            self.city.unwrap_or_default(),
            self.country.unwrap_or_default(),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

/// A user as stored, including account secrets
///
/// Deliberately not `Serialize`: profiles leave the service only as
/// [`PublicProfile`].
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub age: Option<u8>,
    pub gender: Option<Gender>,
    pub interests: Vec<String>,
    pub bio: String,
    pub profile_picture: String,
    pub is_email_verified: bool,
    pub location: StoredLocation,
    pub password_hash: Option<String>,
    pub email_verification_token: Option<String>,
    pub password_reset_token: Option<String>,
    pub two_factor_secret: Option<String>,
    pub two_factor_backup_codes: Vec<String>,
}

impl UserProfile {
    /// A profile with no location and no secrets
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            email: String::new(),
            age: None,
            gender: None,
            interests: Vec::new(),
            bio: String::new(),
            profile_picture: String::new(),
            is_email_verified: false,
            location: StoredLocation::default(),
            password_hash: None,
            email_verification_token: None,
            password_reset_token: None,
            two_factor_secret: None,
            two_factor_backup_codes: Vec::new(),
        }
    }

    pub fn point(&self) -> GeoPoint {
        self.location.point()
    }

    pub fn has_location(&self) -> bool {
        self.location.is_set()
    }
}

/// What other users may see of a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: String,
    pub username: String,
    pub age: Option<u8>,
    pub gender: Option<Gender>,
    pub interests: Vec<String>,
    pub bio: String,
    #[serde(rename = "profilePicture")]
    pub profile_picture: String,
    #[serde(rename = "isEmailVerified")]
    pub is_email_verified: bool,
    pub location: StoredLocation,
}

impl From<UserProfile> for PublicProfile {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.user_id,
            username: profile.username,
            age: profile.age,
            gender: profile.gender,
            interests: profile.interests,
            bio: profile.bio,
            profile_picture: profile.profile_picture,
            is_email_verified: profile.is_email_verified,
            location: profile.location,
        }
    }
}

/// Per-request search constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityFilter {
    pub max_distance_km: f64,
    pub min_age: Option<u8>,
    pub max_age: Option<u8>,
    pub interests: HashSet<String>,
}

pub const DEFAULT_MAX_DISTANCE_KM: f64 = 50.0;

impl Default for ProximityFilter {
    fn default() -> Self {
        Self {
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            min_age: None,
            max_age: None,
            interests: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Friends,
}

impl Visibility {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "public" => Some(Visibility::Public),
            "private" => Some(Visibility::Private),
            "friends" => Some(Visibility::Friends),
            _ => None,
        }
    }
}

/// The privacy settings the proximity search honours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityPolicy {
    #[serde(default = "default_searchable")]
    pub searchable: bool,
    #[serde(rename = "locationVisibility", default)]
    pub location_visibility: Visibility,
    #[serde(rename = "profileVisibility", default)]
    pub profile_visibility: Visibility,
}

fn default_searchable() -> bool {
    true
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self {
            searchable: true,
            location_visibility: Visibility::Public,
            profile_visibility: Visibility::Public,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A nearby user with their distance from the requester
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyCandidate {
    #[serde(flatten)]
    pub profile: PublicProfile,
    #[serde(rename = "distance")]
    pub distance_km: f64,
}

/// Geospatial bounding box in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_point_ranges() {
        assert!(GeoPoint::checked(180.0, 90.0).is_ok());
        assert!(GeoPoint::checked(-180.0, -90.0).is_ok());
        assert!(matches!(
            GeoPoint::checked(180.5, 0.0),
            Err(ProximityError::InvalidCoordinates(_))
        ));
        assert!(matches!(
            GeoPoint::checked(0.0, -91.0),
            Err(ProximityError::InvalidCoordinates(_))
        ));
        assert!(matches!(
            GeoPoint::checked(f64::NAN, 0.0),
            Err(ProximityError::InvalidCoordinates(_))
        ));
    }

    #[test]
    fn test_stored_location_is_longitude_first() {
        let location = StoredLocation::new(
            GeoPoint::new(28.9784, 41.0082),
            "Istanbul".to_string(),
            "TR".to_string(),
        );
        let json = serde_json::to_value(&location).unwrap();

        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"][0], 28.9784);
        assert_eq!(json["coordinates"][1], 41.0082);
        assert_eq!(location.point().longitude, 28.9784);
    }

    #[test]
    fn test_default_location_is_unset() {
        let location = StoredLocation::default();
        assert!(!location.is_set());
        assert_eq!(location.city, "");
        assert_eq!(location.country, "");
    }

    #[test]
    fn test_location_update_defaults_city_and_country() {
        let update = LocationUpdate {
            longitude: 32.8597,
            latitude: 39.9334,
            city: None,
            country: Some("TR".to_string()),
        };
        let stored = update.into_stored().unwrap();
        assert_eq!(stored.city, "");
        assert_eq!(stored.country, "TR");
    }

    #[test]
    fn test_public_profile_has_no_secrets() {
        let mut profile = UserProfile::new("u1", "alice");
        profile.password_hash = Some("hash".to_string());
        profile.two_factor_secret = Some("totp".to_string());
        profile.email_verification_token = Some("verify".to_string());

        let json = serde_json::to_string(&PublicProfile::from(profile)).unwrap();
        assert!(!json.contains("hash"));
        assert!(!json.contains("totp"));
        assert!(!json.contains("verify"));
    }

    #[test]
    fn test_default_policy() {
        let policy = VisibilityPolicy::default();
        assert!(policy.searchable);
        assert_eq!(policy.location_visibility, Visibility::Public);
    }

    #[test]
    fn test_geo_point_conversion() {
        let point: geo::Point<f64> = GeoPoint::new(-74.0060, 40.7128).into();
        assert_eq!(point.x(), -74.0060);
        assert_eq!(point.y(), 40.7128);
    }
}
