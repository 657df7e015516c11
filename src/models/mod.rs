// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BoundingBox, GeoPoint, Gender, LocationUpdate, MatchStatus, NearbyCandidate, ProximityFilter,
    PublicProfile, StoredLocation, UserProfile, Visibility, VisibilityPolicy,
    DEFAULT_MAX_DISTANCE_KM,
};
pub use requests::{NearbyQuery, UpdateLocationRequest};
pub use responses::{ErrorResponse, HealthResponse, NearbyResponse, UpdateLocationResponse};
