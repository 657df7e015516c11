//! Nearby Match - proximity search for a dating app
//!
//! Finds users within a radius of the requester, narrows them by age and
//! interests, hides anyone whose privacy settings forbid it, and returns the
//! rest sorted by great-circle distance with account secrets stripped.

pub mod auth;
pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{calculate_distance, ProximityService};
pub use error::{ProximityError, StoreError};
pub use models::{GeoPoint, NearbyCandidate, ProximityFilter, UserProfile, VisibilityPolicy};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let istanbul = GeoPoint::new(28.9784, 41.0082);
        let distance = calculate_distance(Some(&istanbul), Some(&istanbul)).unwrap();
        assert_eq!(distance, 0.0);
    }
}
