use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::error::ProximityError;
use crate::models::{GeoPoint, LocationUpdate, StoredLocation, UserProfile, VisibilityPolicy};

/// Where user points live and how they are searched
///
/// Implementations answer radius queries through an index; a full scan of
/// every user is not acceptable.
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Fetch a stored user
    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, ProximityError>;

    /// Overwrite a user's location (last write wins)
    ///
    /// Fails with `InvalidCoordinates` for out-of-range input and
    /// `UserNotFound` for unknown users.
    async fn set_location(
        &self,
        user_id: &str,
        update: LocationUpdate,
    ) -> Result<StoredLocation, ProximityError>;

    /// Users within `radius_km` of `origin`, unordered
    ///
    /// Never returns `exclude_user_id` nor users sitting at the unset sentinel.
    async fn find_within_radius(
        &self,
        origin: &GeoPoint,
        radius_km: f64,
        exclude_user_id: &str,
    ) -> Result<Vec<UserProfile>, ProximityError>;

    /// Whether the backing store is reachable
    async fn health_check(&self) -> bool {
        true
    }
}

/// Read access to users' privacy settings
#[async_trait]
pub trait PrivacyDirectory: Send + Sync {
    /// Policy for a user; defaults when the user never saved settings
    async fn get_policy(&self, user_id: &str) -> Result<VisibilityPolicy, ProximityError>;

    /// Policies for many users at once
    async fn get_policies(
        &self,
        user_ids: &[String],
    ) -> Result<HashMap<String, VisibilityPolicy>, ProximityError> {
        let mut policies = HashMap::with_capacity(user_ids.len());
        for user_id in user_ids {
            policies.insert(user_id.clone(), self.get_policy(user_id).await?);
        }
        Ok(policies)
    }
}

/// Match relationships owned by the matching subsystem
#[async_trait]
pub trait MatchDirectory: Send + Sync {
    /// True when the two users share an accepted match, in either direction
    async fn are_matched(&self, user_a: &str, user_b: &str) -> Result<bool, ProximityError>;

    /// The subset of `candidate_ids` that share an accepted match with `user_id`
    async fn matched_with(
        &self,
        user_id: &str,
        candidate_ids: &[String],
    ) -> Result<HashSet<String>, ProximityError> {
        let mut matched = HashSet::new();
        for candidate_id in candidate_ids {
            if self.are_matched(user_id, candidate_id).await? {
                matched.insert(candidate_id.clone());
            }
        }
        Ok(matched)
    }
}
