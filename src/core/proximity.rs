use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{
    assembler::{assemble, DEFAULT_RESULT_CAP},
    filters::{matches_filter, validate_filter},
    visibility::{evaluate, is_visible, VisibilityDecision},
};
use crate::error::ProximityError;
use crate::models::{LocationUpdate, NearbyCandidate, ProximityFilter, StoredLocation, UserProfile};
use crate::services::{LocationStore, MatchDirectory, PrivacyDirectory};

/// Default bound on a single store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// Nearby-user search orchestrator
///
/// # Pipeline Stages
/// 1. Resolve the requester's point
/// 2. Index-backed radius query
/// 3. Age and interest narrowing
/// 4. Privacy gating
/// 5. Distance, ordering, cap
///
/// Holds no mutable state; concurrent searches share nothing but the store
/// handles.
#[derive(Clone)]
pub struct ProximityService {
    store: Arc<dyn LocationStore>,
    privacy: Arc<dyn PrivacyDirectory>,
    matches: Arc<dyn MatchDirectory>,
    result_cap: usize,
    store_timeout: Duration,
}

impl ProximityService {
    pub fn new(
        store: Arc<dyn LocationStore>,
        privacy: Arc<dyn PrivacyDirectory>,
        matches: Arc<dyn MatchDirectory>,
    ) -> Self {
        Self {
            store,
            privacy,
            matches,
            result_cap: DEFAULT_RESULT_CAP,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_result_cap(mut self, result_cap: usize) -> Self {
        self.result_cap = result_cap;
        self
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn LocationStore> {
        &self.store
    }

    /// Find users near the requester, using the configured store timeout
    pub async fn find_nearby(
        &self,
        requester_id: &str,
        filter: &ProximityFilter,
    ) -> Result<Vec<NearbyCandidate>, ProximityError> {
        self.find_nearby_within(requester_id, filter, self.store_timeout)
            .await
    }

    /// Find users near the requester, bounding each store call by `timeout`
    ///
    /// # Errors
    /// - `InvalidFilter` for a non-positive radius or inverted age range
    /// - `LocationNotSet` when the requester is unknown or at the sentinel
    /// - `StoreTimeout` / `Store` when a collaborator fails
    pub async fn find_nearby_within(
        &self,
        requester_id: &str,
        filter: &ProximityFilter,
        timeout: Duration,
    ) -> Result<Vec<NearbyCandidate>, ProximityError> {
        validate_filter(filter)?;

        let requester = bounded(timeout, "get_user", self.store.get_user(requester_id))
            .await?
            .filter(UserProfile::has_location)
            .ok_or(ProximityError::LocationNotSet)?;
        let origin = requester.point();

        // Stage 2: radius query
        let in_radius = bounded(
            timeout,
            "find_within_radius",
            self.store
                .find_within_radius(&origin, filter.max_distance_km, requester_id),
        )
        .await?;
        let total_in_radius = in_radius.len();

        // Stage 3: age and interests
        let narrowed: Vec<UserProfile> = in_radius
            .into_iter()
            .filter(|profile| profile.user_id != requester_id)
            .filter(|profile| matches_filter(profile, filter))
            .collect();
        let total_narrowed = narrowed.len();

        // Stage 4: privacy
        let visible = self
            .apply_visibility(requester_id, narrowed, timeout)
            .await?;

        tracing::debug!(
            "Nearby pipeline for {}: {} in radius, {} after filters, {} visible",
            requester_id,
            total_in_radius,
            total_narrowed,
            visible.len()
        );

        // Stage 5: distance, order, cap
        assemble(&origin, visible, self.result_cap)
    }

    async fn apply_visibility(
        &self,
        requester_id: &str,
        candidates: Vec<UserProfile>,
        timeout: Duration,
    ) -> Result<Vec<UserProfile>, ProximityError> {
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let ids: Vec<String> = candidates.iter().map(|c| c.user_id.clone()).collect();
        let policies = bounded(timeout, "get_policies", self.privacy.get_policies(&ids)).await?;

        let decisions: Vec<VisibilityDecision> = candidates
            .iter()
            .map(|candidate| evaluate(&policies.get(&candidate.user_id).copied().unwrap_or_default()))
            .collect();

        // One lookup for every friends-only candidate
        let needs_match: Vec<String> = candidates
            .iter()
            .zip(&decisions)
            .filter(|(_, decision)| **decision == VisibilityDecision::RequiresMatch)
            .map(|(candidate, _)| candidate.user_id.clone())
            .collect();
        let matched = if needs_match.is_empty() {
            HashSet::new()
        } else {
            bounded(
                timeout,
                "matched_with",
                self.matches.matched_with(requester_id, &needs_match),
            )
            .await?
        };

        Ok(candidates
            .into_iter()
            .zip(decisions)
            .filter(|(candidate, decision)| is_visible(*decision, matched.contains(&candidate.user_id)))
            .map(|(candidate, _)| candidate)
            .collect())
    }

    /// Validate and store a user's new location (last write wins)
    pub async fn update_location(
        &self,
        user_id: &str,
        update: LocationUpdate,
    ) -> Result<StoredLocation, ProximityError> {
        let location = bounded(
            self.store_timeout,
            "set_location",
            self.store.set_location(user_id, update),
        )
        .await?;

        tracing::info!(
            "Updated location for {} to [{}, {}]",
            user_id,
            location.coordinates[0],
            location.coordinates[1]
        );

        Ok(location)
    }
}

/// Run a store call, surfacing expiry as `StoreTimeout`
async fn bounded<T, F>(timeout: Duration, operation: &'static str, call: F) -> Result<T, ProximityError>
where
    F: Future<Output = Result<T, ProximityError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("Store call {} exceeded {:?}", operation, timeout);
            Err(ProximityError::StoreTimeout(operation))
        }
    }
}
