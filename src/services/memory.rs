//! In-process store backed by an R-tree.
//!
//! Points are indexed as unit vectors on the sphere. Straight-line (chord)
//! distance between unit vectors grows monotonically with great-circle
//! distance, so a Euclidean radius query in 3D returns exactly the users
//! inside the search circle, with no special cases at the poles or the
//! antimeridian. Each hit is then confirmed with the law-of-cosines distance.
//!
//! Cost: `O(log n + k)` per radius query, `O(log n)` per location update.

use async_trait::async_trait;
use geo::Point;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::distance::{great_circle_km, KM_PER_DEGREE};
use crate::error::{ProximityError, StoreError};
use crate::models::{
    GeoPoint, LocationUpdate, MatchStatus, StoredLocation, UserProfile, VisibilityPolicy,
};
use crate::services::location_store::{LocationStore, MatchDirectory, PrivacyDirectory};

/// Slack on the chord radius; the exact distance check follows
const CHORD_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
struct IndexedUser {
    user_id: String,
    point: Point<f64>,
    position: [f64; 3],
}

impl IndexedUser {
    fn new(user_id: String, point: GeoPoint) -> Self {
        Self {
            user_id,
            position: unit_vector(&point),
            point: point.into(),
        }
    }
}

impl RTreeObject for IndexedUser {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for IndexedUser {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        let dz = self.position[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

fn unit_vector(point: &GeoPoint) -> [f64; 3] {
    let lat = point.latitude.to_radians();
    let lon = point.longitude.to_radians();
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

/// Squared chord length of the search circle on the unit sphere
fn squared_chord(radius_km: f64) -> f64 {
    let angle = (radius_km / KM_PER_DEGREE).to_radians().min(std::f64::consts::PI);
    let chord = 2.0 * (angle / 2.0).sin();
    chord * chord + CHORD_EPSILON
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, UserProfile>,
    index: RTree<IndexedUser>,
}

impl Inner {
    fn unindex(&mut self, user_id: &str) {
        let Some(existing) = self.users.get(user_id) else {
            return;
        };
        if existing.has_location() {
            let node = IndexedUser::new(user_id.to_string(), existing.point());
            self.index.remove(&node);
        }
    }

    fn index(&mut self, profile: &UserProfile) {
        if profile.has_location() {
            self.index
                .insert(IndexedUser::new(profile.user_id.clone(), profile.point()));
        }
    }
}

/// Location store kept entirely in memory
///
/// Users at the `(0,0)` sentinel are kept in the profile map but never indexed,
/// so they cannot show up as candidates.
#[derive(Default)]
pub struct InMemoryLocationStore {
    inner: RwLock<Inner>,
}

impl InMemoryLocationStore {
    /// Build a store from many users at once using R-tree bulk loading
    pub fn with_users(users: impl IntoIterator<Item = UserProfile>) -> Self {
        let users: HashMap<String, UserProfile> = users
            .into_iter()
            .map(|profile| (profile.user_id.clone(), profile))
            .collect();

        let nodes: Vec<IndexedUser> = users
            .values()
            .filter(|profile| profile.has_location())
            .map(|profile| IndexedUser::new(profile.user_id.clone(), profile.point()))
            .collect();

        Self {
            inner: RwLock::new(Inner {
                users,
                index: RTree::bulk_load(nodes),
            }),
        }
    }

    /// Number of users known to the store
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of users with a searchable point
    pub fn indexed_len(&self) -> usize {
        self.inner.read().map(|inner| inner.index.size()).unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, ProximityError> {
        self.inner.read().map_err(|_| StoreError::Poisoned.into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, ProximityError> {
        self.inner.write().map_err(|_| StoreError::Poisoned.into())
    }
}

#[async_trait]
impl LocationStore for InMemoryLocationStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, ProximityError> {
        Ok(self.read()?.users.get(user_id).cloned())
    }

    async fn set_location(
        &self,
        user_id: &str,
        update: LocationUpdate,
    ) -> Result<StoredLocation, ProximityError> {
        let location = update.into_stored()?;

        let mut inner = self.write()?;
        if !inner.users.contains_key(user_id) {
            return Err(ProximityError::UserNotFound(user_id.to_string()));
        }

        inner.unindex(user_id);
        let profile = inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| ProximityError::UserNotFound(user_id.to_string()))?;
        profile.location = location.clone();
        let profile = profile.clone();
        inner.index(&profile);

        tracing::debug!(
            "Stored location for {}: [{}, {}]",
            user_id,
            location.coordinates[0],
            location.coordinates[1]
        );

        Ok(location)
    }

    async fn find_within_radius(
        &self,
        origin: &GeoPoint,
        radius_km: f64,
        exclude_user_id: &str,
    ) -> Result<Vec<UserProfile>, ProximityError> {
        let inner = self.read()?;
        let center = unit_vector(origin);

        let found: Vec<UserProfile> = inner
            .index
            .locate_within_distance(center, squared_chord(radius_km))
            .filter(|node| node.user_id != exclude_user_id)
            .filter(|node| great_circle_km(origin, &GeoPoint::from(node.point)) <= radius_km)
            .filter_map(|node| inner.users.get(&node.user_id).cloned())
            .collect();

        Ok(found)
    }
}

/// Privacy settings and match relationships kept in memory
#[derive(Default)]
pub struct InMemoryDirectory {
    policies: RwLock<HashMap<String, VisibilityPolicy>>,
    accepted: RwLock<HashSet<(String, String)>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_policy(&self, user_id: &str, policy: VisibilityPolicy) -> Result<(), ProximityError> {
        self.policies
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(user_id.to_string(), policy);
        Ok(())
    }

    /// Number of users with explicit privacy settings
    pub fn policy_count(&self) -> usize {
        self.policies.read().map(|policies| policies.len()).unwrap_or(0)
    }

    /// Record a match; only accepted matches make users visible to each other
    pub fn record_match(
        &self,
        user_a: &str,
        user_b: &str,
        status: MatchStatus,
    ) -> Result<(), ProximityError> {
        let key = match_key(user_a, user_b);
        let mut accepted = self.accepted.write().map_err(|_| StoreError::Poisoned)?;
        if status == MatchStatus::Accepted {
            accepted.insert(key);
        } else {
            accepted.remove(&key);
        }
        Ok(())
    }
}

fn match_key(user_a: &str, user_b: &str) -> (String, String) {
    if user_a <= user_b {
        (user_a.to_string(), user_b.to_string())
    } else {
        (user_b.to_string(), user_a.to_string())
    }
}

#[async_trait]
impl PrivacyDirectory for InMemoryDirectory {
    async fn get_policy(&self, user_id: &str) -> Result<VisibilityPolicy, ProximityError> {
        let policies = self.policies.read().map_err(|_| StoreError::Poisoned)?;
        Ok(policies.get(user_id).copied().unwrap_or_default())
    }
}

#[async_trait]
impl MatchDirectory for InMemoryDirectory {
    async fn are_matched(&self, user_a: &str, user_b: &str) -> Result<bool, ProximityError> {
        let accepted = self.accepted.read().map_err(|_| StoreError::Poisoned)?;
        Ok(accepted.contains(&match_key(user_a, user_b)))
    }

    async fn matched_with(
        &self,
        user_id: &str,
        candidate_ids: &[String],
    ) -> Result<HashSet<String>, ProximityError> {
        let accepted = self.accepted.read().map_err(|_| StoreError::Poisoned)?;
        Ok(candidate_ids
            .iter()
            .filter(|candidate_id| accepted.contains(&match_key(user_id, candidate_id)))
            .cloned()
            .collect())
    }
}
