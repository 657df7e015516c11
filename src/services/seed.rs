//! Startup data for the in-memory backend.
//!
//! A seed file is a JSON document with `users`, `privacy` and `matches`
//! arrays, all optional:
//!
//! ```json
//! {
//!   "users": [{ "id": "u1", "username": "deniz", "age": 29,
//!               "location": { "type": "Point", "coordinates": [28.97, 41.0] } }],
//!   "privacy": [{ "userId": "u1", "searchable": true, "locationVisibility": "friends" }],
//!   "matches": [{ "userA": "u1", "userB": "u2", "status": "accepted" }]
//! }
//! ```
//!
//! Seeded users carry no account secrets.

use serde::Deserialize;
use std::path::Path;

use crate::error::{ProximityError, StoreError};
use crate::models::{Gender, GeoPoint, MatchStatus, StoredLocation, UserProfile, VisibilityPolicy};
use crate::services::memory::{InMemoryDirectory, InMemoryLocationStore};

#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub privacy: Vec<SeedPrivacy>,
    #[serde(default)]
    pub matches: Vec<SeedMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub age: Option<u8>,
    pub gender: Option<Gender>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub profile_picture: String,
    #[serde(default)]
    pub is_email_verified: bool,
    pub location: Option<StoredLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedPrivacy {
    pub user_id: String,
    #[serde(flatten)]
    pub policy: VisibilityPolicy,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedMatch {
    pub user_a: String,
    pub user_b: String,
    pub status: MatchStatus,
}

impl SeedUser {
    fn into_profile(self) -> Result<UserProfile, ProximityError> {
        let location = match self.location {
            Some(location) => {
                // Reject out-of-range points here rather than at query time
                let point = GeoPoint::checked(location.coordinates[0], location.coordinates[1])?;
                StoredLocation::new(point, location.city, location.country)
            }
            None => StoredLocation::default(),
        };

        let mut profile = UserProfile::new(self.id, self.username);
        profile.email = self.email;
        profile.age = self.age;
        profile.gender = self.gender;
        profile.interests = self.interests;
        profile.bio = self.bio;
        profile.profile_picture = self.profile_picture;
        profile.is_email_verified = self.is_email_verified;
        profile.location = location;
        Ok(profile)
    }
}

impl SeedData {
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Build the in-memory store and directory from this seed
    pub fn into_stores(self) -> Result<(InMemoryLocationStore, InMemoryDirectory), ProximityError> {
        let users = self
            .users
            .into_iter()
            .map(SeedUser::into_profile)
            .collect::<Result<Vec<_>, _>>()?;

        let directory = InMemoryDirectory::new();
        for entry in self.privacy {
            directory.set_policy(&entry.user_id, entry.policy)?;
        }
        for entry in self.matches {
            directory.record_match(&entry.user_a, &entry.user_b, entry.status)?;
        }

        tracing::info!(
            "Seeded {} users, {} privacy settings",
            users.len(),
            directory.policy_count()
        );

        Ok((InMemoryLocationStore::with_users(users), directory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProximityFilter, Visibility};
    use crate::services::{LocationStore, MatchDirectory, PrivacyDirectory};
    use crate::ProximityService;
    use std::sync::Arc;

    const SEED: &str = r#"{
        "users": [
            { "id": "me", "username": "deniz", "age": 30,
              "location": { "type": "Point", "coordinates": [28.9784, 41.0082], "city": "Istanbul" } },
            { "id": "near", "username": "ece", "age": 28, "gender": "female",
              "interests": ["chess"],
              "location": { "type": "Point", "coordinates": [28.99, 41.02] } },
            { "id": "newcomer", "username": "mert" }
        ],
        "privacy": [
            { "userId": "near", "searchable": true, "locationVisibility": "friends" }
        ],
        "matches": [
            { "userA": "near", "userB": "me", "status": "accepted" }
        ]
    }"#;

    #[tokio::test]
    async fn test_seed_builds_working_stores() {
        let (store, directory) = SeedData::from_json(SEED).unwrap().into_stores().unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.indexed_len(), 2);

        let policy = directory.get_policy("near").await.unwrap();
        assert_eq!(policy.location_visibility, Visibility::Friends);
        assert!(directory.are_matched("me", "near").await.unwrap());

        let newcomer = store.get_user("newcomer").await.unwrap().unwrap();
        assert!(!newcomer.has_location());
    }

    #[tokio::test]
    async fn test_seeded_service_answers_requests() {
        let (store, directory) = SeedData::from_json(SEED).unwrap().into_stores().unwrap();
        let directory = Arc::new(directory);
        let service = ProximityService::new(Arc::new(store), directory.clone(), directory);

        let found = service.find_nearby("me", &ProximityFilter::default()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].profile.id, "near");

        // A seeded user without a location can set one
        let location = service
            .update_location(
                "newcomer",
                crate::models::LocationUpdate {
                    longitude: 29.0,
                    latitude: 41.0,
                    city: None,
                    country: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(location.coordinates, [29.0, 41.0]);
    }

    #[test]
    fn test_seed_rejects_out_of_range_location() {
        let seed = SeedData::from_json(
            r#"{ "users": [{ "id": "x", "username": "x",
                 "location": { "type": "Point", "coordinates": [181.0, 0.0] } }] }"#,
        )
        .unwrap();

        assert!(matches!(
            seed.into_stores(),
            Err(ProximityError::InvalidCoordinates(_))
        ));
    }

    #[tokio::test]
    async fn test_sample_seed_file() {
        let seed = SeedData::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config/seed.json")).unwrap();
        let (store, directory) = seed.into_stores().unwrap();
        let directory = Arc::new(directory);
        let service = ProximityService::new(Arc::new(store), directory.clone(), directory);

        let found = service
            .find_nearby("u-deniz", &ProximityFilter::default())
            .await
            .unwrap();
        let ids: Vec<&str> = found.iter().map(|c| c.profile.id.as_str()).collect();
        assert_eq!(ids, vec!["u-selin", "u-ece"]);

        let result = service.find_nearby("u-new", &ProximityFilter::default()).await;
        assert!(matches!(result, Err(ProximityError::LocationNotSet)));
    }

    #[test]
    fn test_seed_format_errors() {
        assert!(matches!(
            SeedData::from_json("{ \"users\": 3 }"),
            Err(StoreError::SeedFormat(_))
        ));
        assert!(matches!(
            SeedData::load("does/not/exist.json"),
            Err(StoreError::SeedIo(_))
        ));
    }
}
