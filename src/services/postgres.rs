use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::core::distance::{great_circle_km, search_envelopes};
use crate::error::{ProximityError, StoreError};
use crate::models::{
    BoundingBox, Gender, GeoPoint, LocationUpdate, StoredLocation, UserProfile, Visibility,
    VisibilityPolicy,
};
use crate::services::location_store::{LocationStore, MatchDirectory, PrivacyDirectory};

const USER_COLUMNS: &str = r#"
    id, username, email, age, gender, interests, bio, profile_picture,
    is_email_verified, longitude, latitude, city, country,
    password_hash, email_verification_token, password_reset_token,
    two_factor_secret, two_factor_backup_codes
"#;

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: String,
    age: Option<i16>,
    gender: Option<String>,
    interests: Vec<String>,
    bio: String,
    profile_picture: String,
    is_email_verified: bool,
    longitude: f64,
    latitude: f64,
    city: String,
    country: String,
    password_hash: Option<String>,
    email_verification_token: Option<String>,
    password_reset_token: Option<String>,
    two_factor_secret: Option<String>,
    two_factor_backup_codes: Vec<String>,
}

impl TryFrom<UserRow> for UserProfile {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let age = row
            .age
            .map(u8::try_from)
            .transpose()
            .map_err(|_| StoreError::Corrupt(format!("age out of range for user {}", row.id)))?;

        Ok(UserProfile {
            gender: row.gender.as_deref().and_then(Gender::parse),
            location: StoredLocation::new(
                GeoPoint::new(row.longitude, row.latitude),
                row.city,
                row.country,
            ),
            user_id: row.id,
            username: row.username,
            email: row.email,
            age,
            interests: row.interests,
            bio: row.bio,
            profile_picture: row.profile_picture,
            is_email_verified: row.is_email_verified,
            password_hash: row.password_hash,
            email_verification_token: row.email_verification_token,
            password_reset_token: row.password_reset_token,
            two_factor_secret: row.two_factor_secret,
            two_factor_backup_codes: row.two_factor_backup_codes,
        })
    }
}

#[derive(Debug, FromRow)]
struct LocationRow {
    longitude: f64,
    latitude: f64,
    city: String,
    country: String,
}

#[derive(Debug, FromRow)]
struct PolicyRow {
    user_id: String,
    searchable: bool,
    location_visibility: String,
    profile_visibility: String,
}

impl PolicyRow {
    fn into_policy(self) -> (String, VisibilityPolicy) {
        let policy = VisibilityPolicy {
            searchable: self.searchable,
            location_visibility: Visibility::parse(&self.location_visibility).unwrap_or_default(),
            profile_visibility: Visibility::parse(&self.profile_visibility).unwrap_or_default(),
        };
        (self.user_id, policy)
    }
}

/// Candidate filter for radius queries
///
/// `$1` is the excluded user; `$2..$9` are the corners of two boxes as
/// `(min_lon, min_lat), (max_lon, max_lat)`, see [`radius_query_boxes`].
const RADIUS_QUERY_FILTER: &str = r#"
    id <> $1
    AND NOT (longitude = 0 AND latitude = 0)
    AND (point(longitude, latitude) <@ box(point($2, $3), point($4, $5))
         OR point(longitude, latitude) <@ box(point($6, $7), point($8, $9)))
"#;

/// The two boxes bound into [`RADIUS_QUERY_FILTER`], each
/// `[min_lon, min_lat, max_lon, max_lat]`
///
/// A search circle that does not cross the antimeridian has one envelope,
/// which fills both slots.
fn radius_query_boxes(origin: &GeoPoint, radius_km: f64) -> [[f64; 4]; 2] {
    let corners = |bbox: &BoundingBox| [bbox.min_lon, bbox.min_lat, bbox.max_lon, bbox.max_lat];

    match search_envelopes(origin, radius_km).as_slice() {
        [only] => [corners(only), corners(only)],
        [first, second, ..] => [corners(first), corners(second)],
        [] => [[-180.0, -90.0, 180.0, 90.0]; 2],
    }
}

/// PostgreSQL client serving locations, privacy settings and matches
///
/// Radius queries search the GiST index on `point(longitude, latitude)` with
/// the search circle's envelope boxes: `O(log n + k)`, `k` being the rows
/// inside the boxes. Each row is then confirmed with the exact great-circle
/// distance.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

#[async_trait]
impl LocationStore for PostgresClient {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, ProximityError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        Ok(row.map(UserProfile::try_from).transpose()?)
    }

    async fn set_location(
        &self,
        user_id: &str,
        update: LocationUpdate,
    ) -> Result<StoredLocation, ProximityError> {
        let location = update.into_stored()?;

        let query = r#"
            UPDATE users
            SET longitude = $2, latitude = $3, city = $4, country = $5
            WHERE id = $1
            RETURNING longitude, latitude, city, country
        "#;

        let row = sqlx::query_as::<_, LocationRow>(query)
            .bind(user_id)
            .bind(location.coordinates[0])
            .bind(location.coordinates[1])
            .bind(&location.city)
            .bind(&location.country)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?
            .ok_or_else(|| ProximityError::UserNotFound(user_id.to_string()))?;

        tracing::debug!("Stored location for {}: [{}, {}]", user_id, row.longitude, row.latitude);

        Ok(StoredLocation::new(
            GeoPoint::new(row.longitude, row.latitude),
            row.city,
            row.country,
        ))
    }

    async fn find_within_radius(
        &self,
        origin: &GeoPoint,
        radius_km: f64,
        exclude_user_id: &str,
    ) -> Result<Vec<UserProfile>, ProximityError> {
        let query = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, RADIUS_QUERY_FILTER);

        let mut rows = sqlx::query_as::<_, UserRow>(&query).bind(exclude_user_id);
        for corner in radius_query_boxes(origin, radius_km).into_iter().flatten() {
            rows = rows.bind(corner);
        }

        let rows = rows
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from)?;

        let scanned = rows.len();
        let mut found = Vec::with_capacity(scanned);
        for row in rows {
            let profile = UserProfile::try_from(row)?;
            if great_circle_km(origin, &profile.point()) <= radius_km {
                found.push(profile);
            }
        }

        tracing::debug!(
            "Radius query {}km around [{}, {}]: {} in box, {} in circle",
            radius_km,
            origin.longitude,
            origin.latitude,
            scanned,
            found.len()
        );

        Ok(found)
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}

#[async_trait]
impl PrivacyDirectory for PostgresClient {
    async fn get_policy(&self, user_id: &str) -> Result<VisibilityPolicy, ProximityError> {
        let policies = self.get_policies(&[user_id.to_string()]).await?;
        Ok(policies.get(user_id).copied().unwrap_or_default())
    }

    async fn get_policies(
        &self,
        user_ids: &[String],
    ) -> Result<HashMap<String, VisibilityPolicy>, ProximityError> {
        let query = r#"
            SELECT user_id, searchable, location_visibility, profile_visibility
            FROM privacy_settings
            WHERE user_id = ANY($1)
        "#;

        let rows = sqlx::query_as::<_, PolicyRow>(query)
            .bind(user_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from)?;

        let mut policies: HashMap<String, VisibilityPolicy> =
            rows.into_iter().map(PolicyRow::into_policy).collect();

        // Users without a row get the defaults
        for user_id in user_ids {
            policies.entry(user_id.clone()).or_default();
        }

        Ok(policies)
    }
}

#[async_trait]
impl MatchDirectory for PostgresClient {
    async fn are_matched(&self, user_a: &str, user_b: &str) -> Result<bool, ProximityError> {
        let query = r#"
            SELECT EXISTS (
                SELECT 1 FROM matches
                WHERE status = 'accepted'
                  AND ((user_a = $1 AND user_b = $2) OR (user_a = $2 AND user_b = $1))
            )
        "#;

        let matched: bool = sqlx::query_scalar(query)
            .bind(user_a)
            .bind(user_b)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from)?;

        Ok(matched)
    }

    async fn matched_with(
        &self,
        user_id: &str,
        candidate_ids: &[String],
    ) -> Result<HashSet<String>, ProximityError> {
        let query = r#"
            SELECT CASE WHEN user_a = $1 THEN user_b ELSE user_a END
            FROM matches
            WHERE status = 'accepted'
              AND ((user_a = $1 AND user_b = ANY($2)) OR (user_b = $1 AND user_a = ANY($2)))
        "#;

        let matched: Vec<String> = sqlx::query_scalar(query)
            .bind(user_id)
            .bind(candidate_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from)?;

        Ok(matched.into_iter().collect())
    }
}
