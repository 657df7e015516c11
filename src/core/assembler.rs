use crate::core::distance::calculate_distance;
use crate::error::ProximityError;
use crate::models::{GeoPoint, NearbyCandidate, PublicProfile, UserProfile};

/// Default maximum number of nearby users returned
pub const DEFAULT_RESULT_CAP: usize = 50;

/// Turn visible candidates into the final result list
///
/// Attaches the rounded distance from `origin`, sorts ascending by distance
/// (ties by user id), truncates to `cap` and strips account secrets by
/// converting each profile to a [`PublicProfile`].
pub fn assemble(
    origin: &GeoPoint,
    candidates: Vec<UserProfile>,
    cap: usize,
) -> Result<Vec<NearbyCandidate>, ProximityError> {
    let mut ranked: Vec<(f64, UserProfile)> = candidates
        .into_iter()
        .map(|profile| {
            let point = profile.point();
            calculate_distance(Some(origin), Some(&point)).map(|distance| (distance, profile))
        })
        .collect::<Result<_, _>>()?;

    ranked.sort_by(|(a_dist, a), (b_dist, b)| {
        a_dist
            .total_cmp(b_dist)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });

    ranked.truncate(cap);

    Ok(ranked
        .into_iter()
        .map(|(distance_km, profile)| NearbyCandidate {
            profile: PublicProfile::from(profile),
            distance_km,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoredLocation;

    fn create_candidate(id: &str, lon: f64, lat: f64) -> UserProfile {
        let mut profile = UserProfile::new(id, format!("user_{}", id));
        profile.location = StoredLocation::new(GeoPoint::new(lon, lat), String::new(), String::new());
        profile.password_hash = Some("$2b$10$secret".to_string());
        profile.two_factor_secret = Some("JBSWY3DPEHPK3PXP".to_string());
        profile
    }

    #[test]
    fn test_sorted_by_distance() {
        let origin = GeoPoint::new(28.9784, 41.0082);
        let candidates = vec![
            create_candidate("far", 32.8597, 39.9334),
            create_candidate("near", 28.98, 41.01),
            create_candidate("mid", 29.5, 40.8),
        ];

        let result = assemble(&origin, candidates, 10).unwrap();
        let ids: Vec<&str> = result.iter().map(|c| c.profile.id.as_str()).collect();

        assert_eq!(ids, vec!["near", "mid", "far"]);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let origin = GeoPoint::new(10.0, 10.0);
        let candidates = vec![
            create_candidate("c", 10.1, 10.0),
            create_candidate("a", 10.1, 10.0),
            create_candidate("b", 10.1, 10.0),
        ];

        let result = assemble(&origin, candidates, 10).unwrap();
        let ids: Vec<&str> = result.iter().map(|c| c.profile.id.as_str()).collect();

        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_respects_cap() {
        let origin = GeoPoint::new(10.0, 10.0);
        let candidates: Vec<UserProfile> = (0..20)
            .map(|i| create_candidate(&format!("{:02}", i), 10.0 + i as f64 * 0.001, 10.0))
            .collect();

        let result = assemble(&origin, candidates, 5).unwrap();

        assert_eq!(result.len(), 5);
        assert_eq!(result[0].profile.id, "00");
    }

    #[test]
    fn test_secrets_stripped() {
        let origin = GeoPoint::new(10.0, 10.0);
        let result = assemble(&origin, vec![create_candidate("x", 10.01, 10.0)], 5).unwrap();
        let json = serde_json::to_string(&result).unwrap();

        assert!(!json.contains("secret"));
        assert!(!json.contains("JBSWY3DPEHPK3PXP"));
        assert!(json.contains("\"distance\""));
    }
}
