use crate::error::ProximityError;
use crate::models::{BoundingBox, GeoPoint};

/// Kilometres per degree of arc: 60 nautical miles, 1.1515 statute miles each,
/// 1.609344 km per statute mile
pub const KM_PER_DEGREE: f64 = 60.0 * 1.1515 * 1.609344;

/// Envelope padding so points on the exact radius are never clipped
const ENVELOPE_EPSILON_DEG: f64 = 1e-9;

/// Great-circle distance in kilometres, unrounded
///
/// Spherical law of cosines. The cosine is clamped to `[-1, 1]` so that
/// identical points give `0.0` rather than `NaN`. Callers must pass finite
/// coordinates; use [`calculate_distance`] at a trust boundary.
#[inline]
pub fn great_circle_km(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let delta_lambda = (from.longitude - to.longitude).to_radians();

    let cos_angle = (phi1.sin() * phi2.sin() + phi1.cos() * phi2.cos() * delta_lambda.cos())
        .clamp(-1.0, 1.0);

    cos_angle.acos().to_degrees() * KM_PER_DEGREE
}

/// Distance between two user points in kilometres, rounded to 2 decimals
///
/// # Errors
/// `InvalidLocation` if either point is missing or has a non-finite coordinate.
pub fn calculate_distance(
    from: Option<&GeoPoint>,
    to: Option<&GeoPoint>,
) -> Result<f64, ProximityError> {
    let (from, to) = match (from, to) {
        (Some(from), Some(to)) => (from, to),
        _ => return Err(ProximityError::InvalidLocation("missing point".to_string())),
    };

    if !from.is_finite() || !to.is_finite() {
        return Err(ProximityError::InvalidLocation(
            "coordinates must be finite numbers".to_string(),
        ));
    }

    Ok(round_km(great_circle_km(from, to)))
}

#[inline]
fn round_km(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

/// Index envelopes covering every point within `radius_km` of `origin`
///
/// Returns one box, or two when the search circle crosses the antimeridian.
/// When the circle reaches a pole the longitude range is the whole circle.
pub fn search_envelopes(origin: &GeoPoint, radius_km: f64) -> Vec<BoundingBox> {
    let lat_delta = radius_km / KM_PER_DEGREE + ENVELOPE_EPSILON_DEG;
    let min_lat = (origin.latitude - lat_delta).max(-90.0);
    let max_lat = (origin.latitude + lat_delta).min(90.0);

    let full_circle = BoundingBox {
        min_lat,
        max_lat,
        min_lon: -180.0,
        max_lon: 180.0,
    };

    if min_lat <= -90.0 || max_lat >= 90.0 {
        return vec![full_circle];
    }

    // Widest longitude offset reachable on the sphere at this latitude
    let angular_radius = (radius_km / KM_PER_DEGREE).to_radians();
    let ratio = angular_radius.sin() / origin.latitude.to_radians().cos();
    if ratio >= 1.0 {
        return vec![full_circle];
    }
    let lon_delta = ratio.asin().to_degrees() + ENVELOPE_EPSILON_DEG;
    if lon_delta >= 180.0 {
        return vec![full_circle];
    }

    let min_lon = origin.longitude - lon_delta;
    let max_lon = origin.longitude + lon_delta;

    if min_lon < -180.0 {
        vec![
            BoundingBox { min_lat, max_lat, min_lon: min_lon + 360.0, max_lon: 180.0 },
            BoundingBox { min_lat, max_lat, min_lon: -180.0, max_lon },
        ]
    } else if max_lon > 180.0 {
        vec![
            BoundingBox { min_lat, max_lat, min_lon, max_lon: 180.0 },
            BoundingBox { min_lat, max_lat, min_lon: -180.0, max_lon: max_lon - 360.0 },
        ]
    } else {
        vec![BoundingBox { min_lat, max_lat, min_lon, max_lon }]
    }
}

/// Check if a point is within a bounding box
#[inline]
pub fn is_within_bounding_box(point: &GeoPoint, bbox: &BoundingBox) -> bool {
    point.latitude >= bbox.min_lat
        && point.latitude <= bbox.max_lat
        && point.longitude >= bbox.min_lon
        && point.longitude <= bbox.max_lon
}

#[cfg(test)]
mod tests {
    use super::*;

    fn istanbul() -> GeoPoint {
        GeoPoint::new(28.9784, 41.0082)
    }

    fn ankara() -> GeoPoint {
        GeoPoint::new(32.8597, 39.9334)
    }

    #[test]
    fn test_istanbul_to_ankara() {
        let distance = calculate_distance(Some(&istanbul()), Some(&ankara())).unwrap();
        assert!(
            (349.0..=351.0).contains(&distance),
            "Distance should be ~350km, got {}",
            distance
        );
    }

    #[test]
    fn test_identical_points_are_exactly_zero() {
        for point in [istanbul(), ankara(), GeoPoint::new(-74.0060, 40.7128), GeoPoint::new(179.9, -89.9)] {
            let distance = calculate_distance(Some(&point), Some(&point)).unwrap();
            assert_eq!(distance, 0.0);
            assert!(!great_circle_km(&point, &point).is_nan());
        }
    }

    #[test]
    fn test_missing_point_rejected() {
        assert!(matches!(
            calculate_distance(None, Some(&ankara())),
            Err(ProximityError::InvalidLocation(_))
        ));
        assert!(matches!(
            calculate_distance(Some(&istanbul()), None),
            Err(ProximityError::InvalidLocation(_))
        ));
    }

    #[test]
    fn test_non_finite_point_rejected() {
        let bad = GeoPoint::new(f64::INFINITY, 10.0);
        assert!(matches!(
            calculate_distance(Some(&bad), Some(&ankara())),
            Err(ProximityError::InvalidLocation(_))
        ));
    }

    #[test]
    fn test_rounded_to_two_decimals() {
        let distance = calculate_distance(Some(&istanbul()), Some(&ankara())).unwrap();
        assert_eq!(distance, (distance * 100.0).round() / 100.0);
    }

    #[test]
    fn test_envelope_contains_origin() {
        let envelopes = search_envelopes(&istanbul(), 10.0);
        assert_eq!(envelopes.len(), 1);
        assert!(is_within_bounding_box(&istanbul(), &envelopes[0]));

        // 10km / ~111km per degree = ~0.18 degrees of latitude span
        let lat_span = envelopes[0].max_lat - envelopes[0].min_lat;
        assert!((lat_span - 0.18).abs() < 0.02, "Lat span should be ~0.18 degrees");
    }

    #[test]
    fn test_envelope_splits_at_antimeridian() {
        let fiji = GeoPoint::new(179.9, -17.7);
        let envelopes = search_envelopes(&fiji, 50.0);

        assert_eq!(envelopes.len(), 2);
        let across = GeoPoint::new(-179.9, -17.7);
        assert!(envelopes.iter().any(|b| is_within_bounding_box(&across, b)));
        assert!(envelopes.iter().any(|b| is_within_bounding_box(&fiji, b)));
    }

    #[test]
    fn test_envelope_near_pole_covers_all_longitudes() {
        let svalbard_north = GeoPoint::new(15.0, 89.9);
        let envelopes = search_envelopes(&svalbard_north, 50.0);

        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].min_lon, -180.0);
        assert_eq!(envelopes[0].max_lon, 180.0);
        assert_eq!(envelopes[0].max_lat, 90.0);
    }

    #[test]
    fn test_envelope_never_clips_points_inside_radius() {
        let origin = GeoPoint::new(10.0, 60.0);
        let envelopes = search_envelopes(&origin, 100.0);

        // Walk points around the origin; any point within the radius must be enveloped
        for lon_step in -40..=40 {
            for lat_step in -20..=20 {
                let point = GeoPoint::new(
                    origin.longitude + lon_step as f64 * 0.05,
                    origin.latitude + lat_step as f64 * 0.05,
                );
                if great_circle_km(&origin, &point) <= 100.0 {
                    assert!(
                        envelopes.iter().any(|b| is_within_bounding_box(&point, b)),
                        "{:?} within radius but outside envelope",
                        point
                    );
                }
            }
        }
    }
}
