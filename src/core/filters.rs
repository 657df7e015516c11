use crate::error::ProximityError;
use crate::models::{ProximityFilter, UserProfile};

/// Reject filters the query builder cannot run
///
/// The radius must be a positive finite number of kilometres and the age
/// bounds, when both present, must not be inverted.
pub fn validate_filter(filter: &ProximityFilter) -> Result<(), ProximityError> {
    if !filter.max_distance_km.is_finite() || filter.max_distance_km <= 0.0 {
        return Err(ProximityError::InvalidFilter(format!(
            "maxDistance must be a positive number of kilometres, got {}",
            filter.max_distance_km
        )));
    }

    if let (Some(min_age), Some(max_age)) = (filter.min_age, filter.max_age) {
        if min_age > max_age {
            return Err(ProximityError::InvalidFilter(format!(
                "minAge ({}) must not exceed maxAge ({})",
                min_age, max_age
            )));
        }
    }

    Ok(())
}

/// Inclusive age bounds; a profile without an age fails any bound
#[inline]
pub fn matches_age_range(profile: &UserProfile, filter: &ProximityFilter) -> bool {
    if filter.min_age.is_none() && filter.max_age.is_none() {
        return true;
    }

    let Some(age) = profile.age else {
        return false;
    };

    filter.min_age.map_or(true, |min| age >= min) && filter.max_age.map_or(true, |max| age <= max)
}

/// At least one shared interest, or no interest filter at all
#[inline]
pub fn matches_interests(profile: &UserProfile, filter: &ProximityFilter) -> bool {
    filter.interests.is_empty()
        || profile
            .interests
            .iter()
            .any(|interest| filter.interests.contains(interest))
}

/// Post-query narrowing pass
#[inline]
pub fn matches_filter(profile: &UserProfile, filter: &ProximityFilter) -> bool {
    matches_age_range(profile, filter) && matches_interests(profile, filter)
}
