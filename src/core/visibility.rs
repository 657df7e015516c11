use crate::models::{Visibility, VisibilityPolicy};

/// Outcome of checking a candidate's privacy settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityDecision {
    Include,
    Exclude,
    /// Visible only to users the candidate has an accepted match with
    RequiresMatch,
}

/// Decide whether a candidate may appear in someone else's nearby results
///
/// Rules, first hit wins:
/// 1. not searchable → excluded
/// 2. location or profile private → excluded
/// 3. location or profile friends-only → needs an accepted match
/// 4. otherwise → included
pub fn evaluate(policy: &VisibilityPolicy) -> VisibilityDecision {
    if !policy.searchable {
        return VisibilityDecision::Exclude;
    }

    let levels = [policy.location_visibility, policy.profile_visibility];

    if levels.contains(&Visibility::Private) {
        return VisibilityDecision::Exclude;
    }

    if levels.contains(&Visibility::Friends) {
        return VisibilityDecision::RequiresMatch;
    }

    VisibilityDecision::Include
}

/// Resolve a decision once the match relationship is known
#[inline]
pub fn is_visible(decision: VisibilityDecision, matched: bool) -> bool {
    match decision {
        VisibilityDecision::Include => true,
        VisibilityDecision::Exclude => false,
        VisibilityDecision::RequiresMatch => matched,
    }
}
