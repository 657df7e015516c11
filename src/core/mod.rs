// Core algorithm exports
pub mod assembler;
pub mod distance;
pub mod filters;
pub mod proximity;
pub mod visibility;

pub use assembler::{assemble, DEFAULT_RESULT_CAP};
pub use distance::{calculate_distance, great_circle_km, is_within_bounding_box, search_envelopes};
pub use filters::{matches_age_range, matches_filter, matches_interests, validate_filter};
pub use proximity::{ProximityService, DEFAULT_STORE_TIMEOUT};
pub use visibility::{evaluate, is_visible, VisibilityDecision};
