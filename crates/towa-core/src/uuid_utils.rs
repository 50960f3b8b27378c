//! UUID v7 utilities for time-ordered identifiers.
//!
//! Letter ids, opening ids, telemetry ids and incident references are all
//! UUIDv7, so sorting by id sorts by creation time.

use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
///
/// ```
/// use towa_core::uuid_utils::new_v7;
///
/// let id = new_v7();
/// assert_eq!(id.get_version_num(), 7);
/// ```
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}
