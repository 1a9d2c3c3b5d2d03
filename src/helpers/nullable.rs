//! Partial-update fields that may be cleared.

use serde::{Deserialize, Deserializer};

/// Deserializes a present field, `null` included, into `Some(_)`.
///
/// Paired with `#[serde(default)]`: an absent field stays `None` (keep the
/// stored value) and an explicit `null` becomes `Some(None)` (clear it).
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
