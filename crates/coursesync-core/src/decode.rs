//! Serde helpers for course data API payloads.

use serde::{Deserialize, Deserializer};

/// Decodes `null` as the field's default value.
///
/// The API sends `null` for blank strings, absent rooms and empty block lists;
/// those are stored as `""`, `0` or empty rather than rejected.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
