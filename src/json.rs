use serde::{Deserialize, Deserializer};

pub use serde_json::Value;

/// Deserializes an explicit `null` as the type's default value, so that
/// `"error": null` and a missing `"error"` both decode to an empty string.
pub(crate) fn nullable<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Option::unwrap_or_default)
}
