//! Tolerant decoding of JSON arrays.
//!
//! The backend serializes `NaN` as `null` and occasionally omits fields.
//! Arrays decoded through [`Lenient`] or [`seq`] keep every element that
//! parses and skip the rest. A `null` array decodes as empty.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A JSON array with its malformed elements removed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Lenient<T>(pub Vec<T>);

impl<T> Lenient<T> {
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Lenient<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
        let total = raw.len();
        let items: Vec<T> = raw
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect();
        if items.len() < total {
            tracing::debug!(skipped = total - items.len(), total, "skipped malformed elements");
        }
        Ok(Self(items))
    }
}

/// `deserialize_with` helper for `Vec<T>` fields.
pub fn seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Lenient::deserialize(deserializer).map(Lenient::into_inner)
}
