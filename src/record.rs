//! Flat records, identity derivation, and input normalization.
//!
//! A [`Record`] is the persisted shape of one entity: plain key → value
//! attribute data. Identity is implicit — the stringified value of the
//! record's `id` field — and is never stored as a separate column. The
//! normalizer turns raw input (a single object or a list) into an
//! identity-keyed collection ready for instantiation and commit.

use crate::error::StoreError;
use serde_json::{Map, Value};

/// Flat persisted data for one entity instance
pub type Record = Map<String, Value>;

/// Derive an identity string from a scalar value
///
/// Strings are used as-is; numbers and booleans are stringified. `null`,
/// arrays and objects carry no identity.
pub fn identity_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Derive a record's identity from its `id` field
pub fn record_identity(record: &Record) -> Option<String> {
    record.get("id").and_then(identity_of)
}

/// Identity-keyed collection produced by [`normalize`]
///
/// Kept as an ordered sequence of `(identity, record)` pairs rather than a
/// map: input order is significant for the mutations that consume it, and
/// `insert` must be able to keep duplicate ids co-resident.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedData {
    /// Entity type the records belong to
    pub entity: String,
    /// Records in input order, keyed by derived identity
    pub records: Vec<(String, Record)>,
}

/// Normalize raw input into an identity-keyed collection
///
/// Accepts either one JSON object or an array of objects uniformly.
///
/// # Errors
///
/// Returns [`StoreError::IdentityMissing`] when an item is not an object or
/// carries no usable `id`.
///
/// # Example
///
/// ```
/// use lagoon::record::normalize;
/// use serde_json::json;
///
/// let normalized = normalize("users", json!([{ "id": 1, "name": "a" }])).unwrap();
/// assert_eq!(normalized.records[0].0, "1");
/// ```
pub fn normalize(entity: &str, data: Value) -> Result<NormalizedData, StoreError> {
    let items = match data {
        Value::Array(items) => items,
        single => vec![single],
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let record = match item {
            Value::Object(map) => map,
            _ => return Err(StoreError::IdentityMissing(entity.to_owned())),
        };
        let identity = record_identity(&record)
            .ok_or_else(|| StoreError::IdentityMissing(entity.to_owned()))?;
        records.push((identity, record));
    }

    Ok(NormalizedData {
        entity: entity.to_owned(),
        records,
    })
}
