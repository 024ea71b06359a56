//! Pure, named state transitions over the whole store.
//!
//! Every mutation is a total function from `(store, payload)` to a new
//! store value. Mutations never throw for missing targets: updating or
//! deleting against a collection that does not exist is a no-op, which
//! distinguishes "malformed request" from "nothing to do". The upsert
//! targeting decision (replace in place vs. append) is made here, against
//! the store the mutation is applied to — never against a snapshot captured
//! earlier during action planning.

use crate::error::StoreError;
use crate::instance::{instantiate_record, Instance};
use crate::record::{identity_of, record_identity, Record};
use crate::schema::SchemaRegistry;
use crate::store::Store;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Mutation names recognized by [`apply`]
pub const MUTATIONS: [&str; 8] = [
    "create",
    "insert",
    "update",
    "insertOrUpdate",
    "delete",
    "deleteAll",
    "reset",
    "hydrate",
];

/// Which records a `delete` removes
#[derive(Clone)]
pub enum Selector {
    /// A single id, matched by identity
    Id(Value),
    /// A list of ids, matched by identity
    Ids(Vec<Value>),
    /// A predicate over hydrated instances
    Predicate(Arc<dyn Fn(&Instance) -> bool + Send + Sync>),
}

impl Selector {
    /// Select one record by id
    pub fn id(id: impl Into<Value>) -> Self {
        Selector::Id(id.into())
    }

    /// Select records whose id is in the list
    pub fn ids<I, V>(ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Selector::Ids(ids.into_iter().map(Into::into).collect())
    }

    /// Select records matching a predicate over their instances
    pub fn predicate(pred: impl Fn(&Instance) -> bool + Send + Sync + 'static) -> Self {
        Selector::Predicate(Arc::new(pred))
    }

    /// Whether a record matches this selector
    ///
    /// Id selectors compare by derived identity; records without an
    /// identity never match. Predicate selectors hydrate the record first,
    /// so the closure sees defaulted attribute fields.
    pub fn matches(
        &self,
        entity: &str,
        record: &Record,
        registry: &SchemaRegistry,
    ) -> Result<bool, StoreError> {
        let record_id = record_identity(record);
        match self {
            Selector::Id(id) => Ok(match (identity_of(id), record_id) {
                (Some(wanted), Some(found)) => wanted == found,
                _ => false,
            }),
            Selector::Ids(ids) => Ok(match record_id {
                Some(found) => ids
                    .iter()
                    .filter_map(identity_of)
                    .any(|wanted| wanted == found),
                None => false,
            }),
            Selector::Predicate(pred) => {
                let instance = instantiate_record(registry, entity, record)?;
                Ok(pred(&instance))
            }
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Id(id) => f.debug_tuple("Id").field(id).finish(),
            Selector::Ids(ids) => f.debug_tuple("Ids").field(ids).finish(),
            Selector::Predicate(_) => f.debug_tuple("Predicate").field(&"..").finish(),
        }
    }
}

/// Payload accepted by [`apply`]
#[derive(Debug, Clone)]
pub enum MutationPayload {
    /// Normalized records for the data mutations
    Data { entity: String, records: Vec<Record> },
    /// Target selection for `delete`
    Delete { entity: String, selector: Selector },
    /// Bare entity name for `deleteAll`
    Entity { entity: String },
    /// Replacement store for `hydrate`
    State(Store),
    /// No payload (`reset`)
    Empty,
}

/// Apply a named mutation to the current store, producing the next one
///
/// Returns the current `Arc` unchanged when the mutation is a no-op by
/// value (a deep-equal `hydrate`), so observers can detect that nothing was
/// published.
///
/// # Errors
///
/// [`StoreError::UnknownMutation`] for an unregistered name;
/// [`StoreError::PayloadMismatch`] when a known name receives the wrong
/// payload shape. Existing state is untouched in both cases.
pub fn apply(
    current: &Arc<Store>,
    name: &str,
    payload: MutationPayload,
    registry: &SchemaRegistry,
) -> Result<Arc<Store>, StoreError> {
    log::debug!("applying mutation {name}");
    match (name, payload) {
        ("create", MutationPayload::Data { entity, records }) => {
            let mut next = Store::clone(current);
            next.insert(entity, records);
            Ok(Arc::new(next))
        }
        ("insert", MutationPayload::Data { entity, records }) => {
            let mut next = Store::clone(current);
            next.entry(entity).or_default().extend(records);
            Ok(Arc::new(next))
        }
        ("update", MutationPayload::Data { entity, records }) => {
            let mut next = Store::clone(current);
            if let Some(collection) = next.get_mut(&entity) {
                for record in records {
                    // Unmatched items are dropped: update never inserts.
                    let _ = replace_matching(collection, record);
                }
            }
            Ok(Arc::new(next))
        }
        ("insertOrUpdate", MutationPayload::Data { entity, records }) => {
            let mut next = Store::clone(current);
            let collection = next.entry(entity).or_default();
            for record in records {
                if let Some(unmatched) = replace_matching(collection, record) {
                    collection.push(unmatched);
                }
            }
            Ok(Arc::new(next))
        }
        ("delete", MutationPayload::Delete { entity, selector }) => {
            let mut next = Store::clone(current);
            if let Some(collection) = next.get_mut(&entity) {
                let mut kept = Vec::with_capacity(collection.len());
                for record in collection.drain(..) {
                    if !selector.matches(&entity, &record, registry)? {
                        kept.push(record);
                    }
                }
                *collection = kept;
            }
            Ok(Arc::new(next))
        }
        ("deleteAll", MutationPayload::Entity { entity }) => {
            let mut next = Store::clone(current);
            next.insert(entity, Vec::new());
            Ok(Arc::new(next))
        }
        ("reset", MutationPayload::Empty) => Ok(Arc::new(Store::new())),
        ("hydrate", MutationPayload::State(state)) => {
            if **current == state {
                log::debug!("hydrate skipped: incoming state equals current store");
                Ok(current.clone())
            } else {
                Ok(Arc::new(state))
            }
        }
        (name, _) if MUTATIONS.contains(&name) => Err(StoreError::PayloadMismatch(name.to_owned())),
        (name, _) => Err(StoreError::UnknownMutation(name.to_owned())),
    }
}

/// Replace the record whose identity matches, handing the record back when
/// nothing matched
fn replace_matching(collection: &mut [Record], record: Record) -> Option<Record> {
    let identity = match record_identity(&record) {
        Some(identity) => identity,
        None => return Some(record),
    };
    match collection
        .iter()
        .position(|existing| record_identity(existing).as_deref() == Some(identity.as_str()))
    {
        Some(index) => {
            collection[index] = record;
            None
        }
        None => Some(record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        let registry = SchemaRegistry::new();
        registry.register("users", || {
            crate::schema::FieldMap::new()
                .attr("id", Value::Null)
                .attr("name", "")
        });
        registry
    }

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn seeded(entity: &str, items: Vec<Value>) -> Arc<Store> {
        let mut store = Store::new();
        store.insert(entity.to_owned(), items.into_iter().map(record).collect());
        Arc::new(store)
    }

    #[test]
    fn create_replaces_the_whole_collection() {
        let registry = registry();
        let current = seeded("users", vec![json!({ "id": 1 })]);
        let next = apply(
            &current,
            "create",
            MutationPayload::Data {
                entity: "users".to_string(),
                records: vec![record(json!({ "id": 9 }))],
            },
            &registry,
        )
        .unwrap();
        assert_eq!(next["users"].len(), 1);
        assert_eq!(next["users"][0]["id"], json!(9));
    }

    #[test]
    fn insert_keeps_duplicate_ids() {
        let registry = registry();
        let current = Arc::new(Store::new());
        let next = apply(
            &current,
            "insert",
            MutationPayload::Data {
                entity: "users".to_string(),
                records: vec![record(json!({ "id": 1 })), record(json!({ "id": 1 }))],
            },
            &registry,
        )
        .unwrap();
        assert_eq!(next["users"].len(), 2);
    }

    #[test]
    fn update_never_inserts() {
        let registry = registry();
        let current = seeded("users", vec![json!({ "id": 1, "name": "a" })]);
        let next = apply(
            &current,
            "update",
            MutationPayload::Data {
                entity: "users".to_string(),
                records: vec![
                    record(json!({ "id": 1, "name": "b" })),
                    record(json!({ "id": 2, "name": "ghost" })),
                ],
            },
            &registry,
        )
        .unwrap();
        assert_eq!(next["users"].len(), 1);
        assert_eq!(next["users"][0]["name"], json!("b"));
    }

    #[test]
    fn update_against_missing_collection_is_a_no_op() {
        let registry = registry();
        let current = Arc::new(Store::new());
        let next = apply(
            &current,
            "update",
            MutationPayload::Data {
                entity: "users".to_string(),
                records: vec![record(json!({ "id": 1 }))],
            },
            &registry,
        )
        .unwrap();
        assert!(next.get("users").is_none());
    }

    #[test]
    fn insert_or_update_replaces_in_place_and_appends() {
        let registry = registry();
        let current = seeded(
            "users",
            vec![json!({ "id": 1, "name": "a" }), json!({ "id": 2, "name": "b" })],
        );
        let next = apply(
            &current,
            "insertOrUpdate",
            MutationPayload::Data {
                entity: "users".to_string(),
                records: vec![
                    record(json!({ "id": 1, "name": "a2" })),
                    record(json!({ "id": 3, "name": "c" })),
                ],
            },
            &registry,
        )
        .unwrap();
        let ids: Vec<&Value> = next["users"].iter().map(|r| &r["id"]).collect();
        assert_eq!(ids, vec![&json!(1), &json!(2), &json!(3)]);
        assert_eq!(next["users"][0]["name"], json!("a2"));
    }

    #[test]
    fn insert_or_update_is_idempotent() {
        let registry = registry();
        let payload = || MutationPayload::Data {
            entity: "users".to_string(),
            records: vec![record(json!({ "id": 1, "name": "same" }))],
        };
        let current = Arc::new(Store::new());
        let once = apply(&current, "insertOrUpdate", payload(), &registry).unwrap();
        let twice = apply(&once, "insertOrUpdate", payload(), &registry).unwrap();
        assert_eq!(*once, *twice);
    }

    #[test]
    fn delete_by_predicate_filters_instances() {
        let registry = registry();
        let current = seeded(
            "users",
            vec![
                json!({ "id": 1, "name": "test1" }),
                json!({ "id": 2, "name": "test2" }),
                json!({ "id": 3, "name": "other" }),
            ],
        );
        let selector = Selector::predicate(|inst| {
            inst.get("name")
                .and_then(Value::as_str)
                .is_some_and(|name| name.starts_with("test"))
        });
        let next = apply(
            &current,
            "delete",
            MutationPayload::Delete {
                entity: "users".to_string(),
                selector,
            },
            &registry,
        )
        .unwrap();
        assert_eq!(next["users"].len(), 1);
        assert_eq!(next["users"][0]["name"], json!("other"));
    }

    #[test]
    fn delete_by_ids_matches_stringified_identity() {
        let registry = registry();
        let current = seeded(
            "users",
            vec![json!({ "id": 1 }), json!({ "id": "2" }), json!({ "id": 3 })],
        );
        let next = apply(
            &current,
            "delete",
            MutationPayload::Delete {
                entity: "users".to_string(),
                selector: Selector::ids([json!("1"), json!(2)]),
            },
            &registry,
        )
        .unwrap();
        assert_eq!(next["users"].len(), 1);
        assert_eq!(next["users"][0]["id"], json!(3));
    }

    #[test]
    fn delete_against_missing_collection_is_a_no_op() {
        let registry = registry();
        let current = Arc::new(Store::new());
        let next = apply(
            &current,
            "delete",
            MutationPayload::Delete {
                entity: "users".to_string(),
                selector: Selector::id(json!(1)),
            },
            &registry,
        )
        .unwrap();
        assert!(next.is_empty());
    }

    #[test]
    fn reset_empties_every_collection() {
        let registry = registry();
        let current = seeded("users", vec![json!({ "id": 1 })]);
        let next = apply(&current, "reset", MutationPayload::Empty, &registry).unwrap();
        assert!(next.is_empty());
    }

    #[test]
    fn hydrate_keeps_the_arc_when_deeply_equal() {
        let registry = registry();
        let current = seeded("users", vec![json!({ "id": 1 })]);
        let same = Store::clone(&current);
        let next = apply(&current, "hydrate", MutationPayload::State(same), &registry).unwrap();
        assert!(Arc::ptr_eq(&current, &next));
    }

    #[test]
    fn hydrate_replaces_wholesale_not_merging() {
        let registry = registry();
        let mut both = Store::new();
        both.insert("users".to_string(), vec![record(json!({ "id": 1 }))]);
        both.insert("other".to_string(), vec![record(json!({ "id": 99 }))]);
        let current = Arc::new(both);

        let mut replacement = Store::new();
        replacement.insert("users".to_string(), vec![record(json!({ "id": 2 }))]);

        let next = apply(
            &current,
            "hydrate",
            MutationPayload::State(replacement),
            &registry,
        )
        .unwrap();
        assert_eq!(next["users"][0]["id"], json!(2));
        assert!(next.get("other").is_none());
    }

    #[test]
    fn unknown_mutation_is_an_error() {
        let registry = registry();
        let current = Arc::new(Store::new());
        let err = apply(&current, "truncate", MutationPayload::Empty, &registry).unwrap_err();
        assert!(matches!(err, StoreError::UnknownMutation(name) if name == "truncate"));
    }

    #[test]
    fn known_mutation_with_wrong_payload_is_rejected() {
        let registry = registry();
        let current = Arc::new(Store::new());
        let err = apply(&current, "create", MutationPayload::Empty, &registry).unwrap_err();
        assert!(matches!(err, StoreError::PayloadMismatch(name) if name == "create"));
    }
}
