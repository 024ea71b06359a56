//! The action pipeline: async orchestration in front of the mutations.
//!
//! A [`StoreHandle`] wires a schema registry to a state container and is
//! cheap to clone. Data actions normalize their payload, instantiate the
//! records, and issue exactly one commit; `delete` computes its matches
//! against the current snapshot *before* committing so the removed
//! instances can be returned. Actions never decide upsert targeting
//! themselves — they pass `{entity, data}` and let the mutation re-derive
//! index matches at commit-application time, which is what keeps logically
//! concurrent writers from losing updates.

use crate::error::StoreError;
use crate::instance::{instantiate, instantiate_record, Instance};
use crate::mutation::{MutationPayload, Selector};
use crate::query::Query;
use crate::record::{identity_of, normalize, record_identity};
use crate::relation::Resolver;
use crate::schema::{registry::FieldsFn, SchemaRegistry};
use crate::store::{InMemoryContainer, StateContainer, Store};
use serde_json::Value;
use std::sync::Arc;

/// Action names recognized by [`StoreHandle::dispatch`]
pub const ACTIONS: [&str; 8] = [
    "create",
    "insert",
    "update",
    "insertOrUpdate",
    "delete",
    "deleteAll",
    "reset",
    "hydrate",
];

/// Payload accepted by [`StoreHandle::dispatch`]
#[derive(Debug, Clone)]
pub enum ActionPayload {
    /// Raw input (one object or a list) for the data actions
    Data { entity: String, data: Value },
    /// Target selection for `delete`
    Delete { entity: String, selector: Selector },
    /// Bare entity name for `deleteAll`
    Entity { entity: String },
    /// Replacement store for `hydrate`
    State(Store),
    /// No payload (`reset`)
    Empty,
}

impl ActionPayload {
    /// Data payload for `create`/`insert`/`update`/`insertOrUpdate`
    pub fn data(entity: &str, data: Value) -> Self {
        ActionPayload::Data {
            entity: entity.to_owned(),
            data,
        }
    }

    /// Delete payload targeting records by selector
    pub fn delete(entity: &str, selector: Selector) -> Self {
        ActionPayload::Delete {
            entity: entity.to_owned(),
            selector,
        }
    }

    /// Payload naming only the entity (`deleteAll`)
    pub fn entity(entity: &str) -> Self {
        ActionPayload::Entity {
            entity: entity.to_owned(),
        }
    }
}

/// Shared dispatch/store wiring for every entity operation
///
/// Explicitly owned and explicitly passed — there is no implicit global
/// store, so independent handles never leak state into each other.
///
/// # Example
///
/// ```
/// use lagoon::store::{ActionPayload, StoreHandle};
/// use lagoon::schema::FieldMap;
/// use serde_json::{json, Value};
///
/// # tokio_test::block_on(async {
/// let handle = StoreHandle::in_memory();
/// handle.register("users", || FieldMap::new().attr("id", Value::Null).attr("name", ""));
///
/// let created = handle
///     .dispatch("create", ActionPayload::data("users", json!([{ "id": 1, "name": "a" }])))
///     .await?;
/// assert_eq!(created.len(), 1);
/// # Ok::<(), lagoon::StoreError>(())
/// # }).unwrap();
/// ```
#[derive(Clone)]
pub struct StoreHandle {
    registry: Arc<SchemaRegistry>,
    container: Arc<dyn StateContainer>,
}

impl StoreHandle {
    /// Create a handle backed by the bundled in-memory container
    pub fn in_memory() -> Self {
        let registry = Arc::new(SchemaRegistry::new());
        let container = Arc::new(InMemoryContainer::new(registry.clone()));
        StoreHandle {
            registry,
            container,
        }
    }

    /// Create a handle over a caller-supplied state container
    pub fn with_container(
        registry: Arc<SchemaRegistry>,
        container: Arc<dyn StateContainer>,
    ) -> Self {
        StoreHandle {
            registry,
            container,
        }
    }

    /// The schema registry shared by this handle
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Register an entity type's field-definition function (idempotent)
    pub fn register(&self, entity: &str, fields_fn: FieldsFn) {
        self.registry.register(entity, fields_fn);
    }

    /// The most recently committed store value
    pub fn snapshot(&self) -> Arc<Store> {
        self.container.read_snapshot()
    }

    /// A relationship resolver bound to the current snapshot
    pub fn resolver(&self) -> Resolver {
        Resolver::new(self.registry.clone(), self.snapshot())
    }

    /// Wire an externally sourced snapshot into the store
    ///
    /// Commits `hydrate` only when `initial` differs by deep value from the
    /// current store; a deep-equal call publishes nothing and invokes no
    /// mutation.
    pub fn init(&self, initial: Store) -> Result<(), StoreError> {
        let current = self.snapshot();
        if *current == initial {
            log::debug!("init skipped: provided state equals current store");
            return Ok(());
        }
        self.container
            .commit("hydrate", MutationPayload::State(initial))
    }

    /// Dispatch a named action
    ///
    /// Every action resolves with the affected instances (empty for
    /// `deleteAll`/`reset`/`hydrate`) after issuing exactly one commit.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownAction`] for an unregistered name;
    /// [`StoreError::PayloadMismatch`] when a known action receives the
    /// wrong payload shape; normalization and instantiation errors from the
    /// data actions. Existing state is untouched on every error path.
    pub async fn dispatch(
        &self,
        action: &str,
        payload: ActionPayload,
    ) -> Result<Vec<Instance>, StoreError> {
        match (action, payload) {
            (
                "create" | "insert" | "update" | "insertOrUpdate",
                ActionPayload::Data { entity, data },
            ) => {
                let normalized = normalize(&entity, data)?;
                let instances = instantiate(&self.registry, &normalized)?;
                let records = instances.iter().map(Instance::to_record).collect();
                self.container
                    .commit(action, MutationPayload::Data { entity, records })?;
                Ok(instances)
            }
            ("delete", ActionPayload::Delete { entity, selector }) => {
                // Matches are computed against the pre-commit state so the
                // removed instances can be returned in collection order.
                let snapshot = self.snapshot();
                let mut removed = Vec::new();
                if let Some(collection) = snapshot.get(&entity) {
                    for record in collection {
                        if selector.matches(&entity, record, &self.registry)? {
                            removed.push(instantiate_record(&self.registry, &entity, record)?);
                        }
                    }
                }
                self.container
                    .commit("delete", MutationPayload::Delete { entity, selector })?;
                Ok(removed)
            }
            ("deleteAll", ActionPayload::Entity { entity }) => {
                self.container
                    .commit("deleteAll", MutationPayload::Entity { entity })?;
                Ok(Vec::new())
            }
            ("reset", ActionPayload::Empty) => {
                self.container.commit("reset", MutationPayload::Empty)?;
                Ok(Vec::new())
            }
            ("hydrate", ActionPayload::State(state)) => {
                self.container
                    .commit("hydrate", MutationPayload::State(state))?;
                Ok(Vec::new())
            }
            (name, _) if ACTIONS.contains(&name) => {
                Err(StoreError::PayloadMismatch(name.to_owned()))
            }
            (name, _) => Err(StoreError::UnknownAction(name.to_owned())),
        }
    }

    /// Locate one instance by id against the current snapshot
    pub fn find(&self, entity: &str, id: &Value) -> Result<Option<Instance>, StoreError> {
        let wanted = match identity_of(id) {
            Some(identity) => identity,
            None => return Ok(None),
        };
        let snapshot = self.snapshot();
        let Some(collection) = snapshot.get(entity) else {
            // Entity must still be registered even when its collection is
            // missing, so lookups against unknown types fail loudly.
            self.registry.fields(entity)?;
            return Ok(None);
        };
        for record in collection {
            if record_identity(record).as_deref() == Some(wanted.as_str()) {
                return Ok(Some(instantiate_record(&self.registry, entity, record)?));
            }
        }
        // Schema check also covers the not-found path.
        self.registry.fields(entity)?;
        Ok(None)
    }

    /// All instances of an entity type, in collection order
    pub fn all(&self, entity: &str) -> Result<Vec<Instance>, StoreError> {
        let snapshot = self.snapshot();
        let Some(collection) = snapshot.get(entity) else {
            self.registry.fields(entity)?;
            return Ok(Vec::new());
        };
        collection
            .iter()
            .map(|record| instantiate_record(&self.registry, entity, record))
            .collect()
    }

    /// Start an eager-loading query for an entity type
    pub fn query(&self, entity: &str) -> Query<'_> {
        Query::new(self, entity)
    }
}
