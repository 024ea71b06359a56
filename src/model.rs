//! Typed model layer over the dynamic store core.
//!
//! An entity type is declared by implementing [`Model`]: a stable entity
//! name plus a field-definition function. The blanket [`ModelOps`] impl
//! then provides the full operation surface — registration, hydration,
//! async write actions, and synchronous reads — against any
//! [`StoreHandle`], mirroring a static-class API without any implicit
//! global state.
//!
//! # Example
//!
//! ```
//! use lagoon::model::{Model, ModelOps};
//! use lagoon::schema::FieldMap;
//! use lagoon::store::StoreHandle;
//! use serde_json::{json, Value};
//!
//! struct User;
//!
//! impl Model for User {
//!     const ENTITY: &'static str = "users";
//!
//!     fn fields() -> FieldMap {
//!         FieldMap::new()
//!             .attr("id", Value::Null)
//!             .attr("name", "")
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let handle = StoreHandle::in_memory();
//! User::create(&handle, json!({ "id": 1, "name": "ada" })).await?;
//! let user = User::find(&handle, 1)?.unwrap();
//! assert_eq!(user.get("name"), Some(&json!("ada")));
//! # Ok::<(), lagoon::StoreError>(())
//! # }).unwrap();
//! ```

use crate::error::StoreError;
use crate::instance::Instance;
use crate::mutation::Selector;
use crate::query::Query;
use crate::schema::FieldMap;
use crate::store::{ActionPayload, Store, StoreHandle};
use serde_json::Value;

/// An entity type: a stable name and its field definitions
pub trait Model: Send + Sync + Sized + 'static {
    /// Entity type name, the key under which records live in the store
    const ENTITY: &'static str;

    /// Declare this entity's fields
    ///
    /// Invoked at most once per registry; the result is cached.
    fn fields() -> FieldMap;
}

/// Store operations for a [`Model`], provided for every implementor
///
/// Each operation registers the entity type first (idempotent), so a model
/// is usable as soon as its type exists. Related entity types must be
/// registered too before their relationships can resolve — registering
/// each model once at startup via [`init`](Self::init) or
/// [`register`](Self::register) is the usual pattern.
#[allow(async_fn_in_trait)]
pub trait ModelOps: Model {
    /// Register this entity type with the handle's schema registry
    fn register(handle: &StoreHandle) {
        handle.register(Self::ENTITY, Self::fields);
    }

    /// Wire this entity type to the handle and hydrate from a snapshot
    ///
    /// Hydration only happens when `initial` differs by deep value from
    /// the current store; a deep-equal call publishes nothing and invokes
    /// no mutation.
    fn init(handle: &StoreHandle, initial: Store) -> Result<(), StoreError> {
        Self::register(handle);
        handle.init(initial)
    }

    /// Replace this entity's whole collection with the given data
    async fn create(handle: &StoreHandle, data: Value) -> Result<Vec<Instance>, StoreError> {
        Self::register(handle);
        handle
            .dispatch("create", ActionPayload::data(Self::ENTITY, data))
            .await
    }

    /// Append records; duplicate ids co-exist
    async fn insert(handle: &StoreHandle, data: Value) -> Result<Vec<Instance>, StoreError> {
        Self::register(handle);
        handle
            .dispatch("insert", ActionPayload::data(Self::ENTITY, data))
            .await
    }

    /// Replace records whose identity matches; unmatched items are dropped
    async fn update(handle: &StoreHandle, data: Value) -> Result<Vec<Instance>, StoreError> {
        Self::register(handle);
        handle
            .dispatch("update", ActionPayload::data(Self::ENTITY, data))
            .await
    }

    /// Replace in place on identity match, append otherwise
    async fn insert_or_update(
        handle: &StoreHandle,
        data: Value,
    ) -> Result<Vec<Instance>, StoreError> {
        Self::register(handle);
        handle
            .dispatch("insertOrUpdate", ActionPayload::data(Self::ENTITY, data))
            .await
    }

    /// Remove matching records, returning the removed instances in
    /// collection order
    async fn delete(
        handle: &StoreHandle,
        selector: impl Into<Selector>,
    ) -> Result<Vec<Instance>, StoreError> {
        Self::register(handle);
        handle
            .dispatch(
                "delete",
                ActionPayload::delete(Self::ENTITY, selector.into()),
            )
            .await
    }

    /// Empty this entity's collection
    async fn delete_all(handle: &StoreHandle) -> Result<(), StoreError> {
        Self::register(handle);
        handle
            .dispatch("deleteAll", ActionPayload::entity(Self::ENTITY))
            .await?;
        Ok(())
    }

    /// Empty every entity's collection
    async fn reset(handle: &StoreHandle) -> Result<(), StoreError> {
        handle.dispatch("reset", ActionPayload::Empty).await?;
        Ok(())
    }

    /// Locate one instance by id
    fn find(handle: &StoreHandle, id: impl Into<Value>) -> Result<Option<Instance>, StoreError> {
        Self::register(handle);
        handle.find(Self::ENTITY, &id.into())
    }

    /// All instances, in collection order
    fn all(handle: &StoreHandle) -> Result<Vec<Instance>, StoreError> {
        Self::register(handle);
        handle.all(Self::ENTITY)
    }

    /// Start an eager-loading query
    fn query(handle: &StoreHandle) -> Query<'_> {
        Self::register(handle);
        handle.query(Self::ENTITY)
    }
}

impl<M: Model> ModelOps for M {}

impl From<Value> for Selector {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(ids) => Selector::Ids(ids),
            single => Selector::Id(single),
        }
    }
}

impl From<i64> for Selector {
    fn from(id: i64) -> Self {
        Selector::id(id)
    }
}

impl From<&str> for Selector {
    fn from(id: &str) -> Self {
        Selector::id(id)
    }
}
