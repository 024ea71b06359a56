//! # Lagoon
//!
//! An in-process, normalized object-relational state layer for reactive UI
//! programs. Domain entities live as plain flat records in one store value
//! and are read back as hydrated instances with on-demand relationship
//! resolution and a composable eager-loading query builder.
//!
//! The store itself is owned by a [`store::StateContainer`] — the seam a
//! reactive state container plugs into — and every write flows through the
//! async action pipeline on [`store::StoreHandle`], which issues exactly
//! one serialized mutation commit per action.
//!
//! ```
//! use lagoon::model::{Model, ModelOps};
//! use lagoon::schema::FieldMap;
//! use lagoon::store::StoreHandle;
//! use serde_json::{json, Value};
//!
//! struct User;
//! struct Post;
//!
//! impl Model for User {
//!     const ENTITY: &'static str = "users";
//!     fn fields() -> FieldMap {
//!         FieldMap::new()
//!             .attr("id", Value::Null)
//!             .attr("name", "")
//!             .has_many("posts", "posts", "userId")
//!     }
//! }
//!
//! impl Model for Post {
//!     const ENTITY: &'static str = "posts";
//!     fn fields() -> FieldMap {
//!         FieldMap::new()
//!             .attr("id", Value::Null)
//!             .attr("userId", Value::Null)
//!             .attr("title", "")
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let handle = StoreHandle::in_memory();
//! Post::register(&handle);
//!
//! User::create(&handle, json!({ "id": 1, "name": "ada" })).await?;
//! Post::create(&handle, json!([{ "id": 10, "userId": 1, "title": "hi" }])).await?;
//!
//! let resolver = handle.resolver();
//! let mut user = User::find(&handle, 1)?.unwrap();
//! let posts = user.relation("posts", &resolver)?.as_many().unwrap();
//! assert_eq!(posts.len(), 1);
//! # Ok::<(), lagoon::StoreError>(())
//! # }).unwrap();
//! ```

pub mod error;
pub mod instance;
pub mod model;
pub mod mutation;
pub mod query;
pub mod record;
pub mod relation;
pub mod schema;
pub mod store;

#[cfg(test)]
pub(crate) mod tests_cfg;

pub use error::StoreError;
pub use instance::{Instance, Related};
pub use model::{Model, ModelOps};
pub use mutation::{MutationPayload, Selector};
pub use query::{Order, Query, RelationQuery};
pub use record::{normalize, NormalizedData, Record};
pub use relation::Resolver;
pub use schema::{Attribute, FieldDef, FieldMap, RelationDef, RelationKind, SchemaRegistry};
pub use store::{ActionPayload, InMemoryContainer, StateContainer, Store, StoreHandle};
