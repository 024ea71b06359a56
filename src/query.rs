//! Eager-loading query builder.
//!
//! A [`Query`] collects dot-path relation names (each with an optional
//! per-relation [`RelationQuery`] holding ordering specs) and applies them
//! over instances built fresh from the current snapshot, so store records
//! are never reachable — let alone mutable — through the returned graph.
//!
//! Traversal forces resolution at every hop, for single instances and
//! arrays alike. At the terminal hop any registered ordering is applied
//! with a stable comparator, then relationships are resolved exactly one
//! level deeper on the returned children so the next relation hop keeps
//! working. Anything below that stays unresolved until explicitly asked
//! for.
//!
//! # Example
//!
//! ```no_run
//! use lagoon::query::Order;
//! use lagoon::store::StoreHandle;
//!
//! # fn demo(handle: &StoreHandle) -> Result<(), lagoon::StoreError> {
//! let invoice = handle
//!     .query("invoices")
//!     .with_query("rows", |q| q.order_by("order", Order::Asc))
//!     .find(1)?;
//! # Ok(())
//! # }
//! ```

use crate::error::StoreError;
use crate::instance::{Instance, Related};
use crate::relation::Resolver;
use crate::store::StoreHandle;
use serde_json::Value;
use std::cmp::Ordering;

/// Sort direction for [`RelationQuery::order_by`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Natural value order
    Asc,
    /// Reversed natural order; ties keep their prior relative order
    Desc,
}

#[derive(Debug, Clone)]
struct OrderSpec {
    field: String,
    order: Order,
}

/// Ordering spec attached to one eager-loaded relation
#[derive(Debug, Clone, Default)]
pub struct RelationQuery {
    order: Vec<OrderSpec>,
}

impl RelationQuery {
    /// Create an empty relation sub-query
    pub fn new() -> Self {
        RelationQuery::default()
    }

    /// Order the relation's records by a field
    ///
    /// Specs are applied in registration order with a stable sort, so a
    /// later spec dominates while equal keys keep the order established by
    /// earlier specs.
    pub fn order_by(mut self, field: &str, order: Order) -> Self {
        self.order.push(OrderSpec {
            field: field.to_owned(),
            order,
        });
        self
    }

    fn apply(&self, items: &mut [Instance]) {
        for spec in &self.order {
            items.sort_by(|a, b| {
                let ordering = cmp_values(a.get(&spec.field), b.get(&spec.field));
                match spec.order {
                    Order::Asc => ordering,
                    Order::Desc => ordering.reverse(),
                }
            });
        }
    }
}

/// Relation paths accepted by [`Query::with`]
pub trait IntoRelationPaths {
    /// The dot-path relation names to eager-load
    fn into_paths(self) -> Vec<String>;
}

impl IntoRelationPaths for &str {
    fn into_paths(self) -> Vec<String> {
        vec![self.to_owned()]
    }
}

impl IntoRelationPaths for String {
    fn into_paths(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoRelationPaths for Vec<String> {
    fn into_paths(self) -> Vec<String> {
        self
    }
}

impl IntoRelationPaths for &[&str] {
    fn into_paths(self) -> Vec<String> {
        self.iter().map(|path| (*path).to_owned()).collect()
    }
}

impl<const N: usize> IntoRelationPaths for [&str; N] {
    fn into_paths(self) -> Vec<String> {
        self.iter().map(|path| (*path).to_owned()).collect()
    }
}

/// Fluent eager-loading query over one entity type
pub struct Query<'a> {
    handle: &'a StoreHandle,
    entity: String,
    relations: Vec<(String, RelationQuery)>,
}

impl<'a> Query<'a> {
    pub(crate) fn new(handle: &'a StoreHandle, entity: &str) -> Self {
        Query {
            handle,
            entity: entity.to_owned(),
            relations: Vec::new(),
        }
    }

    /// Request one or more relation paths, without ordering
    ///
    /// Paths may be nested with dots: `"posts.comments"` resolves `posts`
    /// on the base instance and `comments` on each post.
    pub fn with(mut self, paths: impl IntoRelationPaths) -> Self {
        for path in paths.into_paths() {
            self.relations.push((path, RelationQuery::new()));
        }
        self
    }

    /// Request a relation path with a configured sub-query
    pub fn with_query(
        mut self,
        path: &str,
        build: impl FnOnce(RelationQuery) -> RelationQuery,
    ) -> Self {
        self.relations
            .push((path.to_owned(), build(RelationQuery::new())));
        self
    }

    /// Locate the base instance and eager-load the requested relations
    ///
    /// Returns `Ok(None)` when no base instance exists.
    pub fn find(self, id: impl Into<Value>) -> Result<Option<Instance>, StoreError> {
        let Some(mut instance) = self.handle.find(&self.entity, &id.into())? else {
            return Ok(None);
        };

        let resolver = self.handle.resolver();
        for (path, sub) in &self.relations {
            let parts: Vec<&str> = path.split('.').collect();
            load_path(&mut instance, &parts, sub, &resolver)?;
        }
        Ok(Some(instance))
    }
}

/// Walk one dot path, forcing resolution at each hop
fn load_path(
    instance: &mut Instance,
    parts: &[&str],
    sub: &RelationQuery,
    resolver: &Resolver,
) -> Result<(), StoreError> {
    let Some((head, rest)) = parts.split_first() else {
        return Ok(());
    };
    resolver.resolve(instance, head)?;
    let Some(related) = instance.related_mut(head) else {
        return Ok(());
    };

    if rest.is_empty() {
        match related {
            Related::Many(items) => {
                sub.apply(items);
                // One extra level below the terminal hop, so nested paths
                // keep working on the returned children.
                for item in items {
                    resolver.resolve_all(item)?;
                }
            }
            Related::One(Some(item)) => resolver.resolve_all(item)?,
            Related::One(None) => {}
        }
    } else {
        match related {
            Related::Many(items) => {
                for item in items {
                    load_path(item, rest, sub, resolver)?;
                }
            }
            Related::One(Some(item)) => load_path(item, rest, sub, resolver)?,
            Related::One(None) => {}
        }
    }
    Ok(())
}

/// Compare two field values for ordering
///
/// Missing values sort first; numbers, strings and booleans compare
/// naturally; mixed or incomparable types are treated as equal so a stable
/// sort leaves them in their prior order.
fn cmp_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            _ => Ordering::Equal,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelOps;
    use crate::tests_cfg::{handle, Comment, Invoice, InvoiceRow, Post, User};
    use serde_json::json;

    #[tokio::test]
    async fn ordered_eager_load_is_stable() {
        let handle = handle();
        Invoice::create(&handle, json!({ "id": 1 })).await.unwrap();
        InvoiceRow::create(
            &handle,
            json!([
                { "id": 10, "invoiceId": 1, "order": 2 },
                { "id": 11, "invoiceId": 1, "order": 1 },
                { "id": 12, "invoiceId": 1, "order": 1 },
            ]),
        )
        .await
        .unwrap();

        let invoice = Invoice::query(&handle)
            .with_query("rows", |q| q.order_by("order", Order::Asc))
            .find(1)
            .unwrap()
            .unwrap();

        let rows = invoice.related("rows").and_then(Related::as_many).unwrap();
        let ids: Vec<&Value> = rows.iter().map(|row| row.get("id").unwrap()).collect();
        // Ties (rows 11 and 12) keep their collection order.
        assert_eq!(ids, vec![&json!(11), &json!(12), &json!(10)]);
    }

    #[tokio::test]
    async fn descending_order_reverses_without_breaking_ties() {
        let handle = handle();
        Invoice::create(&handle, json!({ "id": 1 })).await.unwrap();
        InvoiceRow::create(
            &handle,
            json!([
                { "id": 10, "invoiceId": 1, "order": 1 },
                { "id": 11, "invoiceId": 1, "order": 2 },
                { "id": 12, "invoiceId": 1, "order": 1 },
            ]),
        )
        .await
        .unwrap();

        let invoice = Invoice::query(&handle)
            .with_query("rows", |q| q.order_by("order", Order::Desc))
            .find(1)
            .unwrap()
            .unwrap();

        let rows = invoice.related("rows").and_then(Related::as_many).unwrap();
        let ids: Vec<&Value> = rows.iter().map(|row| row.get("id").unwrap()).collect();
        assert_eq!(ids, vec![&json!(11), &json!(10), &json!(12)]);
    }

    #[tokio::test]
    async fn later_order_specs_dominate_earlier_ones() {
        let handle = handle();
        Invoice::create(&handle, json!({ "id": 1 })).await.unwrap();
        InvoiceRow::create(
            &handle,
            json!([
                { "id": 10, "invoiceId": 1, "order": 2 },
                { "id": 12, "invoiceId": 1, "order": 1 },
                { "id": 11, "invoiceId": 1, "order": 1 },
            ]),
        )
        .await
        .unwrap();

        let invoice = Invoice::query(&handle)
            .with_query("rows", |q| {
                q.order_by("id", Order::Asc).order_by("order", Order::Asc)
            })
            .find(1)
            .unwrap()
            .unwrap();

        let rows = invoice.related("rows").and_then(Related::as_many).unwrap();
        let ids: Vec<&Value> = rows.iter().map(|row| row.get("id").unwrap()).collect();
        // Ties under the dominant spec fall back to the id pass, not to
        // collection order.
        assert_eq!(ids, vec![&json!(11), &json!(12), &json!(10)]);
    }

    #[tokio::test]
    async fn dot_paths_resolve_each_hop() {
        let handle = handle();
        User::create(&handle, json!({ "id": 1, "name": "ada" }))
            .await
            .unwrap();
        Post::create(
            &handle,
            json!([
                { "id": 10, "userId": 1 },
                { "id": 11, "userId": 1 },
            ]),
        )
        .await
        .unwrap();
        Comment::create(
            &handle,
            json!([
                { "id": 100, "postId": 10 },
                { "id": 101, "postId": 11 },
            ]),
        )
        .await
        .unwrap();

        let user = User::query(&handle)
            .with("posts.comments")
            .find(1)
            .unwrap()
            .unwrap();

        let posts = user.related("posts").and_then(Related::as_many).unwrap();
        for post in posts {
            let comments = post.related("comments").and_then(Related::as_many).unwrap();
            assert_eq!(comments.len(), 1);
        }
    }

    #[tokio::test]
    async fn terminal_hop_resolves_one_extra_level() {
        let handle = handle();
        User::create(&handle, json!({ "id": 1 })).await.unwrap();
        Post::create(&handle, json!({ "id": 10, "userId": 1 }))
            .await
            .unwrap();
        Comment::create(&handle, json!({ "id": 100, "postId": 10 }))
            .await
            .unwrap();

        let user = User::query(&handle).with("posts").find(1).unwrap().unwrap();

        let posts = user.related("posts").and_then(Related::as_many).unwrap();
        // Children below the terminal hop carry one resolved level.
        assert!(posts[0].related("comments").is_some());
    }

    #[tokio::test]
    async fn missing_base_instance_is_none() {
        let handle = handle();
        User::create(&handle, json!({ "id": 1 })).await.unwrap();
        assert!(User::query(&handle).with("posts").find(99).unwrap().is_none());
    }

    #[tokio::test]
    async fn query_graph_never_aliases_store_records() {
        let handle = handle();
        User::create(&handle, json!({ "id": 1, "name": "before" }))
            .await
            .unwrap();

        let user = User::query(&handle).find(1).unwrap().unwrap();
        // Later store changes leave the returned graph untouched.
        User::update(&handle, json!({ "id": 1, "name": "after" }))
            .await
            .unwrap();
        assert_eq!(user.get("name"), Some(&json!("before")));
    }
}
