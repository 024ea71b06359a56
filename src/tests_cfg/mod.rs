//! Entity definitions shared by the unit tests.

use crate::model::{Model, ModelOps};
use crate::schema::FieldMap;
use crate::store::StoreHandle;
use serde_json::{json, Value};

pub struct User;

impl Model for User {
    const ENTITY: &'static str = "users";

    fn fields() -> FieldMap {
        FieldMap::new()
            .attr("id", Value::Null)
            .attr("name", "")
            .has_many("posts", Post::ENTITY, "userId")
    }
}

pub struct Post;

impl Model for Post {
    const ENTITY: &'static str = "posts";

    fn fields() -> FieldMap {
        FieldMap::new()
            .attr("id", Value::Null)
            .attr("userId", Value::Null)
            .attr("title", "")
            .belongs_to("author", User::ENTITY, "userId")
            .has_many("comments", Comment::ENTITY, "postId")
    }
}

pub struct Comment;

impl Model for Comment {
    const ENTITY: &'static str = "comments";

    fn fields() -> FieldMap {
        FieldMap::new()
            .attr("id", Value::Null)
            .attr("postId", Value::Null)
            .attr("content", "")
    }
}

pub struct Invoice;

impl Model for Invoice {
    const ENTITY: &'static str = "invoices";

    fn fields() -> FieldMap {
        FieldMap::new()
            .attr("id", Value::Null)
            .attr("label", "")
            .has_many("rows", InvoiceRow::ENTITY, "invoiceId")
    }
}

pub struct InvoiceRow;

impl Model for InvoiceRow {
    const ENTITY: &'static str = "invoiceRows";

    fn fields() -> FieldMap {
        FieldMap::new()
            .attr("id", Value::Null)
            .attr("invoiceId", Value::Null)
            .attr("order", Value::Null)
            // Factory default: each row gets its own empty list.
            .attr_with("tags", || json!([]))
    }
}

/// A handle with every test entity registered
pub fn handle() -> StoreHandle {
    let handle = StoreHandle::in_memory();
    User::register(&handle);
    Post::register(&handle);
    Comment::register(&handle);
    Invoice::register(&handle);
    InvoiceRow::register(&handle);
    handle
}
