//! Field descriptors for entity schemas.
//!
//! Every entity type declares an ordered mapping from field name to
//! [`FieldDef`]: either an [`Attribute`] (scalar data with a default) or a
//! [`RelationDef`] (a `belongs_to`/`has_many` link to another entity type).
//! The tagged union makes the attribute/relationship distinction statically
//! checkable instead of sniffing field shapes at runtime.
//!
//! # Example
//!
//! ```
//! use lagoon::schema::FieldMap;
//! use serde_json::Value;
//!
//! let fields = FieldMap::new()
//!     .attr("id", Value::Null)
//!     .attr("name", "")
//!     .has_many("posts", "posts", "userId");
//!
//! assert!(fields.get("posts").is_some());
//! ```

pub mod registry;

pub use registry::SchemaRegistry;

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Type of relationship between entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Many-to-one: this entity holds the foreign key
    BelongsTo,
    /// One-to-many: the related entity holds the foreign key
    HasMany,
}

/// Defines a relationship between two entity types
///
/// For `BelongsTo`, `foreign_key` names the field *on this entity* whose
/// value is matched against the related record's identity. For `HasMany`,
/// `foreign_key` names the field *on the related entity* whose value is
/// matched against this instance's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    /// Type of relationship
    pub kind: RelationKind,
    /// Related entity type name
    pub related: String,
    /// Foreign key field name
    pub foreign_key: String,
}

/// Default value source for an attribute
#[derive(Clone)]
pub enum AttributeDefault {
    /// A static default, cloned for each instance
    Value(Value),
    /// A zero-argument factory, invoked fresh per instance so mutable
    /// defaults are never shared
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl fmt::Debug for AttributeDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeDefault::Value(v) => f.debug_tuple("Value").field(v).finish(),
            AttributeDefault::Factory(_) => f.debug_tuple("Factory").field(&"..").finish(),
        }
    }
}

/// A scalar field with a default and a normalization rule
#[derive(Debug, Clone)]
pub struct Attribute {
    default: AttributeDefault,
}

impl Attribute {
    /// Create an attribute with a static default value
    pub fn new(default: impl Into<Value>) -> Self {
        Attribute {
            default: AttributeDefault::Value(default.into()),
        }
    }

    /// Create an attribute whose default is produced by a factory
    pub fn with_factory(factory: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Attribute {
            default: AttributeDefault::Factory(Arc::new(factory)),
        }
    }

    /// Resolve the stored value for this attribute
    ///
    /// Prefers `raw` whenever the input defined the field (an explicit JSON
    /// `null` counts as defined); otherwise evaluates the factory or clones
    /// the static default.
    pub fn make(&self, raw: Option<&Value>) -> Value {
        match raw {
            Some(value) => value.clone(),
            None => match &self.default {
                AttributeDefault::Value(v) => v.clone(),
                AttributeDefault::Factory(factory) => factory(),
            },
        }
    }
}

/// Tagged field descriptor: attribute or relationship
#[derive(Debug, Clone)]
pub enum FieldDef {
    /// Scalar data with a default
    Attribute(Attribute),
    /// Declarative link to another entity type
    Relation(RelationDef),
}

/// Ordered name → [`FieldDef`] mapping for one entity type
///
/// Field order follows declaration order; lookups are by name. Built
/// fluently by an entity's `fields()` function and cached by the
/// [`SchemaRegistry`] for the lifetime of the registry.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    fields: Vec<(String, FieldDef)>,
}

impl FieldMap {
    /// Create an empty field map
    pub fn new() -> Self {
        FieldMap { fields: Vec::new() }
    }

    fn push(mut self, name: &str, def: FieldDef) -> Self {
        self.fields.push((name.to_owned(), def));
        self
    }

    /// Declare an attribute with a static default value
    pub fn attr(self, name: &str, default: impl Into<Value>) -> Self {
        self.push(name, FieldDef::Attribute(Attribute::new(default)))
    }

    /// Declare an attribute defaulted by a zero-argument factory
    pub fn attr_with(
        self,
        name: &str,
        factory: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        self.push(name, FieldDef::Attribute(Attribute::with_factory(factory)))
    }

    /// Declare a `belongs_to` relationship
    ///
    /// `foreign_key` names the field on *this* entity holding the related
    /// record's id.
    pub fn belongs_to(self, name: &str, related: &str, foreign_key: &str) -> Self {
        self.push(
            name,
            FieldDef::Relation(RelationDef {
                kind: RelationKind::BelongsTo,
                related: related.to_owned(),
                foreign_key: foreign_key.to_owned(),
            }),
        )
    }

    /// Declare a `has_many` relationship
    ///
    /// `foreign_key` names the field on the *related* entity pointing back
    /// at this one.
    pub fn has_many(self, name: &str, related: &str, foreign_key: &str) -> Self {
        self.push(
            name,
            FieldDef::Relation(RelationDef {
                kind: RelationKind::HasMany,
                related: related.to_owned(),
                foreign_key: foreign_key.to_owned(),
            }),
        )
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, def)| def)
    }

    /// Iterate fields in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldDef)> {
        self.fields.iter().map(|(name, def)| (name.as_str(), def))
    }

    /// Iterate only the relationship fields, in declaration order
    pub fn relations(&self) -> impl Iterator<Item = (&str, &RelationDef)> {
        self.fields.iter().filter_map(|(name, def)| match def {
            FieldDef::Relation(rel) => Some((name.as_str(), rel)),
            FieldDef::Attribute(_) => None,
        })
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the map declares no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
