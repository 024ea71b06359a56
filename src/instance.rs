//! Hydrated read views over records.
//!
//! An [`Instance`] is built on demand from a flat [`Record`]: every
//! attribute field is present (defaulted through the schema when absent
//! from the input), relationship fields start unresolved and are attached
//! later as [`Related`] projections. Instances are disposable — they are
//! never stored and carry no obligation to track later store changes.

use crate::error::StoreError;
use crate::record::{record_identity, NormalizedData, Record};
use crate::relation::Resolver;
use crate::schema::{FieldDef, SchemaRegistry};
use serde::ser::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// A resolved relationship projection
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    /// `belongs_to` result: at most one related instance
    One(Option<Box<Instance>>),
    /// `has_many` result: related instances in collection order
    Many(Vec<Instance>),
}

impl Related {
    /// The single related instance, if this is a resolved `belongs_to`
    pub fn as_one(&self) -> Option<&Instance> {
        match self {
            Related::One(inst) => inst.as_deref(),
            Related::Many(_) => None,
        }
    }

    /// The related instances, if this is a resolved `has_many`
    pub fn as_many(&self) -> Option<&[Instance]> {
        match self {
            Related::Many(items) => Some(items),
            Related::One(_) => None,
        }
    }
}

/// A hydrated read view of one record
///
/// Attribute values live in `attrs`; resolved relationships live in a
/// separate `related` map so persisted state can never contain a cycle.
/// Serializing an instance (or calling [`to_object`](Self::to_object))
/// emits only attribute fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    entity: String,
    identity: Option<String>,
    attrs: Record,
    related: BTreeMap<String, Related>,
}

impl Instance {
    /// Entity type this instance belongs to
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Stable identity within the entity type's collection
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Get an attribute value by field name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attrs.get(field)
    }

    /// All attribute fields
    pub fn attrs(&self) -> &Record {
        &self.attrs
    }

    /// A resolved relationship projection, if one has been attached
    pub fn related(&self, field: &str) -> Option<&Related> {
        self.related.get(field)
    }

    /// Attribute-only object view, excluding every relationship projection
    ///
    /// This is the acyclic serialization shape; it round-trips through the
    /// store's wire format.
    pub fn to_object(&self) -> Value {
        Value::Object(self.attrs.clone())
    }

    /// The flat record persisted by the data mutations
    pub fn to_record(&self) -> Record {
        self.attrs.clone()
    }

    /// Resolve one relationship field on demand, caching the projection
    ///
    /// Computed on first read against the resolver's snapshot; later calls
    /// return the cached projection untouched, so a projection attached by
    /// the query builder (e.g. with ordering applied) is never clobbered.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::UnknownRelation`] when the field is not a
    /// relationship on this entity, or [`StoreError::SchemaMissing`] when
    /// the related entity type has no registered schema.
    pub fn relation(&mut self, field: &str, resolver: &Resolver) -> Result<&Related, StoreError> {
        if !self.related.contains_key(field) {
            let projected = resolver.project(self, field)?;
            self.related.insert(field.to_owned(), projected);
        }
        self.related
            .get(field)
            .ok_or_else(|| StoreError::unknown_relation(&self.entity, field))
    }

    /// Whether a projection for this field is already attached
    pub(crate) fn has_related(&self, field: &str) -> bool {
        self.related.contains_key(field)
    }

    /// Attach a projection unless one is already present
    pub(crate) fn attach_related(&mut self, field: &str, related: Related) {
        self.related.entry(field.to_owned()).or_insert(related);
    }

    /// Mutable access to an attached projection
    pub(crate) fn related_mut(&mut self, field: &str) -> Option<&mut Related> {
        self.related.get_mut(field)
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Attribute fields only; relationship projections stay out of the
        // wire shape.
        self.attrs.serialize(serializer)
    }
}

/// Build one instance from a flat record
///
/// Attribute fields are filled through the schema's defaults; fields in the
/// record that the schema does not declare are dropped from the view.
///
/// # Errors
///
/// Returns [`StoreError::SchemaMissing`] when the entity type has no
/// registered schema.
pub fn instantiate_record(
    registry: &SchemaRegistry,
    entity: &str,
    record: &Record,
) -> Result<Instance, StoreError> {
    let fields = registry.fields(entity)?;

    let mut attrs = Record::new();
    for (name, def) in fields.iter() {
        if let FieldDef::Attribute(attr) = def {
            attrs.insert(name.to_owned(), attr.make(record.get(name)));
        }
    }

    Ok(Instance {
        entity: entity.to_owned(),
        identity: record_identity(record),
        attrs,
        related: BTreeMap::new(),
    })
}

/// Build one instance per normalized record, in input order
pub fn instantiate(
    registry: &SchemaRegistry,
    normalized: &NormalizedData,
) -> Result<Vec<Instance>, StoreError> {
    normalized
        .records
        .iter()
        .map(|(_, record)| instantiate_record(registry, &normalized.entity, record))
        .collect()
}
