//! On-demand relationship resolution.
//!
//! A [`Resolver`] binds the schema registry to one store snapshot and
//! computes [`Related`] projections by foreign-key lookup. Resolution is
//! deferred until the data is actually needed — nothing is resolved at
//! instance construction — and a field the instance already carries is
//! skipped, so projections attached by the query builder (with ordering
//! applied) are never clobbered by a later lazy default.
//!
//! Children of a `has_many` projection are ordinary instances: multi-hop
//! chains resolve hop by hop, each against the same snapshot.

use crate::error::StoreError;
use crate::instance::{instantiate_record, Instance, Related};
use crate::record::identity_of;
use crate::schema::{FieldDef, RelationDef, RelationKind, SchemaRegistry};
use crate::store::Store;
use std::sync::Arc;

/// Resolves relationship fields against a fixed snapshot
pub struct Resolver {
    registry: Arc<SchemaRegistry>,
    snapshot: Arc<Store>,
}

impl Resolver {
    /// Create a resolver over a snapshot
    pub fn new(registry: Arc<SchemaRegistry>, snapshot: Arc<Store>) -> Self {
        Resolver { registry, snapshot }
    }

    /// Compute the projection for one relationship field
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownRelation`] when the field is not a relationship
    /// on the instance's entity type; [`StoreError::SchemaMissing`] when
    /// either entity type involved has no registered schema.
    pub fn project(&self, instance: &Instance, field: &str) -> Result<Related, StoreError> {
        let fields = self.registry.fields(instance.entity())?;
        match fields.get(field) {
            Some(FieldDef::Relation(def)) => match def.kind {
                RelationKind::BelongsTo => self.belongs_to(instance, def),
                RelationKind::HasMany => self.has_many(instance, def),
            },
            _ => Err(StoreError::unknown_relation(instance.entity(), field)),
        }
    }

    /// Resolve one field onto the instance, skipping if already attached
    pub fn resolve(&self, instance: &mut Instance, field: &str) -> Result<(), StoreError> {
        if instance.has_related(field) {
            return Ok(());
        }
        let projected = self.project(instance, field)?;
        instance.attach_related(field, projected);
        Ok(())
    }

    /// Resolve every relationship field one level deep
    ///
    /// Fields already attached are left untouched.
    pub fn resolve_all(&self, instance: &mut Instance) -> Result<(), StoreError> {
        let fields = self.registry.fields(instance.entity())?;
        let names: Vec<String> = fields
            .relations()
            .map(|(name, _)| name.to_owned())
            .collect();
        for name in names {
            self.resolve(instance, &name)?;
        }
        Ok(())
    }

    /// Scan the related collection for the record matching this instance's
    /// foreign-key value
    fn belongs_to(&self, instance: &Instance, def: &RelationDef) -> Result<Related, StoreError> {
        let target = instance.get(&def.foreign_key).and_then(identity_of);
        let Some(target) = target else {
            return Ok(Related::One(None));
        };

        if let Some(collection) = self.snapshot.get(&def.related) {
            for record in collection {
                if record.get("id").and_then(identity_of).as_deref() == Some(target.as_str()) {
                    let related = instantiate_record(&self.registry, &def.related, record)?;
                    return Ok(Related::One(Some(Box::new(related))));
                }
            }
        }
        Ok(Related::One(None))
    }

    /// Filter the related collection for records whose foreign key points
    /// back at this instance
    fn has_many(&self, instance: &Instance, def: &RelationDef) -> Result<Related, StoreError> {
        let Some(identity) = instance.identity() else {
            return Ok(Related::Many(Vec::new()));
        };

        let mut children = Vec::new();
        if let Some(collection) = self.snapshot.get(&def.related) {
            for record in collection {
                let points_back = record
                    .get(&def.foreign_key)
                    .and_then(identity_of)
                    .as_deref()
                    == Some(identity);
                if points_back {
                    children.push(instantiate_record(&self.registry, &def.related, record)?);
                }
            }
        }
        Ok(Related::Many(children))
    }
}
