//! Per-entity schema cache.
//!
//! Entity types register a field-definition function once; the resulting
//! [`FieldMap`](super::FieldMap) is computed on first access and cached for
//! the lifetime of the registry. Registration is idempotent, so model-level
//! operations can re-register freely.

use crate::error::StoreError;
use crate::schema::FieldMap;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Field-definition function for one entity type
pub type FieldsFn = fn() -> FieldMap;

struct RegistryEntry {
    fields_fn: FieldsFn,
    schema: OnceCell<Arc<FieldMap>>,
}

/// Registry of entity schemas, computed at most once per entity type
///
/// The registry is the single source of truth for which entity types exist.
/// Normalization, instantiation, relationship resolution and predicate
/// deletes all consult it; an unregistered entity type fails those paths
/// with [`StoreError::SchemaMissing`].
#[derive(Default)]
pub struct SchemaRegistry {
    entries: RwLock<HashMap<String, Arc<RegistryEntry>>>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        SchemaRegistry::default()
    }

    /// Register a field-definition function for an entity type
    ///
    /// The function is *not* invoked here; fields are computed lazily on the
    /// first [`fields`](Self::fields) call. Re-registering an already known
    /// entity type is a no-op, which keeps the compute-once guarantee even
    /// when model operations register eagerly.
    pub fn register(&self, entity: &str, fields_fn: FieldsFn) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !entries.contains_key(entity) {
            log::trace!("registering entity type {entity}");
            entries.insert(
                entity.to_owned(),
                Arc::new(RegistryEntry {
                    fields_fn,
                    schema: OnceCell::new(),
                }),
            );
        }
    }

    /// Whether an entity type has been registered
    pub fn contains(&self, entity: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(entity)
    }

    /// Get the cached field map for an entity type
    ///
    /// Computes the map on first access by invoking the registered
    /// field-definition function, then returns the same `Arc` for every
    /// later call.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SchemaMissing`] if the entity type was never
    /// registered.
    pub fn fields(&self, entity: &str) -> Result<Arc<FieldMap>, StoreError> {
        let entry = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity)
            .cloned()
            .ok_or_else(|| StoreError::SchemaMissing(entity.to_owned()))?;

        Ok(entry
            .schema
            .get_or_init(|| Arc::new((entry.fields_fn)()))
            .clone())
    }
}
