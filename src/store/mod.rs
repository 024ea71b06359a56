//! The store value and the state-container seam.
//!
//! The whole store is one value: entity type name → ordered record
//! collection. Lagoon never owns the live state directly; it proposes new
//! values through a [`StateContainer`], the seam a reactive UI container
//! plugs into. The bundled [`InMemoryContainer`] applies mutations under a
//! single writer lock, which is all the serialization the concurrency model
//! requires: each mutation always sees the most recent committed store.

pub mod handle;

pub use handle::{ActionPayload, StoreHandle};

use crate::error::StoreError;
use crate::mutation::{self, MutationPayload};
use crate::record::Record;
use crate::schema::SchemaRegistry;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// The whole-store value: entity type name → ordered record collection
///
/// This is also the persisted/wire shape — it serializes to a JSON object
/// mapping entity names to arrays of flat records. Relationship data is
/// never embedded.
pub type Store = BTreeMap<String, Vec<Record>>;

/// The reactive state container collaborator
///
/// Implementations own the live state value. `commit` must apply the named
/// mutation against the *latest* committed store and publish the result;
/// concurrent commits must be serialized (queue, actor, or mutex), or
/// interleaved writers will drop updates.
pub trait StateContainer: Send + Sync {
    /// Apply one named mutation and publish the resulting store
    fn commit(&self, mutation: &str, payload: MutationPayload) -> Result<(), StoreError>;

    /// The most recently committed store value
    fn read_snapshot(&self) -> Arc<Store>;
}

/// Default container: a mutex-guarded store value
///
/// Commit application happens entirely under the lock, so mutations are
/// applied one at a time against the latest store. A mutation that leaves
/// the value unchanged (a deep-equal `hydrate`) keeps the existing `Arc`,
/// observable via [`Arc::ptr_eq`].
pub struct InMemoryContainer {
    registry: Arc<SchemaRegistry>,
    state: Mutex<Arc<Store>>,
}

impl InMemoryContainer {
    /// Create an empty container sharing the given registry
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        InMemoryContainer {
            registry,
            state: Mutex::new(Arc::new(Store::new())),
        }
    }

    /// Create a container seeded with an initial store value
    pub fn with_state(registry: Arc<SchemaRegistry>, initial: Store) -> Self {
        InMemoryContainer {
            registry,
            state: Mutex::new(Arc::new(initial)),
        }
    }
}

impl StateContainer for InMemoryContainer {
    fn commit(&self, mutation: &str, payload: MutationPayload) -> Result<(), StoreError> {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let next = mutation::apply(&guard, mutation, payload, &self.registry)?;
        *guard = next;
        Ok(())
    }

    fn read_snapshot(&self) -> Arc<Store> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
