//! Entity registry: maps entity tags to record types.
//!
//! Registration is explicit and happens once per type, usually during program
//! start. Lookup, conflict check and insert run under one lock, so two threads
//! can never bind different types to the same tag.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use scribe_fields::FieldValue;
use tracing::{debug, trace, warn};

use crate::codec::{decode_line, ParseFilter};
use crate::error::{Result, ScribeError};
use crate::record::Record;
use crate::schema::RecordType;

static GLOBAL_REGISTRY: Lazy<Arc<EntityRegistry>> = Lazy::new(|| Arc::new(EntityRegistry::new()));

/// Mapping from entity tag to record type.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    types: Mutex<HashMap<String, Arc<RecordType>>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry. Entries are never removed.
    pub fn global() -> &'static Arc<EntityRegistry> {
        &GLOBAL_REGISTRY
    }

    /// Bind a record type to its entity tag.
    ///
    /// Registering the same type again is a no-op; registering a different
    /// type under a tag that is already bound fails with `EntityConflict`.
    pub fn register(&self, record_type: &Arc<RecordType>) -> Result<()> {
        let entity = record_type.entity();
        let mut types = self.lock();
        match types.get(entity) {
            Some(existing) if Arc::ptr_eq(existing, record_type) => {
                trace!(%entity, "record type already registered");
                Ok(())
            }
            Some(_) => {
                warn!(%entity, "entity already bound to a different record type");
                Err(ScribeError::EntityConflict {
                    entity: entity.to_string(),
                })
            }
            None => {
                types.insert(entity.to_string(), Arc::clone(record_type));
                debug!(%entity, fields = record_type.fields().len(), "registered record type");
                Ok(())
            }
        }
    }

    /// Look up the record type bound to `entity`.
    pub fn resolve(&self, entity: &str) -> Result<Arc<RecordType>> {
        self.lock()
            .get(entity)
            .cloned()
            .ok_or_else(|| ScribeError::UnknownEntity {
                entity: entity.to_string(),
            })
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.lock().contains_key(entity)
    }

    /// Registered entity tags, sorted.
    pub fn entities(&self) -> Vec<String> {
        let mut entities: Vec<String> = self.lock().keys().cloned().collect();
        entities.sort();
        entities
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Resolve `entity` and construct a record from keyword values.
    pub fn instantiate<I, K, V>(&self, entity: &str, overrides: I) -> Result<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let record_type = self.resolve(entity)?;
        Record::new(&record_type, overrides)
    }

    /// Parse a line produced by `encode_line` back into a record.
    ///
    /// Filtered-out keys are not passed to the constructor, so those fields
    /// take their defaults. The line's write timestamp becomes the record's
    /// `log_created_at`.
    pub fn parse(&self, line: &str, filter: &ParseFilter) -> Result<Record> {
        let decoded = decode_line(line)?;
        let pairs = filter.apply(decoded.pairs);
        let mut record = self.instantiate(&decoded.entity, pairs)?;
        record.set_log_created_at(decoded.written_at);
        Ok(record)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<RecordType>>> {
        // Every critical section leaves the map consistent, so a poisoned lock is safe to reuse.
        self.types.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
