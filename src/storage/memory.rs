//! In-process storage index

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::{CountFilter, IndexName, StorageError, StorageIndex};
use crate::record::Record;

/// Storage index held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryIndex {
    indices: RwLock<HashMap<IndexName, BTreeMap<String, Record>>>,
    bulk_writes: AtomicUsize,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a record by id
    pub fn get(&self, index: IndexName, id: &str) -> Option<Record> {
        self.indices.read().get(&index).and_then(|records| records.get(id).cloned())
    }

    /// Number of records in an index
    pub fn len(&self, index: IndexName) -> usize {
        self.indices.read().get(&index).map(BTreeMap::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.indices.read().values().all(BTreeMap::is_empty)
    }

    /// All records in an index, ordered by id
    pub fn records(&self, index: IndexName) -> Vec<Record> {
        self.indices
            .read()
            .get(&index)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    /// How many `bulk_write` calls have been served
    pub fn bulk_write_count(&self) -> usize {
        self.bulk_writes.load(Ordering::SeqCst)
    }
}

impl StorageIndex for MemoryIndex {
    fn bulk_write(&self, index: IndexName, records: &[Record]) -> Result<(), StorageError> {
        self.bulk_writes.fetch_add(1, Ordering::SeqCst);
        let mut indices = self.indices.write();
        let target = indices.entry(index).or_default();
        for record in records {
            target.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    fn count(&self, index: IndexName, filter: &CountFilter) -> Result<u64, StorageError> {
        let count = self
            .indices
            .read()
            .get(&index)
            .map(|records| records.values().filter(|r| filter.matches(r)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }
}
