//! Storage index boundary
//!
//! The importer only needs two operations from its backing store: upsert a
//! batch of records by id, and count schema bases matching a namespace and
//! name. Backends live in submodules.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::Record;

pub mod fs;
pub mod memory;

pub use fs::FsIndex;
pub use memory::MemoryIndex;

/// The three logically separate collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexName {
    SchemaBase,
    Overlay,
    Branch,
}

impl IndexName {
    pub const ALL: [IndexName; 3] = [IndexName::SchemaBase, IndexName::Overlay, IndexName::Branch];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexName::SchemaBase => "schema_base",
            IndexName::Overlay => "overlay",
            IndexName::Branch => "branch",
        }
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact-match filter on a record's namespace and `data.name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountFilter {
    pub namespace: String,
    pub name: String,
}

impl CountFilter {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.namespace == self.namespace && record.data_name() == Some(self.name.as_str())
    }
}

/// Errors raised by a storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Index rejected request: {0}")]
    Rejected(String),
}

/// A document store addressable by id
pub trait StorageIndex: Send + Sync {
    /// Upsert `records` into `index`, keyed by record id
    fn bulk_write(&self, index: IndexName, records: &[Record]) -> Result<(), StorageError>;

    /// Count records in `index` matching `filter`
    fn count(&self, index: IndexName, filter: &CountFilter) -> Result<u64, StorageError>;
}

impl<S: StorageIndex + ?Sized> StorageIndex for &S {
    fn bulk_write(&self, index: IndexName, records: &[Record]) -> Result<(), StorageError> {
        (**self).bulk_write(index, records)
    }

    fn count(&self, index: IndexName, filter: &CountFilter) -> Result<u64, StorageError> {
        (**self).count(index, filter)
    }
}

impl<S: StorageIndex + ?Sized> StorageIndex for std::sync::Arc<S> {
    fn bulk_write(&self, index: IndexName, records: &[Record]) -> Result<(), StorageError> {
        (**self).bulk_write(index, records)
    }

    fn count(&self, index: IndexName, filter: &CountFilter) -> Result<u64, StorageError> {
        (**self).count(index, filter)
    }
}

impl<S: StorageIndex + ?Sized> StorageIndex for Box<S> {
    fn bulk_write(&self, index: IndexName, records: &[Record]) -> Result<(), StorageError> {
        (**self).bulk_write(index, records)
    }

    fn count(&self, index: IndexName, filter: &CountFilter) -> Result<u64, StorageError> {
        (**self).count(index, filter)
    }
}
