//! Directory-backed storage index
//!
//! Layout: `<root>/<index>/<namespace>/<hashlink>.json`
//!
//! ```text
//! index/
//! ├── schema_base/
//! │   └── acme/
//! │       └── 3f1c…e9.json
//! ├── overlay/
//! └── branch/
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{CountFilter, IndexName, StorageError, StorageIndex};
use crate::record::Record;

/// Storage index persisted as one pretty-printed JSON file per record
#[derive(Debug, Clone)]
pub struct FsIndex {
    root: PathBuf,
}

impl FsIndex {
    /// Open an index rooted at `path`, creating the index directories
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = path.as_ref().to_path_buf();
        for index in IndexName::ALL {
            fs::create_dir_all(root.join(index.as_str()))?;
        }
        Ok(Self { root })
    }

    /// Get the root path of the index
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read a record back by namespace and hashlink
    pub fn get(&self, index: IndexName, namespace: &str, hashlink: &str) -> Result<Option<Record>, StorageError> {
        let path = self.record_path(index, namespace, hashlink)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn namespace_dir(&self, index: IndexName, namespace: &str) -> Result<PathBuf, StorageError> {
        check_component("namespace", namespace)?;
        Ok(self.root.join(index.as_str()).join(namespace))
    }

    fn record_path(&self, index: IndexName, namespace: &str, hashlink: &str) -> Result<PathBuf, StorageError> {
        check_component("hashlink", hashlink)?;
        Ok(self.namespace_dir(index, namespace)?.join(format!("{}.json", hashlink)))
    }

    fn write_record(&self, index: IndexName, record: &Record) -> Result<(), StorageError> {
        let path = self.record_path(index, &record.namespace, record.dri.as_str())?;

        let dir = path.parent().unwrap_or(self.root.as_path());
        fs::create_dir_all(dir)?;

        // Each writer gets its own temp file; the rename publishes a complete record
        let content = serde_json::to_string_pretty(record)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".json.tmp")
            .tempfile_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Reject path components that could escape the index root
fn check_component(kind: &str, value: &str) -> Result<(), StorageError> {
    if value.is_empty() || value.starts_with('.') || value.contains(['/', '\\']) {
        return Err(StorageError::Rejected(format!("invalid {} '{}'", kind, value)));
    }
    Ok(())
}

impl StorageIndex for FsIndex {
    fn bulk_write(&self, index: IndexName, records: &[Record]) -> Result<(), StorageError> {
        // Validate the whole batch before touching disk
        for record in records {
            self.record_path(index, &record.namespace, record.dri.as_str())?;
        }
        for record in records {
            self.write_record(index, record)?;
        }
        Ok(())
    }

    fn count(&self, index: IndexName, filter: &CountFilter) -> Result<u64, StorageError> {
        let dir = self.namespace_dir(index, &filter.namespace)?;
        if !dir.exists() {
            return Ok(0);
        }

        let mut count = 0;
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| StorageError::Rejected(e.to_string()))?;
            let path = entry.path();
            let is_record = entry.file_type().is_file()
                && path.extension().map(|ext| ext == "json").unwrap_or(false)
                && !entry.file_name().to_string_lossy().starts_with('.');
            if !is_record {
                continue;
            }

            let content = fs::read_to_string(path)?;
            let record: Record = serde_json::from_str(&content)?;
            if filter.matches(&record) {
                count += 1;
            }
        }
        Ok(count)
    }
}
