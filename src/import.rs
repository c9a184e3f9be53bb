//! Import orchestration
//!
//! Dispatches an uploaded file on its extension, validates the schema base,
//! and writes the resulting records. Nothing is written until validation
//! passes. Bundle writes go base, then overlays, then branch; a failure part
//! way through is surfaced as-is with no rollback.

use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::bundle::{self, Bundle};
use crate::config::ImportConfig;
use crate::error::{ImportError, Result};
use crate::hashlink::{ContentHasher, Hashlink};
use crate::record::{record_id, Branch, Record};
use crate::storage::{IndexName, StorageIndex};
use crate::validate::{NameValidator, SchemaValidator};

/// An uploaded file as received from the caller.
///
/// The content stream is only read once the file name has been accepted.
pub struct UploadedFile {
    pub filename: String,
    content: Box<dyn Read + Send>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content: impl Read + Send + 'static) -> Self {
        Self {
            filename: filename.into(),
            content: Box::new(content),
        }
    }

    /// Wrap content already held in memory
    pub fn from_bytes(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self::new(filename, Cursor::new(content.into()))
    }

    /// A file on disk, opened on first read
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(filename, LazyFile { path, file: None })
    }

    fn read_content(mut self) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        self.content.read_to_end(&mut content)?;
        Ok(content)
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("filename", &self.filename)
            .finish_non_exhaustive()
    }
}

struct LazyFile {
    path: PathBuf,
    file: Option<File>,
}

impl Read for LazyFile {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.file.is_none() {
            self.file = Some(File::open(&self.path)?);
        }
        match self.file.as_mut() {
            Some(file) => file.read(buf),
            None => Ok(0),
        }
    }
}

/// Recognized upload types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Json,
    Zip,
}

impl FileType {
    /// Classify by the trailing `.`-separated token, case-sensitive
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = filename.rsplit('.').next().unwrap_or_default();
        match extension {
            "json" => Ok(FileType::Json),
            "zip" => Ok(FileType::Zip),
            other => Err(ImportError::UnsupportedFileType(other.to_string())),
        }
    }
}

/// Which entity the returned identifier names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    SchemaBase,
    Branch,
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportKind::SchemaBase => write!(f, "schema_base"),
            ImportKind::Branch => write!(f, "branch"),
        }
    }
}

/// Result of a successful import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub kind: ImportKind,
    pub hashlink: Hashlink,
    /// Storage id, `namespace/hashlink`
    pub id: String,
}

/// The import entry point
pub struct SchemaImporter<S, H> {
    storage: S,
    hasher: H,
    config: ImportConfig,
}

impl<S: StorageIndex, H: ContentHasher> SchemaImporter<S, H> {
    pub fn new(storage: S, hasher: H) -> Self {
        Self::with_config(storage, hasher, ImportConfig::default())
    }

    pub fn with_config(storage: S, hasher: H, config: ImportConfig) -> Self {
        Self { storage, hasher, config }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Name-uniqueness check against the stored schema bases of `namespace`
    pub fn name_available(&self, namespace: &str, name: &str) -> Result<bool> {
        Ok(NameValidator::new(&self.storage, namespace).available(name)?)
    }

    /// Import a single schema base document or a bundle
    pub fn import(&self, namespace: &str, file: UploadedFile) -> Result<ImportOutcome> {
        if namespace == self.config.reserved_namespace {
            return Err(ImportError::InvalidNamespace(namespace.to_string()));
        }

        let file_type = FileType::from_filename(&file.filename)?;
        info!(namespace, filename = %file.filename, ?file_type, "importing schema");

        let content = file.read_content()?;
        let validator = SchemaValidator::new(NameValidator::new(&self.storage, namespace));

        let outcome = match file_type {
            FileType::Json => {
                let schema_base: Value = serde_json::from_slice(&content)?;
                self.check(&validator, namespace, &schema_base)?;
                let hashlink = self.store_schema_base(namespace, schema_base)?;
                ImportOutcome {
                    kind: ImportKind::SchemaBase,
                    id: record_id(namespace, &hashlink),
                    hashlink,
                }
            }
            FileType::Zip => {
                let bundle = bundle::extract(Cursor::new(content), &self.hasher, self.config.root_entries)?;
                self.check(&validator, namespace, &bundle.base.content)?;
                let hashlink = self.store_branch(namespace, bundle)?;
                ImportOutcome {
                    kind: ImportKind::Branch,
                    id: record_id(namespace, &hashlink),
                    hashlink,
                }
            }
        };

        info!(namespace, kind = %outcome.kind, hashlink = %outcome.hashlink, "import complete");
        Ok(outcome)
    }

    fn check(&self, validator: &SchemaValidator<'_, S>, namespace: &str, document: &Value) -> Result<()> {
        validator.validate(document).map_err(|err| {
            if let ImportError::ValidationFailed(errors) = &err {
                warn!(namespace, %errors, "schema base rejected");
            }
            err
        })
    }

    fn store_schema_base(&self, namespace: &str, schema_base: Value) -> Result<Hashlink> {
        let hashlink = self.hasher.hash(&schema_base);
        let record = Record::new(namespace, hashlink.clone(), schema_base);
        self.write(IndexName::SchemaBase, &[record])?;
        Ok(hashlink)
    }

    fn store_branch(&self, namespace: &str, bundle: Bundle) -> Result<Hashlink> {
        let overlay_hashlinks: Vec<Hashlink> = bundle.overlay_hashlinks().cloned().collect();
        let Bundle { base, overlays } = bundle;

        let base_hashlink = base.hashlink;
        let record = Record::new(namespace, base_hashlink.clone(), base.content).with_name_suggest();
        self.write(IndexName::SchemaBase, &[record])?;

        let overlays: Vec<Record> = overlays
            .into_iter()
            .map(|(hashlink, content)| Record::new(namespace, hashlink, content))
            .collect();
        if !overlays.is_empty() {
            self.write(IndexName::Overlay, &overlays)?;
        }

        let branch = Branch::new(base_hashlink, overlay_hashlinks).to_value();
        let branch_hashlink = self.hasher.hash(&branch);
        let record = Record::new(namespace, branch_hashlink.clone(), branch);
        self.write(IndexName::Branch, &[record])?;

        Ok(branch_hashlink)
    }

    fn write(&self, index: IndexName, records: &[Record]) -> Result<()> {
        debug!(%index, count = records.len(), "bulk write");
        self.storage.bulk_write(index, records)?;
        Ok(())
    }
}
