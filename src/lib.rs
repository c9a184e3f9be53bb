//! Schema Index
//!
//! Content-addressed import pipeline for schema definitions. Every stored
//! object is identified by the hashlink of its content, so re-importing the
//! same document converges on the same record.
//!
//! ## Features
//!
//! - **Content Addressing**: SHA256 hashlinks over canonical JSON
//! - **Bundles**: zip archives split into one schema base plus overlays
//! - **Branches**: a base and the sorted set of overlays imported with it
//! - **Name Uniqueness**: schema base names are checked per namespace
//! - **Pluggable Storage**: in-memory and directory-backed indexes
//!
//! ## Bundle layout
//!
//! ```text
//! bundle.zip
//! ├── schema.json          <- schema base (archive root)
//! ├── labels/
//! │   └── en.json          <- overlay
//! └── formats/
//!     └── dates.json       <- overlay
//! ```

pub mod bundle;
pub mod config;
pub mod error;
pub mod hashlink;
pub mod import;
pub mod record;
pub mod storage;
pub mod validate;

pub use bundle::{Bundle, RootEntryPolicy};
pub use config::IndexConfig;
pub use error::{ImportError, Result};
pub use hashlink::{ContentHasher, Hashlink, Sha256Hasher};
pub use import::{ImportKind, ImportOutcome, SchemaImporter, UploadedFile};
pub use record::{Branch, Record};
pub use storage::{FsIndex, IndexName, MemoryIndex, StorageIndex};
pub use validate::{FieldErrors, NameValidator, SchemaValidator};
