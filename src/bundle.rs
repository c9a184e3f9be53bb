//! Bundle extraction
//!
//! A bundle is a zip archive holding one schema base at the archive root and
//! any number of overlays nested in subdirectories. Classification is purely
//! structural: directory depth decides, file names do not.

use std::collections::BTreeMap;
use std::io::{Read, Seek};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ImportError, Result};
use crate::hashlink::{ContentHasher, Hashlink};

/// What to do when more than one file sits at the archive root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootEntryPolicy {
    /// Fail with `MalformedArchiveEntry` on the second root file
    #[default]
    Reject,
    /// Keep the last root file processed as the schema base
    LastWins,
}

/// A decomposed bundle
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    pub base: BundleEntry,
    /// Overlays keyed by hashlink; identical content collapses to one entry
    pub overlays: BTreeMap<Hashlink, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BundleEntry {
    pub path: String,
    pub hashlink: Hashlink,
    pub content: Value,
}

impl Bundle {
    /// Overlay hashlinks in ascending order
    pub fn overlay_hashlinks(&self) -> impl Iterator<Item = &Hashlink> {
        self.overlays.keys()
    }
}

/// Split a zip archive into its schema base and overlays
pub fn extract<R, H>(reader: R, hasher: &H, policy: RootEntryPolicy) -> Result<Bundle>
where
    R: Read + Seek,
    H: ContentHasher + ?Sized,
{
    let mut archive = zip::ZipArchive::new(reader)?;
    let mut base: Option<BundleEntry> = None;
    let mut overlays = BTreeMap::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if !file.is_file() {
            continue;
        }

        let path = file.name().trim_start_matches('/').to_string();
        if path.is_empty() {
            continue;
        }

        let mut raw = Vec::new();
        file.read_to_end(&mut raw).map_err(|e| ImportError::MalformedArchiveEntry {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let content: Value = serde_json::from_slice(&raw).map_err(|e| ImportError::MalformedArchiveEntry {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let hashlink = hasher.hash(&content);

        if path.contains('/') {
            debug!(%path, %hashlink, "overlay entry");
            overlays.insert(hashlink, content);
            continue;
        }

        debug!(%path, %hashlink, "schema base entry");
        if let Some(previous) = &base {
            match policy {
                RootEntryPolicy::Reject => {
                    return Err(ImportError::MalformedArchiveEntry {
                        path,
                        reason: format!("second root-level entry, '{}' is already the schema base", previous.path),
                    });
                }
                RootEntryPolicy::LastWins => {
                    warn!(replaced = %previous.path, %path, "multiple root-level entries, keeping the last");
                }
            }
        }
        base = Some(BundleEntry { path, hashlink, content });
    }

    let base = base.ok_or_else(|| ImportError::MalformedArchiveEntry {
        path: "<archive root>".to_string(),
        reason: "no base schema at archive root".to_string(),
    })?;

    Ok(Bundle { base, overlays })
}
