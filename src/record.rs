//! Records written to the storage index
//!
//! All three entity kinds (schema base, overlay, branch) share one physical
//! shape: `{ id, namespace, DRI, data }`, with `id = namespace/hashlink`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::hashlink::Hashlink;

/// A stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// `namespace/hashlink`
    pub id: String,
    pub namespace: String,
    /// Digital Resource Identifier, the persisted name of the hashlink
    #[serde(rename = "DRI")]
    pub dri: Hashlink,
    /// The entity content, exactly as hashed
    pub data: Value,
    /// Autocomplete projection for schema bases
    #[serde(rename = "name-suggest", default, skip_serializing_if = "Option::is_none")]
    pub name_suggest: Option<NameSuggest>,
}

/// Denormalized `[namespace, schema name]` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSuggest(pub String, pub String);

impl Record {
    /// Create a record for `data` stored under `hashlink`
    pub fn new(namespace: &str, hashlink: Hashlink, data: Value) -> Self {
        Self {
            id: record_id(namespace, &hashlink),
            namespace: namespace.to_string(),
            dri: hashlink,
            data,
            name_suggest: None,
        }
    }

    /// Attach the name-suggestion projection when the data carries a string `name`
    pub fn with_name_suggest(mut self) -> Self {
        if let Some(name) = self.data.get("name").and_then(Value::as_str) {
            self.name_suggest = Some(NameSuggest(self.namespace.clone(), name.to_string()));
        }
        self
    }

    /// The `name` field of the stored data, if any
    pub fn data_name(&self) -> Option<&str> {
        self.data.get("name").and_then(Value::as_str)
    }
}

/// Build the storage id for a hashlink in a namespace
pub fn record_id(namespace: &str, hashlink: &Hashlink) -> String {
    format!("{}/{}", namespace, hashlink)
}

/// One schema base plus the overlays imported with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub schema_base: Hashlink,
    /// Sorted ascending, no duplicates
    pub overlays: Vec<Hashlink>,
}

impl Branch {
    pub fn new(schema_base: Hashlink, overlays: impl IntoIterator<Item = Hashlink>) -> Self {
        let mut overlays: Vec<Hashlink> = overlays.into_iter().collect();
        overlays.sort();
        overlays.dedup();
        Self { schema_base, overlays }
    }

    /// The value that is hashed and stored as the branch record's data
    pub fn to_value(&self) -> Value {
        json!({
            "schema_base": self.schema_base,
            "overlays": self.overlays,
        })
    }
}
