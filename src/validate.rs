//! Schema base validation
//!
//! Structural rules are checked field by field and every violation is
//! collected, so one response reports all problems. The name-availability
//! rule consults the storage index through [`NameValidator`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ImportError, Result};
use crate::storage::{CountFilter, IndexName, StorageError, StorageIndex};

pub const NAME_TAKEN: &str = "Schema Base name is taken in that namespace";

/// Field-scoped validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Messages recorded for `field`
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{} {}", field, messages.join(", ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Checks whether a schema base name is still free in a namespace
pub struct NameValidator<'a, S: StorageIndex + ?Sized> {
    storage: &'a S,
    namespace: &'a str,
}

impl<'a, S: StorageIndex + ?Sized> NameValidator<'a, S> {
    pub fn new(storage: &'a S, namespace: &'a str) -> Self {
        Self { storage, namespace }
    }

    /// True iff no stored schema base in the namespace carries `name`.
    ///
    /// Advisory only: a concurrent import of the same name can pass too.
    pub fn available(&self, name: &str) -> std::result::Result<bool, StorageError> {
        let filter = CountFilter::new(self.namespace, name);
        let total = self.storage.count(IndexName::SchemaBase, &filter)?;
        Ok(total == 0)
    }
}

/// Validates candidate schema base documents
pub struct SchemaValidator<'a, S: StorageIndex + ?Sized> {
    names: NameValidator<'a, S>,
}

enum Rule {
    /// Non-empty string
    FilledString,
    /// Any string, possibly empty
    String,
    /// Non-empty object
    FilledHash,
    /// Any array, possibly empty
    Array,
}

const RULES: &[(&str, Rule)] = &[
    ("@context", Rule::FilledString),
    ("name", Rule::FilledString),
    ("type", Rule::FilledString),
    ("description", Rule::String),
    ("classification", Rule::String),
    ("issued_by", Rule::String),
    ("attributes", Rule::FilledHash),
    ("pii_attributes", Rule::Array),
];

impl<'a, S: StorageIndex + ?Sized> SchemaValidator<'a, S> {
    pub fn new(names: NameValidator<'a, S>) -> Self {
        Self { names }
    }

    /// Validate `document`, reporting every violation at once
    pub fn validate(&self, document: &Value) -> Result<()> {
        let errors = self.collect_errors(document)?;
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ImportError::ValidationFailed(errors))
        }
    }

    /// Run all rules and return the collected field errors.
    ///
    /// Only a storage failure during the name check aborts early.
    pub fn collect_errors(&self, document: &Value) -> Result<FieldErrors> {
        let mut errors = structural_errors(document);

        if errors.get("name").is_none() {
            if let Some(name) = document.get("name").and_then(Value::as_str) {
                if !self.names.available(name)? {
                    errors.add("name", NAME_TAKEN);
                }
            }
        }

        Ok(errors)
    }
}

/// Check the field shape rules without consulting storage
pub fn structural_errors(document: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();

    let Some(object) = document.as_object() else {
        errors.add("<root>", "must be a hash");
        return errors;
    };

    for (field, rule) in RULES {
        let Some(value) = object.get(*field) else {
            errors.add(*field, "is missing");
            continue;
        };

        match rule {
            Rule::FilledString => match value.as_str() {
                None => errors.add(*field, "must be a string"),
                Some(s) if s.is_empty() => errors.add(*field, "must be filled"),
                Some(_) => {}
            },
            Rule::String => {
                if !value.is_string() {
                    errors.add(*field, "must be a string");
                }
            }
            Rule::FilledHash => match value.as_object() {
                None => errors.add(*field, "must be a hash"),
                Some(map) if map.is_empty() => errors.add(*field, "must be filled"),
                Some(_) => {}
            },
            Rule::Array => {
                if !value.is_array() {
                    errors.add(*field, "must be an array");
                }
            }
        }
    }

    errors
}
