//! Import Pipeline Tests
//!
//! End-to-end imports of single documents and bundles against both storage
//! backends.

use std::io::{Cursor, Write};

use serde_json::{json, Value};
use zip::write::SimpleFileOptions;

use schema_index::config::ImportConfig;
use schema_index::record::Branch;
use schema_index::{
    ContentHasher, FsIndex, ImportError, ImportKind, IndexName, MemoryIndex, RootEntryPolicy, SchemaImporter,
    Sha256Hasher, UploadedFile,
};

fn schema_base(name: &str) -> Value {
    json!({
        "@context": "https://odca.tech/v1",
        "name": name,
        "type": "spec/schema_base/1.0",
        "description": "",
        "classification": "GICS:45102010",
        "issued_by": "",
        "attributes": {"first_name": "Text", "birth_date": "Date"},
        "pii_attributes": ["first_name", "birth_date"]
    })
}

fn bundle(entries: &[(&str, &Value)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(&serde_json::to_vec_pretty(content).unwrap()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn memory_importer() -> SchemaImporter<MemoryIndex, Sha256Hasher> {
    SchemaImporter::new(MemoryIndex::new(), Sha256Hasher::new())
}

// =============================================================================
// Single documents
// =============================================================================

#[test]
fn test_identical_content_converges_on_one_record() {
    let doc = schema_base("Person");
    let bytes = serde_json::to_vec(&doc).unwrap();

    let left = memory_importer();
    let right = memory_importer();
    let a = left.import("acme", UploadedFile::from_bytes("person.json", bytes.clone())).unwrap();
    let b = right.import("acme", UploadedFile::from_bytes("person.json", bytes)).unwrap();

    assert_eq!(a, b);
    assert_eq!(a.hashlink, Sha256Hasher::new().hash(&doc));
    assert_eq!(
        left.storage().get(IndexName::SchemaBase, &a.id),
        right.storage().get(IndexName::SchemaBase, &b.id)
    );
    assert!(!left.name_available("acme", "Person").unwrap());
    assert!(left.name_available("globex", "Person").unwrap());
}

#[test]
fn test_reimport_same_namespace_keeps_record() {
    let importer = memory_importer();
    let bytes = serde_json::to_vec(&schema_base("Person")).unwrap();
    let first = importer.import("acme", UploadedFile::from_bytes("person.json", bytes.clone())).unwrap();
    let stored = importer.storage().get(IndexName::SchemaBase, &first.id);

    // The name check sees the first import
    let again = importer.import("acme", UploadedFile::from_bytes("person.json", bytes));
    assert!(matches!(again, Err(ImportError::ValidationFailed(_))));
    assert_eq!(importer.storage().get(IndexName::SchemaBase, &first.id), stored);
    assert_eq!(importer.storage().len(IndexName::SchemaBase), 1);
}

#[test]
fn test_taken_name_fails_validation() {
    let importer = memory_importer();
    let file = UploadedFile::from_bytes("person.json", serde_json::to_vec(&schema_base("Person")).unwrap());
    importer.import("acme", file).unwrap();

    let mut renamed = schema_base("Person");
    renamed["description"] = json!("another person");
    let again = UploadedFile::from_bytes("person2.json", serde_json::to_vec(&renamed).unwrap());

    let err = importer.import("acme", again).unwrap_err();
    let errors = err.field_errors().expect("validation failure");
    assert!(errors.get("name").is_some());
    assert_eq!(importer.storage().len(IndexName::SchemaBase), 1);
}

#[test]
fn test_missing_attributes_writes_nothing() {
    let importer = memory_importer();
    let mut doc = schema_base("Person");
    doc.as_object_mut().unwrap().remove("attributes");
    let file = UploadedFile::from_bytes("person.json", serde_json::to_vec(&doc).unwrap());

    match importer.import("acme", file) {
        Err(ImportError::ValidationFailed(errors)) => {
            assert!(errors.get("attributes").is_some());
        }
        other => panic!("Expected ValidationFailed, got {:?}", other),
    }
    assert_eq!(importer.storage().bulk_write_count(), 0);
}

#[test]
fn test_unsupported_extension_ignores_content() {
    let importer = memory_importer();
    let file = UploadedFile::from_bytes("schema.txt", b"\xff\xfe not even utf8".to_vec());

    assert!(matches!(
        importer.import("acme", file),
        Err(ImportError::UnsupportedFileType(ext)) if ext == "txt"
    ));
    assert!(importer.storage().is_empty());
}

#[test]
fn test_reserved_namespace_for_bundles() {
    let importer = memory_importer();
    let base = schema_base("Person");
    let file = UploadedFile::from_bytes("bundle.zip", bundle(&[("schema.json", &base)]));

    assert!(matches!(importer.import("_any", file), Err(ImportError::InvalidNamespace(_))));
    assert_eq!(importer.storage().bulk_write_count(), 0);
}

// =============================================================================
// Bundles
// =============================================================================

#[test]
fn test_bundle_writes_base_overlays_and_branch() {
    let importer = memory_importer();
    let hasher = Sha256Hasher::new();
    let base = schema_base("Person");
    let label = json!({"type": "spec/overlay/label/1.0", "language": "en"});
    let format = json!({"type": "spec/overlay/format/1.0", "attr_formats": {"birth_date": "DD/MM/YYYY"}});

    let file = UploadedFile::from_bytes(
        "person.zip",
        bundle(&[("schema.json", &base), ("a/x.json", &label), ("b/y.json", &format)]),
    );
    let outcome = importer.import("acme", file).unwrap();
    assert_eq!(outcome.kind, ImportKind::Branch);

    let storage = importer.storage();
    assert_eq!(storage.len(IndexName::SchemaBase), 1);
    assert_eq!(storage.len(IndexName::Overlay), 2);
    assert_eq!(storage.len(IndexName::Branch), 1);

    let base_link = hasher.hash(&base);
    let base_record = storage.get(IndexName::SchemaBase, &format!("acme/{}", base_link)).unwrap();
    let suggest = serde_json::to_value(&base_record).unwrap()["name-suggest"].clone();
    assert_eq!(suggest, json!(["acme", "Person"]));

    let branch_record = storage.get(IndexName::Branch, &outcome.id).unwrap();
    let branch: Branch = serde_json::from_value(branch_record.data).unwrap();
    assert_eq!(branch.schema_base, base_link);

    let mut expected = vec![hasher.hash(&label), hasher.hash(&format)];
    expected.sort();
    assert_eq!(branch.overlays, expected);
}

#[test]
fn test_stored_records_match_their_dri() {
    let importer = memory_importer();
    let hasher = Sha256Hasher::new();
    let base = schema_base("Person");
    let x = json!({"overlay": "x"});
    let y = json!({"overlay": "y"});

    importer
        .import(
            "acme",
            UploadedFile::from_bytes("person.zip", bundle(&[("schema.json", &base), ("a/x.json", &x), ("b/y.json", &y)])),
        )
        .unwrap();

    for index in IndexName::ALL {
        for record in importer.storage().records(index) {
            assert!(record.dri.verify(&hasher, &record.data), "{} record {} drifted", index, record.id);
            assert_eq!(record.id, format!("acme/{}", record.dri));
        }
    }
}

#[test]
fn test_branch_identity_ignores_entry_order() {
    let base = schema_base("Person");
    let x = json!({"overlay": "x"});
    let y = json!({"overlay": "y"});

    let first = memory_importer()
        .import(
            "acme",
            UploadedFile::from_bytes("one.zip", bundle(&[("schema.json", &base), ("a/x.json", &x), ("b/y.json", &y)])),
        )
        .unwrap();
    let second = memory_importer()
        .import(
            "acme",
            UploadedFile::from_bytes("two.zip", bundle(&[("b/y.json", &y), ("a/x.json", &x), ("schema.json", &base)])),
        )
        .unwrap();

    assert_eq!(first.hashlink, second.hashlink);
}

#[test]
fn test_bundle_without_overlays() {
    let importer = memory_importer();
    let base = schema_base("Person");
    let outcome = importer
        .import("acme", UploadedFile::from_bytes("solo.zip", bundle(&[("schema.json", &base)])))
        .unwrap();

    let branch = importer.storage().get(IndexName::Branch, &outcome.id).unwrap();
    assert_eq!(branch.data["overlays"], json!([]));
    assert_eq!(importer.storage().len(IndexName::Overlay), 0);
    // base + branch only
    assert_eq!(importer.storage().bulk_write_count(), 2);
}

#[test]
fn test_invalid_bundle_base_writes_nothing() {
    let importer = memory_importer();
    let mut base = schema_base("Person");
    base["attributes"] = json!({});
    let overlay = json!({"overlay": "x"});

    let result = importer.import(
        "acme",
        UploadedFile::from_bytes("bad.zip", bundle(&[("schema.json", &base), ("a/x.json", &overlay)])),
    );
    assert!(matches!(result, Err(ImportError::ValidationFailed(_))));
    assert!(importer.storage().is_empty());
}

#[test]
fn test_last_wins_policy() {
    let config = ImportConfig {
        root_entries: RootEntryPolicy::LastWins,
        ..ImportConfig::default()
    };
    let importer = SchemaImporter::with_config(MemoryIndex::new(), Sha256Hasher::new(), config);
    let first = schema_base("First");
    let second = schema_base("Second");

    importer
        .import("acme", UploadedFile::from_bytes("two.zip", bundle(&[("a.json", &first), ("b.json", &second)])))
        .unwrap();

    assert!(importer.name_available("acme", "First").unwrap());
    assert!(!importer.name_available("acme", "Second").unwrap());
}

// =============================================================================
// Directory-backed index
// =============================================================================

#[test]
fn test_fs_index_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let importer = SchemaImporter::new(FsIndex::open(dir.path()).unwrap(), Sha256Hasher::new());
    let base = schema_base("Person");
    let overlay = json!({"overlay": "x"});

    let outcome = importer
        .import("acme", UploadedFile::from_bytes("person.zip", bundle(&[("schema.json", &base), ("o/x.json", &overlay)])))
        .unwrap();

    let branch = importer
        .storage()
        .get(IndexName::Branch, "acme", outcome.hashlink.as_str())
        .unwrap()
        .expect("branch record");
    assert_eq!(branch.id, outcome.id);
    assert!(!importer.name_available("acme", "Person").unwrap());
    assert!(dir.path().join("overlay/acme").is_dir());
}
