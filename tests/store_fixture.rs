//! Integration tests for JSON fixture stores and guard configuration files.

use std::fs;

use aclguard_core::{
    Ace, AceTuple, AclEntry, AclGuard, AclGuardError, Document, DocumentType, GuardConfig,
    MemoryIndex, MemoryStore, Principal,
};
use serde_json::json;
use tempfile::TempDir;

fn write_fixture(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("store.json");
    let fixture = json!({
        "types": [
            {
                "name": "User",
                "default_acl": [["allow", "everyone", ["view", "options"]]]
            },
            {"name": "Draft", "indexed": false, "pk_field": "slug"}
        ],
        "documents": [
            {
                "_type": "User",
                "_acl": [{"action": "allow", "principal": "user12", "permission": "view"}],
                "id": 12,
                "name": "twelve"
            }
        ]
    });
    fs::write(&path, serde_json::to_vec_pretty(&fixture).unwrap()).unwrap();
    path
}

#[test]
fn update_survives_persist_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);

    let store = MemoryStore::load(&path).unwrap();
    let index = MemoryIndex::from_store(&store);
    let mut guard = AclGuard::new(store, index);
    guard
        .update_ace(
            &Ace::new("allow", "user12", "view"),
            &Ace::new("deny", "user12", "view"),
            None,
        )
        .unwrap();
    guard.store().persist(&path).unwrap();

    let reloaded = MemoryStore::load(&path).unwrap();
    let user = reloaded.get("User", "12").unwrap();
    assert_eq!(user.acl, Some(vec![Ace::new("deny", "user12", "view")]));
    assert_eq!(
        user.field("name").map(aclguard_core::DocumentValue::to_json),
        Some(json!("twelve"))
    );
}

#[test]
fn fixture_types_carry_default_acls() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::load(write_fixture(&dir)).unwrap();
    let index = MemoryIndex::from_store(&store);
    let mut guard = AclGuard::new(store, index);

    let saved = guard
        .save_document(Document::new("User").with_field("id", json!(13)))
        .unwrap();
    assert_eq!(
        saved.acl,
        Some(vec![
            Ace::new("allow", "everyone", "view"),
            Ace::new("allow", "everyone", "options"),
        ])
    );
    assert_eq!(
        guard.get_acl("User", "13").unwrap(),
        Some(vec![
            AceTuple::allow(Principal::Everyone, "view"),
            AceTuple::allow(Principal::Everyone, "options"),
        ])
    );
}

#[test]
fn config_file_restricts_the_vocabulary() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.json");
    fs::write(
        &config_path,
        r#"{"permissions": ["view", "publish"], "max_relation_depth": 4}"#,
    )
    .unwrap();
    let config = GuardConfig::load(&config_path).unwrap();
    assert_eq!(config.max_relation_depth, 4);
    assert!(config.auth_enabled);

    let store = MemoryStore::new().with_type(DocumentType::new("User"));
    let mut guard = AclGuard::new(store, MemoryIndex::new())
        .with_config(config)
        .unwrap();
    guard
        .store_mut()
        .insert(Document::new("User").with_field("id", json!(1)))
        .unwrap();

    guard
        .set_acl(
            "User",
            "1",
            &[AclEntry::Tuple(AceTuple::allow("editor", "publish"))],
        )
        .unwrap();
    let err = guard
        .set_acl(
            "User",
            "1",
            &[AclEntry::Record(Ace::new("allow", "editor", "delete"))],
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid ACL permission value: delete. Valid values are: all, publish, view"
    );
}

#[test]
fn invalid_config_is_rejected() {
    let err = GuardConfig::from_json_str(r#"{"permissions": ["update"]}"#).unwrap_err();
    assert!(matches!(err, AclGuardError::InvalidConfig { .. }));
}

#[test]
fn missing_store_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = MemoryStore::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, AclGuardError::Io(_)));
}
