//! Integration tests for saving and reading items

mod common;

use keychain::keychain::{AccessProtection, Authentication, ItemMetadata, KeychainError};
use keychain::prelude::*;
use keychain::store::{
    AttrKey, Attributes, MatchLimit, Query, RecordClass, SecureStore, StoreError,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Account {
    user: String,
    token: String,
    scopes: Vec<String>,
}

fn account() -> Account {
    Account {
        user: "alice".to_string(),
        token: "t0k3n".to_string(),
        scopes: vec!["read".to_string(), "write".to_string()],
    }
}

#[test]
fn test_encrypted_object_roundtrip() {
    let keychain = common::keychain().encrypt_items();
    let value = account();

    keychain.save_object(&value, "account", None, None).unwrap();
    let read: Account = keychain.object("account", None).unwrap();
    assert_eq!(read, value);

    // the stored payload is ciphertext, and the metadata says so
    let plaintext = serde_json::to_vec(&value).unwrap();
    let record = common::raw_item(&keychain, "account", "tests");
    assert_ne!(record.get_data(AttrKey::ValueData).unwrap(), &plaintext[..]);

    let metadata = ItemMetadata::from_label(record.get_string(AttrKey::Label));
    assert_eq!(metadata.item_type, ItemType::Structured);
    let encryption = metadata.encryption.unwrap();
    assert!(!encryption.is_empty());

    let key_pair = keychain
        .key_pair(None, Some(ITEM_ENCRYPTION_KEY_TAG))
        .unwrap();
    assert_eq!(encryption, key_pair.public_key.uncompressed());
}

#[test]
fn test_encrypted_items_are_local_and_invisible() {
    let options = Options {
        synchronizable: true,
        invisible: false,
        ..Options::default_encrypt_items()
    };
    let keychain = common::keychain();
    keychain
        .save_string("secret", "note", None, Some(&options))
        .unwrap();

    let item = keychain.item_attributes("note", None).unwrap();
    assert!(item.is_encrypted());
    assert!(!item.synchronizable);
    assert!(item.invisible);
    assert_eq!(item.item_type, ItemType::String);
    assert_eq!(keychain.string("note", None).unwrap(), "secret");
}

#[test]
fn test_plain_roundtrip() {
    let keychain = common::keychain();
    let value = account();

    keychain.save_object(&value, "account", None, None).unwrap();
    let read: Account = keychain.object("account", None).unwrap();
    assert_eq!(read, value);

    let record = common::raw_item(&keychain, "account", "tests");
    assert_eq!(
        record.get_data(AttrKey::ValueData).unwrap(),
        &serde_json::to_vec(&value).unwrap()[..]
    );
    let metadata = ItemMetadata::from_label(record.get_string(AttrKey::Label));
    assert_eq!(metadata.item_type, ItemType::Structured);
    assert_eq!(metadata.encryption, None);

    // no item was encrypted, so no encryption key was created
    assert!(keychain
        .key_pairs(None, Some(ITEM_ENCRYPTION_KEY_TAG))
        .unwrap()
        .is_empty());
}

#[test]
fn test_string_and_data() {
    let keychain = common::keychain().encrypt_items();
    keychain.save_string("héllo", "greeting", None, None).unwrap();
    keychain
        .save_data(&[0, 159, 146, 150], "blob", Some("binary"), None)
        .unwrap();

    assert_eq!(keychain.string("greeting", None).unwrap(), "héllo");
    assert_eq!(
        keychain.data("blob", Some("binary")).unwrap(),
        vec![0u8, 159, 146, 150]
    );
    assert!(matches!(
        keychain.string("blob", Some("binary")),
        Err(KeychainError::UnableToEncodeDataAsUtf8String)
    ));
}

#[test]
fn test_items_share_one_encryption_key() {
    let keychain = common::keychain().encrypt_items();
    keychain.save_string("one", "a", None, None).unwrap();
    keychain.save_string("two", "b", None, None).unwrap();

    let a = keychain.item_attributes("a", None).unwrap();
    let b = keychain.item_attributes("b", None).unwrap();
    assert_eq!(a.encryption_key, b.encryption_key);
    assert_eq!(
        keychain
            .key_pairs(None, Some(ITEM_ENCRYPTION_KEY_TAG))
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_password_is_never_encrypted() {
    let keychain = common::keychain().encrypt_items();
    keychain
        .save_password(b"hunter2", "wifi", None, None)
        .unwrap();

    let item = keychain.item_attributes("wifi", None).unwrap();
    assert_eq!(item.item_type, ItemType::Password);
    assert!(!item.is_encrypted());
    assert_eq!(item.value, b"hunter2");
    assert_eq!(keychain.data("wifi", None).unwrap(), b"hunter2");
}

#[test]
fn test_legacy_record_reads_as_password() {
    let keychain = common::keychain();
    let legacy = |name: &str| {
        Attributes::new()
            .with(AttrKey::Account, name)
            .with(AttrKey::Service, "tests")
            .with(AttrKey::ValueData, &b"legacy secret"[..])
    };
    keychain
        .store()
        .add(RecordClass::GenericPassword, legacy("no-label"))
        .unwrap();
    keychain
        .store()
        .add(
            RecordClass::GenericPassword,
            legacy("free-label").with(AttrKey::Label, "Home wifi"),
        )
        .unwrap();

    for name in ["no-label", "free-label"] {
        let item = keychain.item_attributes(name, None).unwrap();
        assert_eq!(item.item_type, ItemType::Password);
        assert!(!item.is_encrypted());
        assert_eq!(keychain.string(name, None).unwrap(), "legacy secret");
    }
}

#[test]
fn test_unknown_type_reads_as_data() {
    let keychain = common::keychain();
    keychain
        .store()
        .add(
            RecordClass::GenericPassword,
            Attributes::new()
                .with(AttrKey::Account, "future")
                .with(AttrKey::Service, "tests")
                .with(AttrKey::Label, r#"{"type":"Blob"}"#)
                .with(AttrKey::ValueData, &b"raw"[..]),
        )
        .unwrap();

    let item = keychain.item_attributes("future", None).unwrap();
    assert_eq!(item.item_type, ItemType::Unknown("Blob".to_string()));
    assert_eq!(keychain.data("future", None).unwrap(), b"raw");
}

#[test]
fn test_save_overwrites_existing_item() {
    let keychain = common::keychain();
    keychain.save_string("first", "name", None, None).unwrap();
    let created = keychain.item_attributes("name", None).unwrap();

    keychain.save_string("second", "name", None, None).unwrap();
    assert_eq!(keychain.string("name", None).unwrap(), "second");

    let updated = keychain.item_attributes("name", None).unwrap();
    assert_eq!(updated.creation_date, created.creation_date);
    assert!(updated.modification_date >= created.modification_date);
    assert_eq!(keychain.items(None).unwrap().len(), 1);
}

#[test]
fn test_overwrite_switches_encryption() {
    let keychain = common::keychain();
    keychain
        .save_string("plain", "name", None, None)
        .unwrap();
    assert!(!keychain.item_attributes("name", None).unwrap().is_encrypted());

    keychain
        .save_string("hidden", "name", None, Some(&Options::default_encrypt_items()))
        .unwrap();
    let item = keychain.item_attributes("name", None).unwrap();
    assert!(item.is_encrypted());
    assert_eq!(keychain.string("name", None).unwrap(), "hidden");

    keychain
        .save_string("plain again", "name", None, None)
        .unwrap();
    assert!(!keychain.item_attributes("name", None).unwrap().is_encrypted());
    assert_eq!(keychain.string("name", None).unwrap(), "plain again");
}

#[test]
fn test_services_are_separate() {
    let keychain = common::keychain();
    keychain.save_string("a", "name", Some("one"), None).unwrap();
    keychain.save_string("b", "name", Some("two"), None).unwrap();

    assert_eq!(keychain.string("name", Some("one")).unwrap(), "a");
    assert_eq!(keychain.string("name", Some("two")).unwrap(), "b");
    assert!(matches!(
        keychain.string("name", None),
        Err(KeychainError::ItemNotFound(_))
    ));
}

#[test]
fn test_items_listing() {
    let keychain = common::keychain();
    assert!(keychain.items(None).unwrap().is_empty());

    for name in ["a", "b", "c"] {
        keychain.save_string(name, name, None, None).unwrap();
    }
    keychain.save_string("x", "other", Some("elsewhere"), None).unwrap();

    let mut names: Vec<String> = keychain
        .items(None)
        .unwrap()
        .into_iter()
        .map(|item| item.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn test_delete() {
    let keychain = common::keychain();
    keychain.save_string("value", "name", None, None).unwrap();
    keychain.delete("name", None).unwrap();

    assert!(matches!(
        keychain.item_attributes("name", None),
        Err(KeychainError::ItemNotFound(_))
    ));
    match keychain.delete("name", None) {
        Err(KeychainError::UnableToDeleteItem(code)) => {
            assert_eq!(code, StoreError::NotFound.code())
        }
        other => panic!("Expected UnableToDeleteItem, got {:?}", other),
    }
}

#[test]
fn test_access_groups_are_separate() {
    let store = MemorySecureStore::new();
    let shared = Keychain::new(store.clone(), SoftwareCryptoProvider).with_access_group("shared");
    let private = Keychain::new(store.clone(), SoftwareCryptoProvider).with_access_group("private");

    shared.save_string("s", "name", None, None).unwrap();
    private.save_string("p", "name", None, None).unwrap();

    assert_eq!(shared.string("name", None).unwrap(), "s");
    assert_eq!(private.string("name", None).unwrap(), "p");
    assert_eq!(store.len(RecordClass::GenericPassword), 2);
}

#[test]
fn test_invalid_options_fail_before_writing() {
    let keychain = common::keychain();
    let options = Options {
        access_protection: AccessProtection::AfterFirstUnlock,
        authentication: Authentication::presence(),
        ..Options::default()
    };
    assert!(matches!(
        keychain.save_string("value", "name", None, Some(&options)),
        Err(KeychainError::UnableToCreateAccessControl(_))
    ));
    assert!(keychain
        .store()
        .find(&Query::items(), MatchLimit::All)
        .is_err());
}

/// A store that refuses every write with a fixed status
#[derive(Debug, Clone)]
struct ReadOnlyStore(MemorySecureStore);

impl SecureStore for ReadOnlyStore {
    fn add(&self, _: RecordClass, _: Attributes) -> Result<(), StoreError> {
        Err(StoreError::Status(-61))
    }

    fn update(&self, _: &Query, _: Attributes) -> Result<(), StoreError> {
        Err(StoreError::Status(-61))
    }

    fn find(&self, query: &Query, limit: MatchLimit) -> Result<Vec<Attributes>, StoreError> {
        self.0.find(query, limit)
    }

    fn delete(&self, _: &Query) -> Result<(), StoreError> {
        Err(StoreError::Status(-61))
    }
}

#[test]
fn test_store_status_is_surfaced() {
    common::init_tracing();
    let keychain = Keychain::new(ReadOnlyStore(MemorySecureStore::new()), SoftwareCryptoProvider);
    match keychain.save_string("value", "name", None, None) {
        Err(KeychainError::UnableToSaveItem(code)) => assert_eq!(code, -61),
        other => panic!("Expected UnableToSaveItem, got {:?}", other),
    }
    match keychain.save_string("value", "name", None, Some(&Options::default_encrypt_items())) {
        Err(KeychainError::UnableToSaveKey(code)) => assert_eq!(code, -61),
        other => panic!("Expected UnableToSaveKey, got {:?}", other),
    }
}
