use crate::crypto::KeyError;

pub type Result<T> = std::result::Result<T, KeychainError>;

/// Errors surfaced by keychain operations
///
/// Store failures keep the native status code they were reported with,
/// crypto failures keep the provider's diagnostic text.
#[derive(Debug, thiserror::Error)]
pub enum KeychainError {
    /// A key record came back without a private key handle
    #[error("cannot get private key handle from key attributes")]
    CannotGetPrivateKeyHandle,
    #[error("decryption error: {0}")]
    DecryptionError(String),
    #[error("encryption error: {0}")]
    EncryptionError(String),
    /// Hardware key isolation was requested where none exists
    #[error("hardware-backed keys are unavailable")]
    HardwareUnavailable,
    #[error("item query failed with status {0}")]
    ItemQueryError(i32),
    #[error("item not found: {0}")]
    ItemNotFound(String),
    /// Carries whatever identifies the key that was looked up, if anything
    #[error("key not found: {0}")]
    KeyNotFound(String),
    #[error("unable to parse key attributes")]
    KeysAttributesError,
    #[error("key query failed with status {0}")]
    KeysQueryError(i32),
    #[error("key tag {0:?} is reserved")]
    ReservedKeyTag(String),
    #[error("data is not valid utf-8")]
    UnableToEncodeDataAsUtf8String,
    #[error("unable to create access control: {0}")]
    UnableToCreateAccessControl(String),
    #[error("unable to create private key: {0}")]
    UnableToCreatePrivateKey(String),
    #[error("unable to derive public key from private key")]
    UnableToCreatePublicKey,
    #[error("unable to delete key, status {0}")]
    UnableToDeleteKey(i32),
    #[error("unable to delete item, status {0}")]
    UnableToDeleteItem(i32),
    #[error("unable to get item attributes")]
    UnableToGetItemAttributes,
    #[error("unable to save item, status {0}")]
    UnableToSaveItem(i32),
    #[error("unable to save key, status {0}")]
    UnableToSaveKey(i32),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
