use std::sync::Arc;

use crate::crypto::{CryptoProvider, KeyCurve, KeyHandle, PrivateKey, ProviderError, PublicKey};
use crate::store::{
    AttrKey, Attributes, MatchLimit, Query, RecordClass, SecureStore, StoreError,
    TOKEN_ID_SECURE_HARDWARE,
};

use super::error::{KeychainError, Result};
use super::key_pair::KeyPair;
use super::options::{AccessControl, Options};
use super::Keychain;

/// Tag of the key pair items are transparently encrypted to
///
/// Callers can't generate or import keys under this tag.
pub const ITEM_ENCRYPTION_KEY_TAG: &str = "keyward.item-encryption-key";

impl<S: SecureStore, C: CryptoProvider> Keychain<S, C> {
    /// Generate a new key pair and record it in the store
    ///
    /// # Arguments
    /// * `hardware_backed` - Create the private key inside secure hardware
    /// * `tag` - Application tag to find the key by later
    /// * `label` - Free text label
    /// * `options` - Access options, the keychain's when `None`
    ///
    /// # Errors
    ///
    /// - `KeychainError::ReservedKeyTag` for [`ITEM_ENCRYPTION_KEY_TAG`]
    /// - `KeychainError::HardwareUnavailable` if hardware backing is unsupported
    /// - `KeychainError::UnableToSaveKey` if the store refuses the record
    pub fn generate_key_pair(
        &self,
        hardware_backed: bool,
        tag: Option<&str>,
        label: Option<&str>,
        options: Option<&Options>,
    ) -> Result<KeyPair> {
        ensure_unreserved(tag)?;
        self.create_key_pair(
            hardware_backed,
            tag,
            label,
            options.unwrap_or(&self.options),
        )
    }

    /// Import a private key and record it in the store
    ///
    /// `data` is either the 97 byte X9.63 public‖private form or a raw
    /// 32 byte scalar.
    pub fn import_private_key(
        &self,
        data: &[u8],
        tag: Option<&str>,
        label: Option<&str>,
        options: Option<&Options>,
    ) -> Result<KeyPair> {
        ensure_unreserved(tag)?;
        let options = options.unwrap_or(&self.options);
        let access = options.access_control(true)?;
        let x963 = PrivateKey::x963_from_bytes(data, KeyCurve::default())?;
        let handle = self
            .crypto
            .import_private_key(&x963, &access)
            .map_err(provider_error)?;
        tracing::debug!("imported private key, tag {:?}", tag);
        self.record_key(handle, false, tag, label, access)
    }

    /// Look up a single key pair by fingerprint and/or tag
    ///
    /// # Errors
    ///
    /// - `KeychainError::KeyNotFound` if nothing matches
    /// - `KeychainError::KeysQueryError` for any other store failure
    /// - `KeychainError::KeysAttributesError` if the store returned no record
    pub fn key_pair(&self, application_label: Option<&[u8]>, tag: Option<&str>) -> Result<KeyPair> {
        self.find_key_pair(application_label, tag, || {
            describe_lookup(application_label, tag)
        })
    }

    /// Look up every key pair matching fingerprint and/or tag
    ///
    /// Nothing matching is an empty list, not an error.
    pub fn key_pairs(
        &self,
        application_label: Option<&[u8]>,
        tag: Option<&str>,
    ) -> Result<Vec<KeyPair>> {
        let query = self.key_query(application_label, tag);
        let records = match self.store.find(&query, MatchLimit::All) {
            Ok(records) => records,
            Err(StoreError::NotFound) => return Ok(Vec::new()),
            Err(e) => return Err(KeychainError::KeysQueryError(e.code())),
        };
        records.iter().map(KeyPair::from_attributes).collect()
    }

    /// Look up the key pair a public key belongs to
    ///
    /// A miss reports the public key's hex in `KeychainError::KeyNotFound`.
    pub fn key_pair_for_public_key(&self, public_key: &PublicKey) -> Result<KeyPair> {
        self.find_key_pair(Some(&public_key.sha1()[..]), None, || public_key.to_hex())
    }

    pub fn delete_key_pair(&self, public_key: &PublicKey) -> Result<()> {
        let query = self.key_query(Some(&public_key.sha1()[..]), None);
        self.store
            .delete(&query)
            .map_err(|e| KeychainError::UnableToDeleteKey(e.code()))?;
        tracing::info!("deleted key pair {}", public_key.to_hex());
        Ok(())
    }

    /// Delete every key pair recorded under `tag`
    pub fn delete_key_pairs(&self, tag: &str) -> Result<()> {
        let query = self.key_query(None, Some(tag));
        self.store
            .delete(&query)
            .map_err(|e| KeychainError::UnableToDeleteKey(e.code()))?;
        tracing::info!("deleted key pairs tagged {:?}", tag);
        Ok(())
    }

    /// The reserved item encryption key pair, created on first use
    ///
    /// Prefers a hardware-backed key and settles for a software one when
    /// the provider has no secure hardware. Losing a creation race to a
    /// concurrent caller is not an error, the winner's key is returned.
    pub fn ensure_item_encryption_key_pair(&self) -> Result<KeyPair> {
        match self.key_pair(None, Some(ITEM_ENCRYPTION_KEY_TAG)) {
            Ok(key_pair) => return Ok(key_pair),
            Err(KeychainError::KeyNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let tag = Some(ITEM_ENCRYPTION_KEY_TAG);
        let created = match self.create_key_pair(true, tag, None, &self.options) {
            Err(KeychainError::HardwareUnavailable) => {
                tracing::warn!(
                    "secure hardware unavailable, creating software item encryption key"
                );
                self.create_key_pair(false, tag, None, &self.options)
            }
            created => created,
        };

        match created {
            Ok(key_pair) => {
                tracing::info!(
                    "created item encryption key {} (hardware backed: {})",
                    key_pair.public_key.to_hex(),
                    key_pair.is_hardware_backed
                );
                Ok(key_pair)
            }
            Err(KeychainError::UnableToSaveKey(code))
                if code == StoreError::DuplicateItem.code() =>
            {
                tracing::debug!("item encryption key created concurrently, reading it back");
                self.key_pair(None, Some(ITEM_ENCRYPTION_KEY_TAG))
            }
            Err(e) => Err(e),
        }
    }

    /// Encrypt `message` to `public_key`
    pub fn encrypt(&self, message: &[u8], public_key: &PublicKey) -> Result<Vec<u8>> {
        self.crypto
            .encrypt(public_key.handle().as_ref(), message)
            .map_err(|e| KeychainError::EncryptionError(e.to_string()))
    }

    pub fn decrypt(&self, message: &[u8], private_key: &PrivateKey) -> Result<Vec<u8>> {
        self.crypto
            .decrypt(private_key.handle().as_ref(), message)
            .map_err(|e| KeychainError::DecryptionError(e.to_string()))
    }

    /// Decrypt `message` with the stored private key matching `public_key`
    pub fn decrypt_with_public_key(&self, message: &[u8], public_key: &[u8]) -> Result<Vec<u8>> {
        let public_key = PublicKey::new(public_key)?;
        let key_pair = self.key_pair_for_public_key(&public_key)?;
        tracing::debug!("decrypting with key {}", public_key.to_hex());
        self.decrypt(message, &key_pair.private_key)
    }

    fn create_key_pair(
        &self,
        hardware_backed: bool,
        tag: Option<&str>,
        label: Option<&str>,
        options: &Options,
    ) -> Result<KeyPair> {
        let access = options.access_control(true)?;
        let handle = self
            .crypto
            .generate_private_key(KeyCurve::default(), hardware_backed, &access)
            .map_err(provider_error)?;
        tracing::debug!(
            "generated private key, tag {:?}, hardware backed: {}",
            tag,
            hardware_backed
        );
        self.record_key(handle, hardware_backed, tag, label, access)
    }

    /// Persist a freshly created private key and read it back as a key pair
    fn record_key(
        &self,
        handle: Arc<dyn KeyHandle>,
        hardware_backed: bool,
        tag: Option<&str>,
        label: Option<&str>,
        access: AccessControl,
    ) -> Result<KeyPair> {
        let public_key = PrivateKey::new(handle.clone())
            .public_key()
            .ok_or(KeychainError::UnableToCreatePublicKey)?;

        let attributes = Attributes::new()
            .with(AttrKey::ApplicationLabel, public_key.sha1().to_vec())
            .with_opt(AttrKey::ApplicationTag, tag.map(str::as_bytes))
            .with_opt(AttrKey::Label, label)
            .with_opt(AttrKey::AccessGroup, self.access_group.as_deref())
            .with_opt(
                AttrKey::TokenId,
                hardware_backed.then_some(TOKEN_ID_SECURE_HARDWARE),
            )
            .with(AttrKey::AccessControl, access)
            .with(AttrKey::Synchronizable, false)
            .with(AttrKey::ValueRef, handle);

        self.store
            .add(RecordClass::Key, attributes.clone())
            .map_err(|e| KeychainError::UnableToSaveKey(e.code()))?;
        KeyPair::from_attributes(&attributes)
    }

    fn find_key_pair(
        &self,
        application_label: Option<&[u8]>,
        tag: Option<&str>,
        describe: impl FnOnce() -> String,
    ) -> Result<KeyPair> {
        let query = self.key_query(application_label, tag);
        let records = self
            .store
            .find(&query, MatchLimit::One)
            .map_err(|e| match e {
                StoreError::NotFound => KeychainError::KeyNotFound(describe()),
                e => KeychainError::KeysQueryError(e.code()),
            })?;
        let attributes = records.first().ok_or(KeychainError::KeysAttributesError)?;
        KeyPair::from_attributes(attributes)
    }

    fn key_query(&self, application_label: Option<&[u8]>, tag: Option<&str>) -> Query {
        Query::keys()
            .with_opt(AttrKey::AccessGroup, self.access_group.as_deref())
            .with_opt(AttrKey::ApplicationLabel, application_label)
            .with_opt(AttrKey::ApplicationTag, tag.map(str::as_bytes))
    }
}

fn ensure_unreserved(tag: Option<&str>) -> Result<()> {
    match tag {
        Some(tag) if tag == ITEM_ENCRYPTION_KEY_TAG => {
            Err(KeychainError::ReservedKeyTag(tag.to_string()))
        }
        _ => Ok(()),
    }
}

fn provider_error(error: ProviderError) -> KeychainError {
    match error {
        ProviderError::HardwareUnavailable => KeychainError::HardwareUnavailable,
        e => KeychainError::UnableToCreatePrivateKey(e.to_string()),
    }
}

fn describe_lookup(application_label: Option<&[u8]>, tag: Option<&str>) -> String {
    match (application_label, tag) {
        (Some(label), Some(tag)) => format!("application label {}, tag {}", hex::encode(label), tag),
        (Some(label), None) => format!("application label {}", hex::encode(label)),
        (None, Some(tag)) => format!("tag {}", tag),
        (None, None) => String::new(),
    }
}
