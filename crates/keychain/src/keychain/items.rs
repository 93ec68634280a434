use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::crypto::CryptoProvider;
use crate::store::{AttrKey, Attributes, MatchLimit, Query, RecordClass, SecureStore, StoreError};

use super::error::{KeychainError, Result};
use super::metadata::{ItemMetadata, ItemType};
use super::options::Options;
use super::Keychain;

/// A stored item as read back from the store
///
/// `value` is the payload exactly as persisted, which is ciphertext
/// when `is_encrypted()`. Use [`Keychain::item_data`] to get the
/// plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemAttributes {
    pub name: String,
    pub service: String,
    pub value: Vec<u8>,
    pub label: Option<String>,
    pub access_group: Option<String>,
    pub synchronizable: bool,
    pub invisible: bool,
    pub creation_date: DateTime<Utc>,
    pub modification_date: DateTime<Utc>,
    pub item_type: ItemType,
    /// Uncompressed public key the payload is encrypted to
    pub encryption_key: Option<Vec<u8>>,
}

impl ItemAttributes {
    /// Read an item record, decoding the metadata in its label
    ///
    /// Missing attributes take empty or epoch defaults, and a label that
    /// isn't metadata marks the item as an unencrypted password.
    pub fn from_attributes(attributes: &Attributes) -> Self {
        let text = |key: AttrKey| attributes.get_string(key).map(str::to_string);
        let label = text(AttrKey::Label);
        let metadata = ItemMetadata::from_label(label.as_deref());

        Self {
            name: text(AttrKey::Account).unwrap_or_default(),
            service: text(AttrKey::Service).unwrap_or_default(),
            value: attributes
                .get_data(AttrKey::ValueData)
                .map(<[u8]>::to_vec)
                .unwrap_or_default(),
            label,
            access_group: text(AttrKey::AccessGroup),
            synchronizable: attributes.get_bool(AttrKey::Synchronizable).unwrap_or(false),
            invisible: attributes.get_bool(AttrKey::Invisible).unwrap_or(false),
            creation_date: attributes
                .get_date(AttrKey::CreationDate)
                .unwrap_or_default(),
            modification_date: attributes
                .get_date(AttrKey::ModificationDate)
                .unwrap_or_default(),
            item_type: metadata.item_type,
            encryption_key: metadata.encryption,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryption_key.is_some()
    }
}

impl<S: SecureStore, C: CryptoProvider> Keychain<S, C> {
    pub fn save_string(
        &self,
        value: &str,
        name: &str,
        service: Option<&str>,
        options: Option<&Options>,
    ) -> Result<()> {
        self.save(value.as_bytes(), name, service, options, ItemType::String)
    }

    pub fn save_data(
        &self,
        value: &[u8],
        name: &str,
        service: Option<&str>,
        options: Option<&Options>,
    ) -> Result<()> {
        self.save(value, name, service, options, ItemType::Data)
    }

    /// Save any serializable value as JSON
    pub fn save_object<T: Serialize>(
        &self,
        value: &T,
        name: &str,
        service: Option<&str>,
        options: Option<&Options>,
    ) -> Result<()> {
        let data = serde_json::to_vec(value)?;
        self.save(&data, name, service, options, ItemType::Structured)
    }

    /// Save a password, which is never encrypted by the keychain
    pub fn save_password(
        &self,
        password: &[u8],
        name: &str,
        service: Option<&str>,
        options: Option<&Options>,
    ) -> Result<()> {
        self.save(password, name, service, options, ItemType::Password)
    }

    /// Write an item, encrypting it first if the options ask for it
    ///
    /// A record that already exists under the same name and service is
    /// overwritten.
    fn save(
        &self,
        payload: &[u8],
        name: &str,
        service: Option<&str>,
        options: Option<&Options>,
        item_type: ItemType,
    ) -> Result<()> {
        let service = service.unwrap_or(&self.service);
        let options = options.unwrap_or(&self.options);
        let access = options.access_control(false)?;
        let mut synchronizable = options.synchronizable;
        let mut invisible = options.invisible;

        let (payload, encryption) = if options.encrypt_items && item_type.is_encryptable() {
            let key_pair = self.ensure_item_encryption_key_pair()?;
            let ciphertext = self.encrypt(payload, &key_pair.public_key)?;
            // encrypted items stay on this device and out of listings
            synchronizable = false;
            invisible = true;
            (ciphertext, Some(key_pair.public_key.uncompressed().to_vec()))
        } else {
            (payload.to_vec(), None)
        };
        let label = ItemMetadata::new(item_type, encryption).encode()?;

        let attributes = Attributes::new()
            .with(AttrKey::ValueData, payload)
            .with(AttrKey::Label, label)
            .with(AttrKey::AccessControl, access)
            .with(AttrKey::Synchronizable, synchronizable)
            .with(AttrKey::Invisible, invisible);
        let query = self.item_query(Some(name), service);

        let mut record = query.attributes.clone();
        record.merge(attributes.clone());
        match self.store.add(RecordClass::GenericPassword, record) {
            Ok(()) => {}
            Err(StoreError::DuplicateItem) => {
                tracing::debug!("item {} in {} exists, updating", name, service);
                self.store
                    .update(&query, attributes)
                    .map_err(|e| KeychainError::UnableToSaveItem(e.code()))?;
            }
            Err(e) => return Err(KeychainError::UnableToSaveItem(e.code())),
        }
        Ok(())
    }

    /// Fetch an item's attributes without decrypting it
    ///
    /// # Errors
    ///
    /// - `KeychainError::ItemNotFound` if there is no such item
    /// - `KeychainError::ItemQueryError` for any other store failure
    pub fn item_attributes(&self, name: &str, service: Option<&str>) -> Result<ItemAttributes> {
        let service = service.unwrap_or(&self.service);
        let records = self
            .store
            .find(&self.item_query(Some(name), service), MatchLimit::One)
            .map_err(|e| match e {
                StoreError::NotFound => {
                    KeychainError::ItemNotFound(format!("{} in service {}", name, service))
                }
                e => KeychainError::ItemQueryError(e.code()),
            })?;
        let attributes = records
            .first()
            .ok_or(KeychainError::UnableToGetItemAttributes)?;
        Ok(ItemAttributes::from_attributes(attributes))
    }

    /// Every item stored under `service`, or an empty list
    pub fn items(&self, service: Option<&str>) -> Result<Vec<ItemAttributes>> {
        let service = service.unwrap_or(&self.service);
        match self
            .store
            .find(&self.item_query(None, service), MatchLimit::All)
        {
            Ok(records) => Ok(records.iter().map(ItemAttributes::from_attributes).collect()),
            Err(StoreError::NotFound) => Ok(Vec::new()),
            Err(e) => Err(KeychainError::ItemQueryError(e.code())),
        }
    }

    /// The plaintext payload of an item
    ///
    /// Encrypted items are decrypted with the private key matching the
    /// public key recorded in their metadata.
    pub fn item_data(&self, item: &ItemAttributes) -> Result<Vec<u8>> {
        match &item.encryption_key {
            Some(public_key) => self.decrypt_with_public_key(&item.value, public_key),
            None => Ok(item.value.clone()),
        }
    }

    pub fn data(&self, name: &str, service: Option<&str>) -> Result<Vec<u8>> {
        let item = self.item_attributes(name, service)?;
        self.item_data(&item)
    }

    pub fn string(&self, name: &str, service: Option<&str>) -> Result<String> {
        String::from_utf8(self.data(name, service)?)
            .map_err(|_| KeychainError::UnableToEncodeDataAsUtf8String)
    }

    /// Read an item saved with [`Keychain::save_object`]
    pub fn object<T: DeserializeOwned>(&self, name: &str, service: Option<&str>) -> Result<T> {
        Ok(serde_json::from_slice(&self.data(name, service)?)?)
    }

    pub fn delete(&self, name: &str, service: Option<&str>) -> Result<()> {
        let service = service.unwrap_or(&self.service);
        self.store
            .delete(&self.item_query(Some(name), service))
            .map_err(|e| KeychainError::UnableToDeleteItem(e.code()))
    }

    fn item_query(&self, name: Option<&str>, service: &str) -> Query {
        Query::items()
            .with(AttrKey::Service, service)
            .with_opt(AttrKey::Account, name)
            .with_opt(AttrKey::AccessGroup, self.access_group.as_deref())
    }
}
