use crate::crypto::{PrivateKey, PublicKey};
use crate::store::{AttrKey, Attributes, TOKEN_ID_SECURE_HARDWARE};

use super::error::{KeychainError, Result};

/// A private key and its public half, as recorded in the store
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub label: Option<String>,
    /// Hex of the stored fingerprint
    pub application_label: Option<String>,
    pub tag: Option<String>,
    pub description: Option<String>,
    pub access_group: String,
    pub token_id: String,
    pub is_hardware_backed: bool,
    pub private_key: PrivateKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Build a key pair from a key record's attributes
    ///
    /// # Errors
    ///
    /// - `KeychainError::CannotGetPrivateKeyHandle` if the record has no key handle
    /// - `KeychainError::UnableToCreatePublicKey` if the public half can't be derived
    pub fn from_attributes(attributes: &Attributes) -> Result<Self> {
        let text = |key: AttrKey| attributes.get_string(key).map(str::to_string);

        let handle = attributes
            .get_key(AttrKey::ValueRef)
            .ok_or(KeychainError::CannotGetPrivateKeyHandle)?;
        let private_key = PrivateKey::new(handle.clone());
        let public_key = private_key
            .public_key()
            .ok_or(KeychainError::UnableToCreatePublicKey)?;

        let token_id = text(AttrKey::TokenId).unwrap_or_default();
        Ok(Self {
            label: text(AttrKey::Label),
            application_label: attributes.get_data(AttrKey::ApplicationLabel).map(hex::encode),
            tag: attributes
                .get_data(AttrKey::ApplicationTag)
                .and_then(|tag| String::from_utf8(tag.to_vec()).ok()),
            description: text(AttrKey::Description),
            access_group: text(AttrKey::AccessGroup).unwrap_or_default(),
            is_hardware_backed: token_id == TOKEN_ID_SECURE_HARDWARE,
            token_id,
            private_key,
            public_key,
        })
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::crypto::{CryptoProvider, KeyCurve, KeyHandle, SoftwareCryptoProvider};
    use crate::keychain::Options;

    fn handle() -> Arc<dyn KeyHandle> {
        let access = Options::default().access_control(true).unwrap();
        SoftwareCryptoProvider
            .generate_private_key(KeyCurve::Secp256r1, false, &access)
            .unwrap()
    }

    #[test]
    fn test_from_attributes() {
        let handle = handle();
        let attributes = Attributes::new()
            .with(AttrKey::ValueRef, handle.clone())
            .with(AttrKey::ApplicationTag, &b"signing"[..])
            .with(AttrKey::ApplicationLabel, vec![0xab, 0xcd])
            .with(AttrKey::Label, "my key")
            .with(AttrKey::AccessGroup, "group");

        let key_pair = KeyPair::from_attributes(&attributes).unwrap();
        assert_eq!(key_pair.tag.as_deref(), Some("signing"));
        assert_eq!(key_pair.application_label.as_deref(), Some("abcd"));
        assert_eq!(key_pair.label.as_deref(), Some("my key"));
        assert_eq!(key_pair.description, None);
        assert_eq!(key_pair.access_group, "group");
        assert_eq!(key_pair.token_id, "");
        assert!(!key_pair.is_hardware_backed);
        assert_eq!(
            key_pair.public_key.uncompressed(),
            &handle.external_representation().unwrap()[..65]
        );
    }

    #[test]
    fn test_hardware_token() {
        let attributes = Attributes::new()
            .with(AttrKey::ValueRef, handle())
            .with(AttrKey::TokenId, TOKEN_ID_SECURE_HARDWARE);
        assert!(KeyPair::from_attributes(&attributes).unwrap().is_hardware_backed);
    }

    #[test]
    fn test_missing_handle() {
        assert!(matches!(
            KeyPair::from_attributes(&Attributes::new()),
            Err(KeychainError::CannotGetPrivateKeyHandle)
        ));
    }

    #[test]
    fn test_public_handle_without_public_half() {
        let public_only = handle().public_handle().unwrap();
        let attributes = Attributes::new().with(AttrKey::ValueRef, public_only);
        assert!(matches!(
            KeyPair::from_attributes(&attributes),
            Err(KeychainError::UnableToCreatePublicKey)
        ));
    }
}
