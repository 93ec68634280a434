//! The keychain handle
//!
//! [`Keychain`] ties a [`SecureStore`] and a [`CryptoProvider`] to a
//! namespace (access group and default service) and default write
//! [`Options`]. Key pair management lives in `registry`, the item
//! surface with its transparent envelope encryption in `items`.
//!
//! A keychain holds no mutable state of its own; every lookup goes to
//! the store, so handles are cheap to clone and to derive from one
//! another with the `with_*` modifiers.

mod error;
mod items;
mod key_pair;
mod metadata;
mod options;
mod registry;

pub use error::{KeychainError, Result};
pub use items::ItemAttributes;
pub use key_pair::KeyPair;
pub use metadata::{ItemMetadata, ItemType};
pub use options::{AccessControl, AccessFlag, AccessProtection, Authentication, Options};
pub use registry::ITEM_ENCRYPTION_KEY_TAG;

use crate::config::KeychainConfig;
use crate::crypto::CryptoProvider;
use crate::store::SecureStore;

/// Service used when none is configured
pub const DEFAULT_SERVICE: &str = "keyward";

#[derive(Debug, Clone)]
pub struct Keychain<S, C> {
    store: S,
    crypto: C,
    access_group: Option<String>,
    service: String,
    options: Options,
}

impl<S: SecureStore, C: CryptoProvider> Keychain<S, C> {
    pub fn new(store: S, crypto: C) -> Self {
        Self {
            store,
            crypto,
            access_group: None,
            service: DEFAULT_SERVICE.to_string(),
            options: Options::default(),
        }
    }

    pub fn from_config(config: &KeychainConfig, store: S, crypto: C) -> Self {
        Self {
            store,
            crypto,
            access_group: config.access_group.clone(),
            service: config.service.clone(),
            options: config.options.clone(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn crypto(&self) -> &C {
        &self.crypto
    }

    pub fn access_group(&self) -> Option<&str> {
        self.access_group.as_deref()
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn with_access_group(mut self, access_group: impl Into<String>) -> Self {
        self.access_group = Some(access_group.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Encrypt items saved with the default options
    pub fn encrypt_items(mut self) -> Self {
        self.options.encrypt_items = true;
        self
    }

    pub fn with_authentication(mut self, authentication: Authentication) -> Self {
        self.options.authentication = authentication;
        self
    }

    pub fn with_access_protection(mut self, access_protection: AccessProtection) -> Self {
        self.options.access_protection = access_protection;
        self
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::SoftwareCryptoProvider;
    use crate::store::MemorySecureStore;

    #[test]
    fn test_modifiers() {
        let keychain = Keychain::new(MemorySecureStore::new(), SoftwareCryptoProvider);
        assert_eq!(keychain.service(), DEFAULT_SERVICE);
        assert_eq!(keychain.access_group(), None);
        assert_eq!(keychain.options(), &Options::default());

        let keychain = keychain
            .with_access_group("team.shared")
            .with_service("mail")
            .encrypt_items()
            .with_authentication(Authentication::presence())
            .with_access_protection(AccessProtection::WhenUnlockedThisDeviceOnly);

        assert_eq!(keychain.access_group(), Some("team.shared"));
        assert_eq!(keychain.service(), "mail");
        assert!(keychain.options().encrypt_items);
        assert_eq!(keychain.options().authentication, Authentication::presence());
        assert_eq!(
            keychain.options().access_protection,
            AccessProtection::WhenUnlockedThisDeviceOnly
        );

        let keychain = keychain.with_options(Options::default());
        assert!(!keychain.options().encrypt_items);
    }

    #[test]
    fn test_from_config() {
        let config = KeychainConfig {
            access_group: Some("group".to_string()),
            service: "svc".to_string(),
            options: Options::default_encrypt_items(),
        };
        let keychain =
            Keychain::from_config(&config, MemorySecureStore::new(), SoftwareCryptoProvider);
        assert_eq!(keychain.access_group(), Some("group"));
        assert_eq!(keychain.service(), "svc");
        assert!(keychain.options().encrypt_items);
    }
}
