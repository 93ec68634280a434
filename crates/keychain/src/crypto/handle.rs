use std::fmt::Debug;
use std::sync::Arc;

use super::curve::KeyCurve;
use crate::keychain::AccessControl;

/// Errors reported by a crypto provider or one of its key handles
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Hardware key isolation was requested but this environment has none
    #[error("hardware-backed keys are unavailable")]
    HardwareUnavailable,
    #[error("unsupported key curve")]
    UnsupportedCurve,
    #[error("invalid key: {0}")]
    InvalidKey(String),
    /// The handle refuses to (or cannot) export its key material
    #[error("unable to export key: {0}")]
    Export(String),
    #[error("encryption failed: {0}")]
    Encryption(String),
    #[error("decryption failed: {0}")]
    Decryption(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyClass {
    Public,
    Private,
}

/// An opaque native key object
///
/// A handle is a capability: it can describe itself and hand out its
/// public half, but the private scalar only leaves it through
/// `external_representation`, and a hardware-backed handle is free to
/// refuse that.
pub trait KeyHandle: Send + Sync + Debug {
    fn class(&self) -> KeyClass;

    /// X9.63 representation of the key
    ///
    /// 65 bytes (uncompressed point) for public keys, 97 bytes
    /// (uncompressed point followed by the scalar) for private keys.
    fn external_representation(&self) -> Result<Vec<u8>, ProviderError>;

    /// Derive the matching public handle, if the provider can
    fn public_handle(&self) -> Option<Arc<dyn KeyHandle>>;

    fn is_hardware_backed(&self) -> bool {
        false
    }
}

/// The opaque crypto backend keys are created by and used through
///
/// Everything the keychain needs from a platform crypto library:
/// create private keys (optionally inside secure hardware), adopt
/// imported ones, and run ECIES with the resulting handles.
pub trait CryptoProvider: Send + Sync + Debug + Clone + 'static {
    /// Create a fresh private key on `curve`
    ///
    /// Should fail with `ProviderError::HardwareUnavailable` when
    /// `hardware_backed` is requested but unsupported.
    fn generate_private_key(
        &self,
        curve: KeyCurve,
        hardware_backed: bool,
        access: &AccessControl,
    ) -> Result<Arc<dyn KeyHandle>, ProviderError>;

    /// Adopt a private key from its 97 byte X9.63 representation
    fn import_private_key(
        &self,
        x963: &[u8],
        access: &AccessControl,
    ) -> Result<Arc<dyn KeyHandle>, ProviderError>;

    /// Encrypt `plaintext` to a public handle
    fn encrypt(&self, public: &dyn KeyHandle, plaintext: &[u8]) -> Result<Vec<u8>, ProviderError>;

    /// Decrypt `ciphertext` with a private handle
    fn decrypt(&self, private: &dyn KeyHandle, ciphertext: &[u8])
        -> Result<Vec<u8>, ProviderError>;
}
