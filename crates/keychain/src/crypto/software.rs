//! Portable P-256 crypto provider
//!
//! A `CryptoProvider` with no secure hardware behind it. Keys live in
//! process memory as `p256` secrets, and item encryption is ECIES built
//! from ECDH, the ANSI X9.63 KDF over SHA-256 and AES-256-GCM.
//!
//! # Wire Format
//!
//! ```text
//! [ ephemeral_pubkey: 65 bytes ][ ciphertext: n bytes ][ tag: 16 bytes ]
//! ```
//!
//! The KDF is fed the shared secret with the ephemeral public key as
//! shared info and yields the AES key followed by the GCM nonce. Both
//! are unique per message since the ephemeral key is.

use std::fmt;
use std::sync::Arc;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use p256::ecdh::EphemeralSecret;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand_core::OsRng;
use sha2::{Digest, Sha256};

use super::curve::KeyCurve;
use super::handle::{CryptoProvider, KeyClass, KeyHandle, ProviderError};
use super::point::{is_full_public_private, is_uncompressed, UNCOMPRESSED_SIZE};
use crate::keychain::AccessControl;

/// Size of the AES-256-GCM key derived per message
const AES_KEY_SIZE: usize = 32;
/// Size of the AES-GCM nonce derived per message
const NONCE_SIZE: usize = 12;
/// Size of the AES-GCM authentication tag
const TAG_SIZE: usize = 16;

/// A key held in process memory
#[derive(Clone)]
pub enum SoftwareKey {
    Private {
        secret: p256::SecretKey,
        access: Option<AccessControl>,
    },
    /// An encoded public point, validated only when used
    Public(Vec<u8>),
}

impl SoftwareKey {
    pub fn public(uncompressed: Vec<u8>) -> Self {
        SoftwareKey::Public(uncompressed)
    }

    pub fn private(secret: p256::SecretKey, access: Option<AccessControl>) -> Self {
        SoftwareKey::Private { secret, access }
    }

    pub fn access_control(&self) -> Option<&AccessControl> {
        match self {
            SoftwareKey::Private { access, .. } => access.as_ref(),
            SoftwareKey::Public(_) => None,
        }
    }
}

impl fmt::Debug for SoftwareKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoftwareKey::Private { access, .. } => f
                .debug_struct("SoftwareKey::Private")
                .field("access", access)
                .finish_non_exhaustive(),
            SoftwareKey::Public(bytes) => f
                .debug_tuple("SoftwareKey::Public")
                .field(&hex::encode(bytes))
                .finish(),
        }
    }
}

impl KeyHandle for SoftwareKey {
    fn class(&self) -> KeyClass {
        match self {
            SoftwareKey::Private { .. } => KeyClass::Private,
            SoftwareKey::Public(_) => KeyClass::Public,
        }
    }

    fn external_representation(&self) -> Result<Vec<u8>, ProviderError> {
        match self {
            SoftwareKey::Private { secret, .. } => {
                let public = secret.public_key().to_encoded_point(false);
                let mut x963 = Vec::with_capacity(UNCOMPRESSED_SIZE + AES_KEY_SIZE);
                x963.extend_from_slice(public.as_bytes());
                x963.extend_from_slice(&secret.to_bytes());
                Ok(x963)
            }
            SoftwareKey::Public(bytes) => Ok(bytes.clone()),
        }
    }

    fn public_handle(&self) -> Option<Arc<dyn KeyHandle>> {
        match self {
            SoftwareKey::Private { secret, .. } => {
                let public = secret.public_key().to_encoded_point(false);
                Some(Arc::new(SoftwareKey::public(public.as_bytes().to_vec())))
            }
            SoftwareKey::Public(_) => None,
        }
    }
}

/// `CryptoProvider` backed by the RustCrypto `p256` crate
///
/// Never offers hardware isolation, so asking it for a hardware-backed
/// key fails with `ProviderError::HardwareUnavailable`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareCryptoProvider;

impl CryptoProvider for SoftwareCryptoProvider {
    fn generate_private_key(
        &self,
        curve: KeyCurve,
        hardware_backed: bool,
        access: &AccessControl,
    ) -> Result<Arc<dyn KeyHandle>, ProviderError> {
        if hardware_backed {
            return Err(ProviderError::HardwareUnavailable);
        }
        if curve != KeyCurve::Secp256r1 {
            return Err(ProviderError::UnsupportedCurve);
        }
        let secret = p256::SecretKey::random(&mut OsRng);
        Ok(Arc::new(SoftwareKey::private(secret, Some(access.clone()))))
    }

    fn import_private_key(
        &self,
        x963: &[u8],
        access: &AccessControl,
    ) -> Result<Arc<dyn KeyHandle>, ProviderError> {
        if !is_full_public_private(x963) {
            return Err(ProviderError::InvalidKey(format!(
                "expected {} byte X9.63 private key, got {}",
                UNCOMPRESSED_SIZE + AES_KEY_SIZE,
                x963.len()
            )));
        }
        let secret = p256::SecretKey::from_slice(&x963[UNCOMPRESSED_SIZE..])
            .map_err(|_| ProviderError::InvalidKey("invalid private scalar".to_string()))?;
        // the embedded public point has to belong to the scalar
        let public = secret.public_key().to_encoded_point(false);
        if public.as_bytes() != &x963[..UNCOMPRESSED_SIZE] {
            return Err(ProviderError::InvalidKey(
                "public point does not match private scalar".to_string(),
            ));
        }
        Ok(Arc::new(SoftwareKey::private(secret, Some(access.clone()))))
    }

    fn encrypt(&self, public: &dyn KeyHandle, plaintext: &[u8]) -> Result<Vec<u8>, ProviderError> {
        let recipient_bytes = public.external_representation()?;
        if public.class() != KeyClass::Public || !is_uncompressed(&recipient_bytes) {
            return Err(ProviderError::InvalidKey(
                "encryption requires an uncompressed public key".to_string(),
            ));
        }
        let recipient = p256::PublicKey::from_sec1_bytes(&recipient_bytes)
            .map_err(|_| ProviderError::UnsupportedCurve)?;

        let ephemeral = EphemeralSecret::random(&mut OsRng);
        let ephemeral_public = ephemeral.public_key().to_encoded_point(false);
        let shared = ephemeral.diffie_hellman(&recipient);

        let (cipher, nonce) = derive_cipher(shared.raw_secret_bytes(), ephemeral_public.as_bytes())
            .map_err(ProviderError::Encryption)?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| ProviderError::Encryption("AES-GCM encryption error".to_string()))?;

        let mut output = Vec::with_capacity(UNCOMPRESSED_SIZE + ciphertext.len());
        output.extend_from_slice(ephemeral_public.as_bytes());
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    fn decrypt(
        &self,
        private: &dyn KeyHandle,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        if ciphertext.len() < UNCOMPRESSED_SIZE + TAG_SIZE {
            return Err(ProviderError::Decryption(format!(
                "ciphertext too short: expected at least {} bytes, got {}",
                UNCOMPRESSED_SIZE + TAG_SIZE,
                ciphertext.len()
            )));
        }
        let x963 = private.external_representation()?;
        if private.class() != KeyClass::Private || !is_full_public_private(&x963) {
            return Err(ProviderError::InvalidKey(
                "decryption requires a private key".to_string(),
            ));
        }
        let secret = p256::SecretKey::from_slice(&x963[UNCOMPRESSED_SIZE..])
            .map_err(|_| ProviderError::InvalidKey("invalid private scalar".to_string()))?;

        let (ephemeral_bytes, sealed) = ciphertext.split_at(UNCOMPRESSED_SIZE);
        let ephemeral = p256::PublicKey::from_sec1_bytes(ephemeral_bytes).map_err(|_| {
            ProviderError::Decryption("invalid ephemeral public key".to_string())
        })?;
        let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), ephemeral.as_affine());

        let (cipher, nonce) =
            derive_cipher(shared.raw_secret_bytes(), ephemeral_bytes).map_err(ProviderError::Decryption)?;
        cipher
            .decrypt(Nonce::from_slice(&nonce), sealed)
            .map_err(|_| ProviderError::Decryption("AES-GCM authentication failed".to_string()))
    }
}

/// Build the per-message cipher and nonce from an ECDH shared secret
fn derive_cipher(
    shared_secret: &[u8],
    shared_info: &[u8],
) -> Result<(Aes256Gcm, [u8; NONCE_SIZE]), String> {
    let material = x963_kdf(shared_secret, shared_info, AES_KEY_SIZE + NONCE_SIZE);
    let cipher = Aes256Gcm::new_from_slice(&material[..AES_KEY_SIZE])
        .map_err(|e| format!("invalid AES key length: {}", e))?;
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&material[AES_KEY_SIZE..]);
    Ok((cipher, nonce))
}

/// ANSI X9.63 key derivation with SHA-256
fn x963_kdf(shared_secret: &[u8], shared_info: &[u8], length: usize) -> Vec<u8> {
    let mut output = Vec::with_capacity(length + Sha256::output_size());
    let mut counter: u32 = 1;
    while output.len() < length {
        let mut hasher = Sha256::new();
        hasher.update(shared_secret);
        hasher.update(counter.to_be_bytes());
        hasher.update(shared_info);
        output.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    output.truncate(length);
    output
}
