use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::{DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::curve::KeyCurve;
use super::handle::{KeyHandle, ProviderError};
use super::point::{
    self, is_compressed, is_full_public_private, is_uncompressed, COORDINATE_SIZE, RAW_SIZE,
    UNCOMPRESSED_SIZE,
};
use super::software::SoftwareKey;

/// Size of a raw secp256r1 private scalar in bytes
pub const PRIVATE_KEY_SIZE: usize = COORDINATE_SIZE;
/// Size of the short public key fingerprint in bytes
pub const SHA1_SIZE: usize = 20;
/// Size of the full public key fingerprint in bytes
pub const SHA256_SIZE: usize = 32;

const PUBLIC_KEY_PEM_TAG: &str = "PUBLIC KEY";
const PRIVATE_KEY_PEM_TAG: &str = "PRIVATE KEY";

/// Errors that can occur during key operations
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("unsupported key format")]
    UnsupportedKeyFormat,
    #[error("unsupported key curve")]
    UnsupportedKeyCurve,
    #[error("point is not on the curve")]
    PointNotOnCurve,
    /// A handle we were given exports something other than an uncompressed 256-bit point
    #[error("key handle is not a valid public key")]
    NotAValidPublicKey,
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("key error: {0}")]
    Default(#[from] anyhow::Error),
}

/// Public half of an elliptic-curve key pair
///
/// Stores exactly one canonical encoding, the uncompressed X9.63 point,
/// next to the opaque handle used for encryption. Every other view
/// (compressed, raw, DER, PEM, coordinates, fingerprints) is derived
/// from the stored bytes on demand.
///
/// # Examples
///
/// ```ignore
/// let public_key = PublicKey::new(&compressed_bytes)?;
///
/// // Look up the private half by its short fingerprint
/// let key_pair = keychain.key_pair(Some(&public_key.sha1()), None)?;
///
/// // Persist as PEM
/// let pem = public_key.pem()?;
/// let recovered = PublicKey::from_pem(&pem)?;
/// assert_eq!(public_key, recovered);
/// ```
#[derive(Clone)]
pub struct PublicKey {
    uncompressed: [u8; UNCOMPRESSED_SIZE],
    handle: Arc<dyn KeyHandle>,
}

impl PublicKey {
    fn from_uncompressed(
        bytes: &[u8],
        handle: Option<Arc<dyn KeyHandle>>,
    ) -> Result<Self, KeyError> {
        if !is_uncompressed(bytes) {
            return Err(KeyError::UnsupportedKeyFormat);
        }
        let mut uncompressed = [0; UNCOMPRESSED_SIZE];
        uncompressed.copy_from_slice(bytes);
        let handle =
            handle.unwrap_or_else(|| Arc::new(SoftwareKey::public(uncompressed.to_vec())));
        Ok(Self {
            uncompressed,
            handle,
        })
    }

    /// Parse a public key on the default curve
    ///
    /// See [`PublicKey::with_curve`] for the accepted encodings.
    pub fn new(data: &[u8]) -> Result<Self, KeyError> {
        Self::with_curve(data, KeyCurve::default())
    }

    /// Parse a public key, trying in order:
    /// - uncompressed X9.63 (65 bytes)
    /// - compressed X9.63 (33 bytes), uncompressed with `curve`
    /// - raw `x || y` (64 bytes)
    /// - SubjectPublicKeyInfo DER
    pub fn with_curve(data: &[u8], curve: KeyCurve) -> Result<Self, KeyError> {
        if is_uncompressed(data) {
            Self::from_uncompressed(data, None)
        } else if is_compressed(data) {
            Self::from_uncompressed(&point::uncompress(data, curve)?, None)
        } else if data.len() == RAW_SIZE {
            let mut prefixed = Vec::with_capacity(UNCOMPRESSED_SIZE);
            prefixed.push(0x04);
            prefixed.extend_from_slice(data);
            Self::from_uncompressed(&prefixed, None)
        } else if let Ok(key) = p256::PublicKey::from_public_key_der(data) {
            Self::from_uncompressed(key.to_encoded_point(false).as_bytes(), None)
        } else {
            Err(KeyError::UnsupportedKeyFormat)
        }
    }

    /// Wrap a native public key handle
    ///
    /// # Errors
    ///
    /// Returns `KeyError::NotAValidPublicKey` if the handle does not export
    /// an uncompressed 256-bit point.
    pub fn from_handle(handle: Arc<dyn KeyHandle>) -> Result<Self, KeyError> {
        let key = handle.external_representation()?;
        if !is_uncompressed(&key) {
            return Err(KeyError::NotAValidPublicKey);
        }
        Self::from_uncompressed(&key, Some(handle))
    }

    /// Parse a public key from a `PUBLIC KEY` PEM block
    pub fn from_pem(pem_str: &str) -> Result<Self, KeyError> {
        let pem = pem::parse(pem_str).map_err(|e| anyhow::anyhow!("failed to parse PEM: {}", e))?;
        if pem.tag() != PUBLIC_KEY_PEM_TAG {
            return Err(anyhow::anyhow!("invalid PEM tag, expected PUBLIC KEY").into());
        }
        let key = p256::PublicKey::from_public_key_der(pem.contents())
            .map_err(|e| anyhow::anyhow!("invalid public key DER: {}", e))?;
        Self::from_uncompressed(key.to_encoded_point(false).as_bytes(), None)
    }

    /// Parse a public key from a hexadecimal string in any accepted encoding
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes =
            hex::decode(hex).map_err(|_| anyhow::anyhow!("public key hex decode error"))?;
        Self::new(&bytes)
    }

    pub fn handle(&self) -> &Arc<dyn KeyHandle> {
        &self.handle
    }

    /// The curve this key's point lies on
    pub fn curve(&self) -> KeyCurve {
        point::detect_curve(&self.uncompressed)
    }

    pub fn uncompressed(&self) -> &[u8] {
        &self.uncompressed
    }

    pub fn compressed(&self) -> Vec<u8> {
        let mut compressed = Vec::with_capacity(1 + COORDINATE_SIZE);
        compressed.push(0x02 + self.uncompressed[UNCOMPRESSED_SIZE - 1] % 2);
        compressed.extend_from_slice(self.x());
        compressed
    }

    /// `x || y` without the format byte
    pub fn raw(&self) -> &[u8] {
        &self.uncompressed[1..]
    }

    pub fn x(&self) -> &[u8] {
        &self.uncompressed[1..=COORDINATE_SIZE]
    }

    pub fn y(&self) -> &[u8] {
        &self.uncompressed[COORDINATE_SIZE + 1..]
    }

    /// SubjectPublicKeyInfo DER encoding
    ///
    /// # Errors
    ///
    /// Fails if the point is not a valid secp256r1 point.
    pub fn der(&self) -> Result<Vec<u8>, KeyError> {
        let key = p256::PublicKey::from_sec1_bytes(&self.uncompressed)
            .map_err(|_| KeyError::UnsupportedKeyCurve)?;
        let der = key
            .to_public_key_der()
            .map_err(|e| anyhow::anyhow!("failed to encode public key DER: {}", e))?;
        Ok(der.as_bytes().to_vec())
    }

    pub fn pem(&self) -> Result<String, KeyError> {
        Ok(pem::encode(&pem::Pem::new(PUBLIC_KEY_PEM_TAG, self.der()?)))
    }

    /// Short fingerprint, used as the lookup key for the private half
    pub fn sha1(&self) -> [u8; SHA1_SIZE] {
        Sha1::digest(self.uncompressed).into()
    }

    /// Full content fingerprint
    pub fn sha256(&self) -> [u8; SHA256_SIZE] {
        Sha256::digest(self.uncompressed).into()
    }

    /// Hex of the uncompressed encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.uncompressed)
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.uncompressed == other.uncompressed
    }
}

impl Eq for PublicKey {}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uncompressed.hash(state);
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("uncompressed", &self.to_hex())
            .field("hardware_backed", &self.handle.is_hardware_backed())
            .finish()
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}

/// Private half of an elliptic-curve key pair
///
/// Only ever an opaque handle. The encodings below are available when
/// the handle agrees to export itself, which hardware-backed handles
/// never do; those accessors then return `None`.
#[derive(Debug, Clone)]
pub struct PrivateKey {
    handle: Arc<dyn KeyHandle>,
}

impl PrivateKey {
    pub fn new(handle: Arc<dyn KeyHandle>) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &Arc<dyn KeyHandle> {
        &self.handle
    }

    pub fn is_hardware_backed(&self) -> bool {
        self.handle.is_hardware_backed()
    }

    /// Derive the public key by asking the handle for its public half
    ///
    /// `None` when the provider can't supply it, which is not an error
    /// for a key only used to decrypt.
    pub fn public_key(&self) -> Option<PublicKey> {
        let public_handle = self.handle.public_handle()?;
        PublicKey::from_handle(public_handle).ok()
    }

    /// Full X9.63 form, uncompressed public point followed by the scalar
    pub fn x963(&self) -> Option<Vec<u8>> {
        self.handle
            .external_representation()
            .ok()
            .filter(|key| is_full_public_private(key))
    }

    /// The raw 32 byte scalar
    pub fn raw(&self) -> Option<Vec<u8>> {
        self.x963().map(|key| key[UNCOMPRESSED_SIZE..].to_vec())
    }

    /// PKCS#8 DER encoding
    pub fn der(&self) -> Option<Vec<u8>> {
        let secret = p256::SecretKey::from_slice(&self.raw()?).ok()?;
        let der = secret.to_pkcs8_der().ok()?;
        Some(der.as_bytes().to_vec())
    }

    pub fn pem(&self) -> Option<String> {
        Some(pem::encode(&pem::Pem::new(PRIVATE_KEY_PEM_TAG, self.der()?)))
    }

    /// Normalize private key bytes to the 97 byte X9.63 form providers import
    ///
    /// Accepts either the X9.63 form itself or a raw 32 byte scalar on
    /// secp256r1, for which the public point is regenerated.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::UnsupportedKeyFormat` for any other length or curve.
    pub fn x963_from_bytes(data: &[u8], curve: KeyCurve) -> Result<Vec<u8>, KeyError> {
        if is_full_public_private(data) {
            return Ok(data.to_vec());
        }
        if data.len() != PRIVATE_KEY_SIZE || curve != KeyCurve::Secp256r1 {
            return Err(KeyError::UnsupportedKeyFormat);
        }
        let secret = p256::SecretKey::from_slice(data)
            .map_err(|_| anyhow::anyhow!("invalid secp256r1 private scalar"))?;
        let public = secret.public_key().to_encoded_point(false);
        let mut x963 = Vec::with_capacity(UNCOMPRESSED_SIZE + PRIVATE_KEY_SIZE);
        x963.extend_from_slice(public.as_bytes());
        x963.extend_from_slice(&secret.to_bytes());
        Ok(x963)
    }
}
