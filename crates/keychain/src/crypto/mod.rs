//! Key material for the keychain
//!
//! This module provides everything that deals with elliptic-curve keys:
//!
//! - **Curves**: domain parameters for the curves we can decode points on
//! - **Point codec**: compressed / uncompressed / raw X9.63 encodings of a public key,
//!   including recovering `y` from `x` and the parity flag
//! - **Keys**: `PublicKey` and `PrivateKey` wrappers around opaque key handles
//! - **Providers**: the `CryptoProvider` seam plus a portable software implementation
//!
//! # Handles
//!
//! Private keys are never held as raw scalars by this crate. A `PrivateKey` wraps a
//! `KeyHandle`, a capability owned by whatever provider created it. The handle can be
//! asked for its public half and, if the provider allows it, for its external
//! representation. Hardware-backed handles refuse the latter.
//!
//! # Item Encryption
//!
//! Items are encrypted to a P-256 public key with ECIES:
//! 1. Generate an ephemeral P-256 keypair
//! 2. Perform ECDH against the recipient key
//! 3. Derive an AES-256-GCM key and nonce with the X9.63 KDF (SHA-256)
//! 4. Package as `ephemeral_pubkey || ciphertext || tag`
//!
//! Only the holder of the matching private handle can reverse it.

mod curve;
mod handle;
mod keys;
mod point;
mod software;

pub use curve::{CurveParameters, KeyCurve};
pub use handle::{CryptoProvider, KeyClass, KeyHandle, ProviderError};
pub use keys::{KeyError, PrivateKey, PublicKey, PRIVATE_KEY_SIZE, SHA1_SIZE, SHA256_SIZE};
pub use point::{
    compress, detect_curve, is_compressed, is_full_public_private, is_uncompressed, uncompress,
    COMPRESSED_SIZE, FULL_PUBLIC_PRIVATE_SIZE, RAW_SIZE, UNCOMPRESSED_SIZE,
};
pub use software::{SoftwareCryptoProvider, SoftwareKey};
