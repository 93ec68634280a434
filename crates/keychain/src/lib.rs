/**
 * Configuration for a keychain handle, loadable
 *  from a TOML file.
 */
pub mod config;
/**
 * Key material and cryptographic seams.
 *  - Curve parameters and the point codec
 *  - Public and private key wrappers
 *  - The opaque crypto provider and a software
 *    P-256 implementation of it
 */
pub mod crypto;
/**
 * The public surface: key pair registry,
 *  item save/read/delete and the transparent
 *  envelope encryption tying them together.
 */
pub mod keychain;
/**
 * The opaque secure store we persist records in.
 *  Just a trait over attribute bags plus an
 *  in-memory implementation.
 */
pub mod store;

pub mod prelude {
    pub use crate::config::KeychainConfig;
    pub use crate::crypto::{KeyCurve, PrivateKey, PublicKey, SoftwareCryptoProvider};
    pub use crate::keychain::{
        ItemAttributes, ItemType, KeyPair, Keychain, KeychainError, Options,
        ITEM_ENCRYPTION_KEY_TAG,
    };
    pub use crate::store::MemorySecureStore;
}
