//! Shared test utilities for keychain integration tests
#![allow(dead_code)]

use std::sync::Once;

use keychain::prelude::*;
use keychain::store::{AttrKey, Attributes, MatchLimit, Query, SecureStore};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a log subscriber once per test binary, filtered by `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub type TestKeychain = Keychain<MemorySecureStore, SoftwareCryptoProvider>;

/// A keychain over a fresh in-memory store
pub fn keychain() -> TestKeychain {
    init_tracing();
    Keychain::new(MemorySecureStore::new(), SoftwareCryptoProvider).with_service("tests")
}

/// The raw record the store holds for an item
pub fn raw_item(keychain: &TestKeychain, name: &str, service: &str) -> Attributes {
    let query = Query::items()
        .with(AttrKey::Account, name)
        .with(AttrKey::Service, service);
    keychain
        .store()
        .find(&query, MatchLimit::One)
        .unwrap()
        .remove(0)
}

/// Random bytes for test inputs
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    getrandom::getrandom(&mut bytes).unwrap();
    bytes
}
