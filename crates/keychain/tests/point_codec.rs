//! Property-style tests for the X9.63 point codec over many keys

mod common;

use keychain::crypto::{
    compress, detect_curve, is_compressed, is_uncompressed, uncompress, CryptoProvider, KeyCurve,
    KeyError, PrivateKey, PublicKey, SoftwareCryptoProvider,
};
use keychain::keychain::Options;

const ROUNDS: usize = 64;

fn generated_public_key() -> PublicKey {
    let access = Options::default().access_control(true).unwrap();
    let handle = SoftwareCryptoProvider
        .generate_private_key(KeyCurve::Secp256r1, false, &access)
        .unwrap();
    PrivateKey::new(handle).public_key().unwrap()
}

#[test]
fn test_roundtrip_and_idempotence() {
    for _ in 0..ROUNDS {
        let key = generated_public_key();
        let uncompressed = key.uncompressed();

        let compressed = compress(uncompressed).unwrap();
        assert!(is_compressed(&compressed));
        assert_eq!(compressed, key.compressed());
        assert_eq!(
            uncompress(&compressed, KeyCurve::Secp256r1).unwrap(),
            uncompressed
        );

        assert_eq!(compress(&compressed).unwrap(), compressed);
        assert_eq!(
            uncompress(uncompressed, KeyCurve::Secp256r1).unwrap(),
            uncompressed
        );
    }
}

#[test]
fn test_generated_keys_are_detected() {
    for _ in 0..ROUNDS {
        let key = generated_public_key();
        assert_eq!(detect_curve(key.uncompressed()), KeyCurve::Secp256r1);
        assert_eq!(key.curve(), KeyCurve::Secp256r1);
    }
}

#[test]
fn test_random_points_are_unknown() {
    for _ in 0..ROUNDS {
        let mut bytes: [u8; 65] = common::random_bytes();
        bytes[0] = 0x04;
        assert!(is_uncompressed(&bytes));
        assert_eq!(detect_curve(&bytes), KeyCurve::Unknown);
    }
}

#[test]
fn test_random_compressed_points_never_leave_the_curve() {
    let mut accepted = 0;
    for _ in 0..ROUNDS {
        let mut bytes: [u8; 33] = common::random_bytes();
        bytes[0] = 0x02 | (bytes[0] & 0x01);

        match uncompress(&bytes, KeyCurve::Secp256r1) {
            Ok(uncompressed) => {
                accepted += 1;
                assert_eq!(detect_curve(&uncompressed), KeyCurve::Secp256r1);
                assert_eq!(compress(&uncompressed).unwrap(), bytes);
            }
            Err(KeyError::PointNotOnCurve) => {}
            Err(e) => panic!("Expected PointNotOnCurve, got {:?}", e),
        }
    }
    // about half of all x coordinates are on the curve
    assert!(accepted > 0 && accepted < ROUNDS);
}

#[test]
fn test_public_key_views_agree() {
    let key = generated_public_key();
    let parsed = PublicKey::new(&key.compressed()).unwrap();
    assert_eq!(parsed.x(), key.x());
    assert_eq!(parsed.y(), key.y());
    assert_eq!(parsed.raw(), key.raw());
    assert_eq!(parsed.sha1(), key.sha1());
    assert_eq!(parsed.sha256(), key.sha256());
    assert_eq!(parsed.der().unwrap(), key.der().unwrap());
}
