//! X9.63 point codec
//!
//! Public keys move around in three byte layouts:
//!
//! ```text
//! compressed:    [ 0x02 | 0x03 ][ x: 32 bytes ]               33 bytes
//! uncompressed:  [ 0x04 ][ x: 32 bytes ][ y: 32 bytes ]       65 bytes
//! raw:           [ x: 32 bytes ][ y: 32 bytes ]               64 bytes
//! ```
//!
//! Private keys exported from a handle use the full X9.63 form, the
//! uncompressed public point followed by the 32 byte scalar (97 bytes).
//!
//! Compressing only drops `y` and keeps its parity in the flag byte.
//! Uncompressing recomputes `y` from the curve equation, which needs
//! a square root mod p. For primes p ≡ 3 (mod 4) that root is just
//! `(y^2)^((p+1)/4)`, and one of `{y, p - y}` has the requested parity.

use num_bigint::BigUint;

use super::curve::{CurveParameters, KeyCurve};
use super::keys::KeyError;

/// Size of a field element / coordinate in bytes
pub const COORDINATE_SIZE: usize = 32;
/// Size of a compressed X9.63 public key
pub const COMPRESSED_SIZE: usize = 1 + COORDINATE_SIZE;
/// Size of an uncompressed X9.63 public key
pub const UNCOMPRESSED_SIZE: usize = 1 + 2 * COORDINATE_SIZE;
/// Size of a bare `x || y` public key
pub const RAW_SIZE: usize = 2 * COORDINATE_SIZE;
/// Size of an X9.63 public key followed by its private scalar
pub const FULL_PUBLIC_PRIVATE_SIZE: usize = UNCOMPRESSED_SIZE + COORDINATE_SIZE;

const FLAG_EVEN: u8 = 0x02;
const FLAG_ODD: u8 = 0x03;
const FLAG_UNCOMPRESSED: u8 = 0x04;

pub fn is_compressed(key: &[u8]) -> bool {
    key.len() == COMPRESSED_SIZE && matches!(key[0], FLAG_EVEN | FLAG_ODD)
}

pub fn is_uncompressed(key: &[u8]) -> bool {
    key.len() == UNCOMPRESSED_SIZE && key[0] == FLAG_UNCOMPRESSED
}

pub fn is_full_public_private(key: &[u8]) -> bool {
    key.len() == FULL_PUBLIC_PRIVATE_SIZE && key[0] == FLAG_UNCOMPRESSED
}

/// Compress an uncompressed public key
///
/// Compressed input is returned unchanged.
///
/// # Errors
///
/// Returns `KeyError::UnsupportedKeyFormat` for anything that is neither
/// a compressed nor an uncompressed 256-bit point.
pub fn compress(key: &[u8]) -> Result<Vec<u8>, KeyError> {
    if is_compressed(key) {
        return Ok(key.to_vec());
    }
    if !is_uncompressed(key) {
        return Err(KeyError::UnsupportedKeyFormat);
    }
    let flag = FLAG_EVEN + (key[UNCOMPRESSED_SIZE - 1] % 2);
    let mut compressed = Vec::with_capacity(COMPRESSED_SIZE);
    compressed.push(flag);
    compressed.extend_from_slice(&key[1..=COORDINATE_SIZE]);
    Ok(compressed)
}

/// Uncompress a compressed public key on `curve`
///
/// Uncompressed input is returned unchanged.
///
/// # Errors
///
/// - `KeyError::UnsupportedKeyFormat` if the input is not a 256-bit point encoding
/// - `KeyError::UnsupportedKeyCurve` if we have no parameters for `curve`
/// - `KeyError::PointNotOnCurve` if `x` has no matching `y` on `curve`
pub fn uncompress(key: &[u8], curve: KeyCurve) -> Result<Vec<u8>, KeyError> {
    if is_uncompressed(key) {
        return Ok(key.to_vec());
    }
    if !is_compressed(key) {
        return Err(KeyError::UnsupportedKeyFormat);
    }
    let params = curve.parameters().ok_or(KeyError::UnsupportedKeyCurve)?;
    if !params.has_simple_sqrt() {
        return Err(KeyError::UnsupportedKeyCurve);
    }

    let x_bytes = &key[1..=COORDINATE_SIZE];
    let x = BigUint::from_bytes_be(x_bytes);
    let y = calculate_y(&x, &params, key[0] == FLAG_ODD)?;

    let mut uncompressed = Vec::with_capacity(UNCOMPRESSED_SIZE);
    uncompressed.push(FLAG_UNCOMPRESSED);
    uncompressed.extend_from_slice(x_bytes);
    uncompressed.extend_from_slice(&left_pad(&y.to_bytes_be()));
    Ok(uncompressed)
}

/// Recover `y` for `x` with the requested parity
///
/// The candidate root is squared again and compared against the curve
/// equation, so an `x` without a valid point is rejected rather than
/// silently producing a point off the curve.
fn calculate_y(x: &BigUint, params: &CurveParameters, odd: bool) -> Result<BigUint, KeyError> {
    let p = &params.p;
    if x >= p {
        return Err(KeyError::PointNotOnCurve);
    }
    let y_squared = params.y_squared(x);
    let exponent = (p + 1u32) >> 2;
    let mut y = y_squared.modpow(&exponent, p);
    if (&y * &y) % p != y_squared {
        return Err(KeyError::PointNotOnCurve);
    }
    if y.bit(0) != odd {
        y = (p - &y) % p;
    }
    Ok(y)
}

fn left_pad(bytes: &[u8]) -> [u8; COORDINATE_SIZE] {
    let mut padded = [0u8; COORDINATE_SIZE];
    // a value reduced mod a 256-bit p never exceeds 32 bytes
    let start = COORDINATE_SIZE.saturating_sub(bytes.len());
    let take = bytes.len().min(COORDINATE_SIZE);
    padded[start..].copy_from_slice(&bytes[bytes.len() - take..]);
    padded
}

/// Find the supported curve an uncompressed key lives on
///
/// A curve matches when compressing the key and uncompressing it
/// again with that curve's parameters reproduces the key exactly,
/// which also checks that the point satisfies the curve equation.
pub fn detect_curve(key: &[u8]) -> KeyCurve {
    KeyCurve::SUPPORTED
        .into_iter()
        .find(|curve| is_curve(*curve, key))
        .unwrap_or(KeyCurve::Unknown)
}

fn is_curve(curve: KeyCurve, key: &[u8]) -> bool {
    if !is_uncompressed(key) {
        return false;
    }
    let Ok(compressed) = compress(key) else {
        return false;
    };
    match uncompress(&compressed, curve) {
        Ok(uncompressed) => uncompressed == key,
        Err(_) => false,
    }
}
