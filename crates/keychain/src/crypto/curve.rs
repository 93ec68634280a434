use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Field prime of secp256r1: 2^256 - 2^224 + 2^192 + 2^96 - 1
const SECP256R1_P: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
];

/// Curve coefficient b of secp256r1
const SECP256R1_B: [u8; 32] = [
    0x5a, 0xc6, 0x35, 0xd8, 0xaa, 0x3a, 0x93, 0xe7, 0xb3, 0xeb, 0xbd, 0x55, 0x76, 0x98, 0x86, 0xbc,
    0x65, 0x1d, 0x06, 0xb0, 0xcc, 0x53, 0xb0, 0xf6, 0x3b, 0xce, 0x3c, 0x3e, 0x27, 0xd2, 0x60, 0x4b,
];

/// Curve coefficient a of secp256r1, before reduction mod p
const SECP256R1_A_NEG: u32 = 3;

/// Curves a key may live on
///
/// A public key whose point is on no supported curve is `Unknown`. Such a
/// key can still be held and fingerprinted, but not compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyCurve {
    #[default]
    Secp256r1,
    Unknown,
}

impl KeyCurve {
    /// Every curve we know the domain parameters of, in detection order
    pub const SUPPORTED: [KeyCurve; 1] = [KeyCurve::Secp256r1];

    /// Domain parameters for this curve, `None` for `Unknown`
    pub fn parameters(&self) -> Option<CurveParameters> {
        match self {
            KeyCurve::Secp256r1 => Some(CurveParameters::secp256r1()),
            KeyCurve::Unknown => None,
        }
    }
}

impl std::fmt::Display for KeyCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyCurve::Secp256r1 => write!(f, "secp256r1"),
            KeyCurve::Unknown => write!(f, "unknown"),
        }
    }
}

/// Short Weierstrass domain parameters: y^2 = x^3 + a*x + b (mod p)
///
/// All three values are kept reduced into `[0, p)`, so a negative `a`
/// is stored as `p - |a|`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveParameters {
    pub p: BigUint,
    pub a: BigUint,
    pub b: BigUint,
}

impl CurveParameters {
    pub fn secp256r1() -> Self {
        let p = BigUint::from_bytes_be(&SECP256R1_P);
        let a = &p - BigUint::from(SECP256R1_A_NEG);
        let b = BigUint::from_bytes_be(&SECP256R1_B);
        Self { p, a, b }
    }

    /// Right hand side of the curve equation for `x`
    pub fn y_squared(&self, x: &BigUint) -> BigUint {
        let x3 = x.modpow(&BigUint::from(3u32), &self.p);
        (x3 + &self.a * x + &self.b) % &self.p
    }

    /// Whether `(p + 1) / 4` exponentiation yields square roots mod p
    pub fn has_simple_sqrt(&self) -> bool {
        &self.p % 4u32 == BigUint::from(3u32)
    }
}
