//! JWK / JWKS types and the key provider used by the orchestrator.
//!
//! Keys are imported into raw SEC1 material here; the HPKE and ECDH layers
//! turn that into curve-specific handles and validate the point or scalar.

use std::fmt;

use jose_hpke_crypto::{base64url_decode, base64url_encode};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::JweError;

/// Elliptic curves accepted for recipient keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    P256,
    P384,
}

impl Curve {
    pub fn from_crv(crv: &str) -> Result<Self, JweError> {
        match crv {
            "P-256" => Ok(Self::P256),
            "P-384" => Ok(Self::P384),
            other => Err(JweError::InvalidKeyMaterial(format!(
                "unsupported curve: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
        }
    }

    /// Field element / scalar size in bytes.
    pub fn coordinate_length(&self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An EC JSON Web Key. `kid` and `alg` are mandatory; `d` is present on
/// private keys only.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kid: String,
    pub alg: String,
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub y: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

impl Jwk {
    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }

    /// Public projection: same identifier, algorithm and point, without `d`.
    pub fn to_public(&self) -> Jwk {
        Jwk {
            kid: self.kid.clone(),
            alg: self.alg.clone(),
            kty: self.kty.clone(),
            crv: self.crv.clone(),
            x: self.x.clone(),
            y: self.y.clone(),
            d: None,
        }
    }
}

impl fmt::Debug for Jwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwk")
            .field("kid", &self.kid)
            .field("alg", &self.alg)
            .field("kty", &self.kty)
            .field("crv", &self.crv)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("d", &self.d.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// An ordered key set: `{"keys": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    pub fn new(keys: Vec<Jwk>) -> Self {
        Self { keys }
    }
}

/// Minimal EC public key JWK, as carried in `epk`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcPublicJwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub y: String,
}

impl EcPublicJwk {
    /// Build from an uncompressed SEC1 point (`0x04 || x || y`).
    pub fn from_sec1(curve: Curve, sec1: &[u8]) -> Result<Self, JweError> {
        let n = curve.coordinate_length();
        if sec1.len() != 1 + 2 * n || sec1[0] != 0x04 {
            return Err(JweError::InvalidKeyMaterial(format!(
                "expected uncompressed {} point of {} bytes",
                curve,
                1 + 2 * n
            )));
        }
        Ok(Self {
            kty: "EC".to_string(),
            crv: curve.as_str().to_string(),
            x: base64url_encode(&sec1[1..1 + n]),
            y: base64url_encode(&sec1[1 + n..]),
        })
    }
}

/// An imported public key: curve plus uncompressed SEC1 point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyMaterial {
    pub curve: Curve,
    pub sec1: Vec<u8>,
}

/// An imported private key: curve plus big-endian scalar. Wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKeyMaterial {
    #[zeroize(skip)]
    pub curve: Curve,
    scalar: Vec<u8>,
}

impl PrivateKeyMaterial {
    pub(crate) fn new(curve: Curve, scalar: Vec<u8>) -> Self {
        Self { curve, scalar }
    }

    pub fn scalar(&self) -> &[u8] {
        &self.scalar
    }
}

impl fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKeyMaterial({}, [REDACTED])", self.curve)
    }
}

/// Decode a coordinate or scalar, left-padding to the curve size.
/// JWKs may omit leading zero bytes.
fn decode_fixed(name: &str, value: &str, len: usize) -> Result<Vec<u8>, JweError> {
    let bytes = base64url_decode(value)
        .map_err(|e| JweError::InvalidKeyMaterial(format!("{}: {}", name, e)))?;
    if bytes.is_empty() || bytes.len() > len {
        return Err(JweError::InvalidKeyMaterial(format!(
            "{}: expected at most {} bytes, got {}",
            name,
            len,
            bytes.len()
        )));
    }
    let mut out = vec![0u8; len - bytes.len()];
    out.extend_from_slice(&bytes);
    Ok(out)
}

/// Import the public part of an EC key given its raw JWK members.
pub fn ec_public_key_from(
    kty: &str,
    crv: &str,
    x: &str,
    y: &str,
) -> Result<PublicKeyMaterial, JweError> {
    if kty != "EC" {
        return Err(JweError::InvalidKeyMaterial(format!(
            "expected kty EC, got {}",
            kty
        )));
    }
    let curve = Curve::from_crv(crv)?;
    let n = curve.coordinate_length();

    let mut sec1 = Vec::with_capacity(1 + 2 * n);
    sec1.push(0x04);
    sec1.extend_from_slice(&decode_fixed("x", x, n)?);
    sec1.extend_from_slice(&decode_fixed("y", y, n)?);
    Ok(PublicKeyMaterial { curve, sec1 })
}

/// Key provider: public key handle from a JWK.
pub fn public_key_from(jwk: &Jwk) -> Result<PublicKeyMaterial, JweError> {
    ec_public_key_from(&jwk.kty, &jwk.crv, &jwk.x, &jwk.y)
}

/// Key provider: private key handle from a JWK. Requires `d`.
pub fn private_key_from(jwk: &Jwk) -> Result<PrivateKeyMaterial, JweError> {
    if jwk.kty != "EC" {
        return Err(JweError::InvalidKeyMaterial(format!(
            "expected kty EC, got {}",
            jwk.kty
        )));
    }
    let curve = Curve::from_crv(&jwk.crv)?;
    let d = jwk
        .d
        .as_deref()
        .ok_or_else(|| JweError::InvalidKeyMaterial("missing d (private key)".to_string()))?;
    let scalar = decode_fixed("d", d, curve.coordinate_length())?;
    Ok(PrivateKeyMaterial::new(curve, scalar))
}

/// Check that a key sits on the curve an algorithm requires.
pub(crate) fn require_curve(actual: Curve, expected: Curve) -> Result<(), JweError> {
    if actual != expected {
        return Err(JweError::InvalidKeyMaterial(format!(
            "algorithm requires {}, key is on {}",
            expected, actual
        )));
    }
    Ok(())
}
