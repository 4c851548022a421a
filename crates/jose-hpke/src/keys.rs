//! Recipient key-pair generation.

use jose_hpke_crypto::base64url_encode;
use p256::elliptic_curve::rand_core::OsRng;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use zeroize::Zeroizing;

use crate::alg::KeyManagement;
use crate::encapsulation::generate_key_pair;
use crate::error::JweError;
use crate::jwk::{EcPublicJwk, Jwk};
use crate::thumbprint::thumbprint_uri;

/// Generate a private JWK for `alg`.
///
/// The `kid` is the key's RFC 7638 thumbprint URI, so the same public key
/// always gets the same identifier.
pub fn generate(alg: &str) -> Result<Jwk, JweError> {
    let management = KeyManagement::from_alg(alg)?;
    let (public, scalar) = match management {
        KeyManagement::Hpke(suite) => generate_key_pair(suite),
        KeyManagement::EcdhEsKeyWrap(_) => {
            let secret = p256::SecretKey::random(&mut OsRng);
            let point = secret.public_key().to_encoded_point(false);
            (
                point.as_bytes().to_vec(),
                Zeroizing::new(secret.to_bytes().to_vec()),
            )
        }
    };
    let epk = EcPublicJwk::from_sec1(management.curve(), &public)?;

    let mut jwk = Jwk {
        kid: String::new(),
        alg: management.as_str().to_string(),
        kty: epk.kty,
        crv: epk.crv,
        x: epk.x,
        y: epk.y,
        d: Some(base64url_encode(&scalar)),
    };
    jwk.kid = thumbprint_uri(&jwk)?;
    Ok(jwk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alg::{ALG_ECDH_ES_A128KW, ALG_HPKE_P256_SHA256_A128GCM, ALG_HPKE_P384_SHA384_A128GCM};
    use crate::jwk::{private_key_from, public_key_from};
    use crate::thumbprint::THUMBPRINT_URI_PREFIX;
    use jose_hpke_crypto::base64url_decode;

    #[test]
    fn generates_for_every_supported_alg() {
        for (alg, crv, len) in [
            (ALG_HPKE_P256_SHA256_A128GCM, "P-256", 32),
            (ALG_HPKE_P384_SHA384_A128GCM, "P-384", 48),
            (ALG_ECDH_ES_A128KW, "P-256", 32),
        ] {
            let jwk = generate(alg).unwrap();
            assert_eq!(jwk.alg, alg);
            assert_eq!(jwk.kty, "EC");
            assert_eq!(jwk.crv, crv);
            assert!(jwk.is_private());
            assert_eq!(base64url_decode(&jwk.x).unwrap().len(), len);
            assert_eq!(base64url_decode(jwk.d.as_deref().unwrap()).unwrap().len(), len);

            public_key_from(&jwk).unwrap();
            private_key_from(&jwk).unwrap();
        }
    }

    #[test]
    fn kid_is_thumbprint_uri_of_public_part() {
        let jwk = generate(ALG_HPKE_P256_SHA256_A128GCM).unwrap();
        assert!(jwk.kid.starts_with(THUMBPRINT_URI_PREFIX));
        assert_eq!(jwk.kid, thumbprint_uri(&jwk.to_public()).unwrap());
    }

    #[test]
    fn fresh_keys_each_call() {
        let a = generate(ALG_ECDH_ES_A128KW).unwrap();
        let b = generate(ALG_ECDH_ES_A128KW).unwrap();
        assert_ne!(a.kid, b.kid);
    }

    #[test]
    fn unsupported_alg() {
        assert!(matches!(
            generate("ES256"),
            Err(JweError::UnsupportedAlgorithm(_))
        ));
    }
}
