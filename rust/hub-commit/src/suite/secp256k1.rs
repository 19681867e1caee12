//! secp256k1 ECDSA (`ES256K`) signatures over `EC`/`secp256k1` JWKs.
//!
//! Signatures are the 64-byte JWS `r || s` form over a SHA-256 digest of the
//! signing input. High-S signatures are rejected.

use k256::ecdsa::{Signature, VerifyingKey, signature::Verifier};

use super::{CryptoSuite, VerifyError, coordinate};
use crate::did::PublicKey;

/// Verifies `ES256K` JWS signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Suite;

impl CryptoSuite for Secp256k1Suite {
    fn algorithms(&self) -> &'static [&'static str] {
        &["ES256K"]
    }

    fn verify(
        &self,
        key: &PublicKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), VerifyError> {
        let jwk = &key.public_key_jwk;
        if jwk.kty != "EC" || jwk.crv != "secp256k1" {
            return Err(VerifyError::UnsupportedKey {
                expected: "EC/secp256k1",
                found: format!("{}/{}", jwk.kty, jwk.crv),
            });
        }
        let y = jwk
            .y
            .as_deref()
            .ok_or_else(|| VerifyError::MalformedKey("y: missing".into()))?;

        let mut sec1 = Vec::with_capacity(65);
        sec1.push(0x04);
        sec1.extend_from_slice(&coordinate::<32>(&jwk.x, "x")?);
        sec1.extend_from_slice(&coordinate::<32>(y, "y")?);

        let verifying_key = VerifyingKey::from_sec1_bytes(&sec1)
            .map_err(|e| VerifyError::MalformedKey(e.to_string()))?;
        let signature =
            Signature::from_slice(signature).map_err(|_| VerifyError::MalformedSignature)?;

        verifying_key.verify(message, &signature)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::did::Jwk;
    use hub_common::encoding;
    use k256::ecdsa::{SigningKey, signature::Signer};

    fn key_for(signing_key: &SigningKey) -> PublicKey {
        let point = signing_key.verifying_key().to_encoded_point(false);
        PublicKey {
            id: "#key-1".into(),
            key_type: "EcdsaSecp256k1VerificationKey2019".into(),
            controller: None,
            public_key_jwk: Jwk {
                kty: "EC".into(),
                crv: "secp256k1".into(),
                x: encoding::encode(point.x().unwrap()),
                y: Some(encoding::encode(point.y().unwrap())),
            },
        }
    }

    #[test]
    fn it_verifies_signatures() {
        let signing_key = SigningKey::from_slice(&[3u8; 32]).unwrap();
        let signature: Signature = signing_key.sign(b"protected.payload");

        Secp256k1Suite
            .verify(&key_for(&signing_key), b"protected.payload", &signature.to_bytes())
            .unwrap();
    }

    #[test]
    fn it_rejects_signatures_from_other_keys() {
        let signer = SigningKey::from_slice(&[3u8; 32]).unwrap();
        let other = SigningKey::from_slice(&[4u8; 32]).unwrap();
        let signature: Signature = other.sign(b"protected.payload");

        let result = Secp256k1Suite.verify(
            &key_for(&signer),
            b"protected.payload",
            &signature.to_bytes(),
        );
        assert!(matches!(result, Err(VerifyError::Mismatch(_))));
    }

    #[test]
    fn it_requires_both_coordinates() {
        let signing_key = SigningKey::from_slice(&[3u8; 32]).unwrap();
        let mut key = key_for(&signing_key);
        key.public_key_jwk.y = None;

        let result = Secp256k1Suite.verify(&key, b"m", &[0u8; 64]);
        assert!(matches!(result, Err(VerifyError::MalformedKey(_))));
    }
}
