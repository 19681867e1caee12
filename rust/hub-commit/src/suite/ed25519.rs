//! Ed25519 (`EdDSA`) signatures over `OKP`/`Ed25519` JWKs.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use super::{CryptoSuite, VerifyError, coordinate};
use crate::did::PublicKey;

/// Verifies `EdDSA` JWS signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Suite;

impl CryptoSuite for Ed25519Suite {
    fn algorithms(&self) -> &'static [&'static str] {
        &["EdDSA"]
    }

    fn verify(
        &self,
        key: &PublicKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), VerifyError> {
        let jwk = &key.public_key_jwk;
        if jwk.kty != "OKP" || jwk.crv != "Ed25519" {
            return Err(VerifyError::UnsupportedKey {
                expected: "OKP/Ed25519",
                found: format!("{}/{}", jwk.kty, jwk.crv),
            });
        }

        let bytes = coordinate::<32>(&jwk.x, "x")?;
        let verifying_key =
            VerifyingKey::from_bytes(&bytes).map_err(|e| VerifyError::MalformedKey(e.to_string()))?;
        let signature =
            Signature::from_slice(signature).map_err(|_| VerifyError::MalformedSignature)?;

        verifying_key.verify(message, &signature)?;
        Ok(())
    }
}
