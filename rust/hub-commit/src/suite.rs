//! Signature algorithms.
//!
//! A [`CryptoSuite`] verifies signatures for one or more JWS `alg` values
//! against a [`PublicKey`] from a DID document. The [`CryptoRegistry`] picks
//! the suite named by a commit's `alg` header.

#[cfg(feature = "ed25519")]
pub mod ed25519;
#[cfg(feature = "secp256k1")]
pub mod secp256k1;

use std::{collections::HashMap, fmt, sync::Arc};

use hub_common::ConditionalSync;
#[cfg(any(feature = "ed25519", feature = "secp256k1"))]
use hub_common::encoding;
use thiserror::Error;

use crate::did::PublicKey;

/// Errors from signature verification.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The key is not of a type this suite handles.
    #[error("unsupported key: expected {expected}, found {found}")]
    UnsupportedKey {
        /// What the suite expects, e.g. `OKP/Ed25519`.
        expected: &'static str,
        /// What the key declared.
        found: String,
    },

    /// The key material could not be decoded.
    #[error("malformed public key: {0}")]
    MalformedKey(String),

    /// The signature could not be decoded.
    #[error("malformed signature")]
    MalformedSignature,

    /// The signature does not match the message.
    #[error("signature mismatch: {0}")]
    Mismatch(#[from] signature::Error),
}

/// Verifies signatures for a family of algorithms.
pub trait CryptoSuite: ConditionalSync + fmt::Debug {
    /// JWS `alg` values this suite verifies.
    fn algorithms(&self) -> &'static [&'static str];

    /// Verify `signature` over `message` with `key`.
    fn verify(
        &self,
        key: &PublicKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), VerifyError>;
}

/// Suites indexed by the `alg` values they handle.
#[derive(Debug, Clone)]
pub struct CryptoRegistry {
    suites: HashMap<&'static str, Arc<dyn CryptoSuite>>,
}

impl CryptoRegistry {
    /// A registry with no suites.
    pub fn empty() -> Self {
        Self {
            suites: HashMap::new(),
        }
    }

    /// Register `suite` for each of its algorithms, replacing earlier entries.
    pub fn with_suite(mut self, suite: impl CryptoSuite + 'static) -> Self {
        let suite: Arc<dyn CryptoSuite> = Arc::new(suite);
        for alg in suite.algorithms() {
            self.suites.insert(*alg, suite.clone());
        }
        self
    }

    /// The suite verifying `alg`.
    pub fn get(&self, alg: &str) -> Option<&Arc<dyn CryptoSuite>> {
        self.suites.get(alg)
    }
}

impl Default for CryptoRegistry {
    /// Every suite compiled into this crate.
    fn default() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::empty();
        #[cfg(feature = "ed25519")]
        {
            registry = registry.with_suite(ed25519::Ed25519Suite);
        }
        #[cfg(feature = "secp256k1")]
        {
            registry = registry.with_suite(secp256k1::Secp256k1Suite);
        }
        registry
    }
}

/// Decode a base64url JWK coordinate of exactly `N` bytes.
#[cfg(any(feature = "ed25519", feature = "secp256k1"))]
fn coordinate<const N: usize>(value: &str, name: &str) -> Result<[u8; N], VerifyError> {
    let bytes = encoding::decode(value)
        .map_err(|e| VerifyError::MalformedKey(format!("{name}: {e}")))?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        VerifyError::MalformedKey(format!("{name}: expected {N} bytes, got {}", bytes.len()))
    })
}
