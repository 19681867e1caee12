//! Commit envelopes and their integrity rules.
//!
//! A [`Commit`] is one immutable mutation of one logical object, transmitted as
//! a JWS-style envelope `{protected, payload, signature, header?}`. Parsing
//! validates the protected headers and derives the commit's [`Revision`], its
//! issuer DID, and (for creates) the object id it originates.
//!
//! A [`SignedCommit`] adds the signature, verified against a key published in
//! the issuer's DID document through a [`VerificationContext`]:
//!
//! ```text
//! SignedCommit::validate(ctx)
//!   ├── ctx.resolver().resolve(iss)   → DidDocument
//!   ├── document.public_key(kid)      → PublicKey
//!   └── ctx.suites().get(alg).verify(key, "<protected>.<payload>", signature)
//! ```
//!
//! [`Revision`]: hub_common::Revision

pub mod commit;
pub mod did;
pub mod headers;
#[cfg(any(test, feature = "helpers"))]
pub mod helpers;
pub mod resolver;
pub mod signed;
pub mod suite;

pub use commit::*;
pub use did::*;
pub use headers::*;
pub use resolver::*;
pub use signed::*;
pub use suite::*;
