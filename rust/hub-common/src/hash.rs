use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The size of a commit revision digest in bytes.
pub const REVISION_DIGEST_SIZE: usize = 32;

/// Content-derived identifier of a commit.
///
/// A revision is the SHA-256 digest of the commit's signing input
/// (`"<protected>.<payload>"`, the base64url strings as transmitted), rendered
/// as lowercase hex. Two commits with the same revision are the same commit.
///
/// The ordering of revisions is the lexicographic ordering of their hex
/// encoding, which is what conflict resolution uses to break timestamp ties.
///
/// # Examples
///
/// ```rust
/// use hub_common::Revision;
///
/// let revision = Revision::of("eyJhbGciOiJub25lIn0", "e30");
/// assert_eq!(revision.as_str().len(), 64);
/// assert_eq!(revision, Revision::of("eyJhbGciOiJub25lIn0", "e30"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    /// Computes the revision of a commit from its encoded protected header and
    /// encoded payload.
    pub fn of(protected: &str, payload: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(protected.as_bytes());
        hasher.update(b".");
        hasher.update(payload.as_bytes());
        let digest: [u8; REVISION_DIGEST_SIZE] = hasher.finalize().into();
        Self(hex::encode(digest))
    }

    /// The hex encoding of this revision.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Revision> for String {
    fn from(value: Revision) -> Self {
        value.0
    }
}

impl AsRef<str> for Revision {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
