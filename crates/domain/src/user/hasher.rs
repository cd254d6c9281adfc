//! Credential hashing seam.

use thiserror::Error;

#[derive(Debug, Error)]
#[error("credential hashing failed: {0}")]
pub struct HashError(pub String);

/// One-way hashing of user passwords. Digests are opaque to the domain.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, HashError>;

    /// Returns true if `plaintext` produced `digest`.
    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, HashError>;
}

/// Reversible stand-in for tests and local runs. Never use it for real
/// credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextHasher;

const PREFIX: &str = "plain$";

impl CredentialHasher for PlainTextHasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        Ok(format!("{PREFIX}{plaintext}"))
    }

    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, HashError> {
        let stored = digest
            .strip_prefix(PREFIX)
            .ok_or_else(|| HashError("digest was not produced by this hasher".to_string()))?;
        Ok(stored == plaintext)
    }
}
