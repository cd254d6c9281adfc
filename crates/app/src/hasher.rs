//! bcrypt-backed credential hashing.

use domain::user::{CredentialHasher, HashError};

#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| HashError(e.to_string()))
    }

    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, HashError> {
        bcrypt::verify(plaintext, digest).map_err(|e| HashError(e.to_string()))
    }
}
