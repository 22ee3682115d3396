//! Argon2 password hashing

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use resolution::error::CredentialError;
use resolution::ports::CredentialHasher;

/// Argon2id with default parameters and a random salt per hash
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError(format!("Failed to hash password: {}", e)))
    }

    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, CredentialError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| CredentialError(format!("Failed to parse password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
