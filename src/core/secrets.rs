//! Salted hashing of PINs, passwords and card verification codes
//!
//! Secrets are stored as Argon2id PHC strings. Verification reads the
//! parameters back from the stored string and compares in constant time.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::config::EngineConfig;
use crate::types::{BankError, BankResult};

/// Hashes secrets with the configured Argon2id cost
#[derive(Debug, Clone)]
pub struct SecretHasher {
    params: Params,
}

impl SecretHasher {
    pub fn new(config: &EngineConfig) -> BankResult<Self> {
        let params = Params::new(config.secret_memory_kib, config.secret_iterations, 1, None)
            .map_err(|e| BankError::validation("secret hashing cost", e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a secret with a fresh random salt
    pub fn hash(&self, secret: &str) -> BankResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| BankError::storage(format!("failed to hash secret: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Check a secret against a stored hash
    ///
    /// An unparsable stored hash never matches.
    pub fn verify(&self, secret: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => self
                .argon2()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

/// PINs are 4 to 6 ASCII digits
pub fn validate_pin(pin: &str) -> BankResult<()> {
    if (4..=6).contains(&pin.len()) && pin.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(BankError::validation("pin", "must be 4 to 6 digits"))
    }
}
