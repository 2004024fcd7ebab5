//! Password hashing.
//!
//! New hashes use bcrypt at the configured cost unless the config selects
//! argon2id. Verification accepts either format, so switching algorithms
//! never locks existing accounts out; `needs_rehash` reports stale hashes
//! so they can be upgraded on the next successful login.

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tokio::task;

use crate::config::{HashAlgorithm, SecurityConfig};

#[derive(Debug, Clone)]
pub struct PasswordManager {
    algorithm: HashAlgorithm,
    bcrypt_cost: u32,
    argon2_memory_cost_kib: u32,
    argon2_time_cost: u32,
    argon2_parallelism: u32,
}

/// Format of a stored hash, detected from its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredHash {
    Bcrypt { cost: u32 },
    Argon2,
    Unusable,
}

impl StoredHash {
    #[must_use]
    pub fn detect(stored: &str) -> Self {
        if stored.starts_with("$argon2") {
            return Self::Argon2;
        }

        if ["$2a$", "$2b$", "$2x$", "$2y$"]
            .iter()
            .any(|prefix| stored.starts_with(prefix))
        {
            // $2b$12$<salt+hash>
            if let Some(cost) = stored.split('$').nth(2).and_then(|c| c.parse().ok()) {
                return Self::Bcrypt { cost };
            }
        }

        Self::Unusable
    }
}

impl PasswordManager {
    #[must_use]
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self {
            algorithm: config.hasher,
            bcrypt_cost: config.bcrypt_cost,
            argon2_memory_cost_kib: config.argon2_memory_cost_kib,
            argon2_time_cost: config.argon2_time_cost,
            argon2_parallelism: config.argon2_parallelism,
        }
    }

    #[must_use]
    pub const fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        match self.algorithm {
            HashAlgorithm::Bcrypt => {
                bcrypt::hash(password, self.bcrypt_cost).context("Failed to hash password")
            }
            HashAlgorithm::Argon2 => {
                let salt = SaltString::generate(&mut OsRng);
                let hash = self
                    .argon2()?
                    .hash_password(password.as_bytes(), &salt)
                    .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;
                Ok(hash.to_string())
            }
        }
    }

    /// Empty or malformed stored values never verify.
    #[must_use]
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        match StoredHash::detect(stored) {
            StoredHash::Bcrypt { .. } => bcrypt::verify(password, stored).unwrap_or(false),
            StoredHash::Argon2 => PasswordHash::new(stored).is_ok_and(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            }),
            StoredHash::Unusable => false,
        }
    }

    #[must_use]
    pub fn needs_rehash(&self, stored: &str) -> bool {
        match (self.algorithm, StoredHash::detect(stored)) {
            (_, StoredHash::Unusable) => false,
            (HashAlgorithm::Bcrypt, StoredHash::Bcrypt { cost }) => cost < self.bcrypt_cost,
            (HashAlgorithm::Argon2, StoredHash::Argon2) => {
                let Ok(parsed) = PasswordHash::new(stored) else {
                    return false;
                };
                let param = |name: &str| parsed.params.get_decimal(name);
                param("m") != Some(self.argon2_memory_cost_kib)
                    || param("t") != Some(self.argon2_time_cost)
                    || param("p") != Some(self.argon2_parallelism)
            }
            _ => true,
        }
    }

    /// Runs `hash` on the blocking pool; bcrypt and argon2 are CPU bound.
    pub async fn hash_blocking(&self, password: &str) -> Result<String> {
        let manager = self.clone();
        let password = password.to_string();
        task::spawn_blocking(move || manager.hash(&password))
            .await
            .context("Password hashing task panicked")?
    }

    pub async fn verify_blocking(&self, password: &str, stored: &str) -> Result<bool> {
        let manager = self.clone();
        let password = password.to_string();
        let stored = stored.to_string();
        task::spawn_blocking(move || manager.verify(&password, &stored))
            .await
            .context("Password verification task panicked")
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.argon2_memory_cost_kib,
            self.argon2_time_cost,
            self.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for PasswordManager {
    fn default() -> Self {
        Self::from_config(&SecurityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bcrypt_manager(cost: u32) -> PasswordManager {
        PasswordManager::from_config(&SecurityConfig {
            bcrypt_cost: cost,
            ..SecurityConfig::default()
        })
    }

    fn argon2_manager() -> PasswordManager {
        PasswordManager::from_config(&SecurityConfig {
            hasher: HashAlgorithm::Argon2,
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        })
    }

    #[test]
    fn bcrypt_hash_is_not_plaintext_and_verifies() {
        let manager = bcrypt_manager(4);
        let hash = manager.hash("my_password").unwrap();

        assert_ne!(hash, "my_password");
        assert!(hash.starts_with("$2b$04$"));
        assert!(manager.verify("my_password", &hash));
        assert!(!manager.verify("wrong", &hash));
    }

    #[test]
    fn argon2_hash_verifies() {
        let manager = argon2_manager();
        let hash = manager.hash("my_password").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(manager.verify("my_password", &hash));
        assert!(!manager.verify("wrong", &hash));
    }

    #[test]
    fn verifies_hashes_from_the_other_algorithm() {
        let argon_hash = argon2_manager().hash("secret-pw").unwrap();
        assert!(bcrypt_manager(4).verify("secret-pw", &argon_hash));

        let bcrypt_hash = bcrypt_manager(4).hash("secret-pw").unwrap();
        assert!(argon2_manager().verify("secret-pw", &bcrypt_hash));
    }

    #[test]
    fn empty_and_garbage_never_verify() {
        let manager = bcrypt_manager(4);
        assert!(!manager.verify("", ""));
        assert!(!manager.verify("anything", ""));
        assert!(!manager.verify("plaintext", "plaintext"));
        assert!(!manager.verify("x", "$2b$zz$broken"));
    }

    #[test]
    fn detect_reads_bcrypt_cost() {
        let hash = bcrypt_manager(5).hash("pw").unwrap();
        assert_eq!(StoredHash::detect(&hash), StoredHash::Bcrypt { cost: 5 });
        assert_eq!(StoredHash::detect("$argon2id$v=19$..."), StoredHash::Argon2);
        assert_eq!(StoredHash::detect(""), StoredHash::Unusable);
    }

    #[test]
    fn needs_rehash_on_lower_cost_or_other_algorithm() {
        let weak = bcrypt_manager(4).hash("pw").unwrap();
        assert!(bcrypt_manager(5).needs_rehash(&weak));
        assert!(!bcrypt_manager(4).needs_rehash(&weak));
        assert!(argon2_manager().needs_rehash(&weak));

        let argon = argon2_manager().hash("pw").unwrap();
        assert!(!argon2_manager().needs_rehash(&argon));
        assert!(bcrypt_manager(4).needs_rehash(&argon));

        assert!(!bcrypt_manager(4).needs_rehash(""));
    }

    #[tokio::test]
    async fn blocking_helpers_round_trip() {
        let manager = bcrypt_manager(4);
        let hash = manager.hash_blocking("async-pw").await.unwrap();
        assert!(manager.verify_blocking("async-pw", &hash).await.unwrap());
        assert!(!manager.verify_blocking("nope", &hash).await.unwrap());
    }
}
