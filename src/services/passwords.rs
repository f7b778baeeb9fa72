//! PBKDF2-HMAC-SHA256 password hashing.
//!
//! Hashes are encoded as `pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>`
//! so the iteration count can be raised without invalidating stored hashes.
//! Derivation is CPU-bound and runs on the blocking pool.

use std::num::NonZeroU32;

use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("stored password hash is malformed")]
    Malformed,
    #[error("system random source failed")]
    Random,
    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    iterations: NonZeroU32,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN),
        }
    }

    pub async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let iterations = self.iterations;
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hash_with(iterations, &password)).await?
    }

    /// `Ok(false)` for a wrong password; `Err` only when `encoded` is not a
    /// hash this module produced.
    pub async fn verify(&self, password: &str, encoded: &str) -> Result<bool, PasswordError> {
        let password = password.to_owned();
        let encoded = encoded.to_owned();
        tokio::task::spawn_blocking(move || verify_encoded(&password, &encoded)).await?
    }
}

fn hash_with(iterations: NonZeroU32, password: &str) -> Result<String, PasswordError> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| PasswordError::Random)?;
    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(ALGORITHM, iterations, &salt, password.as_bytes(), &mut hash);
    Ok(format!(
        "{SCHEME}${iterations}${}${}",
        hex::encode(salt),
        hex::encode(hash)
    ))
}

fn verify_encoded(password: &str, encoded: &str) -> Result<bool, PasswordError> {
    let mut parts = encoded.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(PasswordError::Malformed);
    };
    if scheme != SCHEME {
        return Err(PasswordError::Malformed);
    }
    let iterations = iterations
        .parse::<u32>()
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or(PasswordError::Malformed)?;
    let salt = hex::decode(salt).map_err(|_| PasswordError::Malformed)?;
    let hash = hex::decode(hash).map_err(|_| PasswordError::Malformed)?;

    Ok(pbkdf2::verify(ALGORITHM, iterations, &salt, password.as_bytes(), &hash).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = PasswordHasher::new(1_000);
        let encoded = hasher.hash("correct horse").await.unwrap();
        assert!(encoded.starts_with("pbkdf2-sha256$1000$"));
        assert!(hasher.verify("correct horse", &encoded).await.unwrap());
        assert!(!hasher.verify("wrong horse", &encoded).await.unwrap());
    }

    #[tokio::test]
    async fn test_salts_differ() {
        let hasher = PasswordHasher::new(1_000);
        let a = hasher.hash("same").await.unwrap();
        let b = hasher.hash("same").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_verify_uses_stored_iterations() {
        let old = PasswordHasher::new(500).hash("pw123456").await.unwrap();
        let current = PasswordHasher::new(2_000);
        assert!(current.verify("pw123456", &old).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash() {
        let hasher = PasswordHasher::new(1_000);
        for bad in ["", "plain", "bcrypt$10$aa$bb", "pbkdf2-sha256$0$aa$bb", "pbkdf2-sha256$10$zz$bb"] {
            assert!(
                matches!(hasher.verify("x", bad).await, Err(PasswordError::Malformed)),
                "{bad}"
            );
        }
    }
}
