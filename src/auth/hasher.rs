//! One-way salted hashing as an injected capability. The algorithm is an
//! external concern to the session core; Argon2id is the wiring default.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use async_trait::async_trait;
use rand::rngs::OsRng;

#[async_trait]
pub trait Hasher: Send + Sync {
    async fn hash(&self, secret: &str) -> Result<String>;
    async fn compare(&self, secret: &str, hash: &str) -> Result<bool>;
}

/// Argon2id with per-secret random salt and default parameters.
#[derive(Clone, Copy, Debug, Default)]
pub struct Argon2Hasher;

#[async_trait]
impl Hasher for Argon2Hasher {
    async fn hash(&self, secret: &str) -> Result<String> {
        let secret = secret.to_string();
        // Argon2 is deliberately slow; keep it off the async workers.
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(secret.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|_| anyhow!("failed to hash secret"))
        })
        .await
        .map_err(|_| anyhow!("hashing task failed"))?
    }

    async fn compare(&self, secret: &str, hash: &str) -> Result<bool> {
        let secret = secret.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || {
            let parsed =
                PasswordHash::new(&hash).map_err(|_| anyhow!("invalid stored secret hash"))?;
            Ok(Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .map_err(|_| anyhow!("hash comparison task failed"))?
    }
}

#[cfg(test)]
mod tests {
    use super::{Argon2Hasher, Hasher};

    #[tokio::test]
    async fn hash_and_compare_round_trip() {
        let hasher = Argon2Hasher;
        let hash = hasher.hash("483920").await.expect("hash pin");
        assert!(hash.starts_with("$argon2"));
        assert!(hasher.compare("483920", &hash).await.expect("compare"));
        assert!(!hasher.compare("000000", &hash).await.expect("compare"));
    }

    #[tokio::test]
    async fn compare_rejects_malformed_hash() {
        let hasher = Argon2Hasher;
        assert!(hasher.compare("secret", "not-a-phc-string").await.is_err());
    }
}
