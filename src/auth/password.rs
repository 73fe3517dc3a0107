use async_trait::async_trait;
use tokio::task::spawn_blocking;

use crate::error::SiteError;

/// Cost factor for new digests.
pub const DEFAULT_COST: u32 = 10;

/// One-way password hashing.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, plain: &str) -> Result<String, SiteError>;

    /// True when `plain` produces `digest`.
    async fn verify(&self, plain: &str, digest: &str) -> Result<bool, SiteError>;
}

/// bcrypt on the blocking pool. Reads any `$2a$`/`$2b$`/`$2y$` digest.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl BcryptHasher {
    /// Lower costs make tests fast; bcrypt's floor is 4.
    #[must_use]
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }
}

#[async_trait]
impl PasswordHasher for BcryptHasher {
    async fn hash(&self, plain: &str) -> Result<String, SiteError> {
        let plain = plain.to_owned();
        let cost = self.cost;
        spawn_blocking(move || bcrypt::hash(plain, cost))
            .await
            .map_err(|e| SiteError::Hash(format!("hashing task failed: {e}")))?
            .map_err(|e| SiteError::Hash(e.to_string()))
    }

    async fn verify(&self, plain: &str, digest: &str) -> Result<bool, SiteError> {
        let plain = plain.to_owned();
        let digest = digest.to_owned();
        spawn_blocking(move || bcrypt::verify(plain, &digest))
            .await
            .map_err(|e| SiteError::Hash(format!("verification task failed: {e}")))?
            .map_err(|e| SiteError::Hash(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() -> Result<(), SiteError> {
        let hasher = BcryptHasher::with_cost(4);
        let digest = hasher.hash("pw").await?;
        assert!(digest.starts_with("$2"));
        assert!(hasher.verify("pw", &digest).await?);
        assert!(!hasher.verify("wrong", &digest).await?);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_digest_is_an_error() {
        let hasher = BcryptHasher::with_cost(4);
        assert!(matches!(
            hasher.verify("pw", "not-a-digest").await,
            Err(SiteError::Hash(_))
        ));
    }
}
