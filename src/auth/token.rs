use std::time::Duration;

use chrono::Utc;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::SiteError;

/// Lifetime of an issued token.
pub const TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Identity carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    /// Claims issued now, expiring after `ttl`.
    #[must_use]
    pub fn issue(id: i64, username: impl Into<String>, ttl: Duration) -> Self {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        Self {
            id,
            username: username.into(),
            iat: now,
            exp: now.saturating_add(ttl.as_secs()),
        }
    }
}

/// Signs and checks session tokens.
pub trait TokenService: Send + Sync {
    /// # Errors
    /// Returns `SiteError::Token` when signing fails.
    fn sign(&self, claims: &Claims) -> Result<String, SiteError>;

    /// # Errors
    /// Returns `SiteError::Token` for a malformed, tampered or expired token.
    fn verify(&self, token: &str) -> Result<Claims, SiteError>;
}

/// HS256 JWTs with a shared secret.
pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenService").finish_non_exhaustive()
    }
}

impl JwtTokenService {
    /// # Errors
    /// Returns `SiteError::Config` for an empty secret.
    pub fn new(secret: &str) -> Result<Self, SiteError> {
        if secret.is_empty() {
            return Err(SiteError::Config("JWT secret must not be empty".to_string()));
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }
}

impl TokenService for JwtTokenService {
    fn sign(&self, claims: &Claims) -> Result<String, SiteError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| SiteError::Token(format!("failed to sign token: {e}")))
    }

    fn verify(&self, token: &str) -> Result<Claims, SiteError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| SiteError::Token(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_tokens_verify_with_the_same_secret() -> Result<(), SiteError> {
        let service = JwtTokenService::new("s3cret")?;
        let claims = Claims::issue(3, "admin", TOKEN_TTL);
        let token = service.sign(&claims)?;
        assert_eq!(service.verify(&token)?, claims);

        let other = JwtTokenService::new("different")?;
        assert!(matches!(other.verify(&token), Err(SiteError::Token(_))));
        Ok(())
    }

    #[test]
    fn expired_tokens_are_rejected() -> Result<(), SiteError> {
        let service = JwtTokenService::new("s3cret")?;
        let mut claims = Claims::issue(1, "admin", TOKEN_TTL);
        claims.iat -= 3 * 24 * 60 * 60;
        claims.exp = claims.iat + 60;
        let token = service.sign(&claims)?;
        assert!(matches!(service.verify(&token), Err(SiteError::Token(_))));
        Ok(())
    }

    #[test]
    fn issued_claims_span_the_ttl_from_now() {
        let before = Utc::now().timestamp();
        let claims = Claims::issue(7, "editor", TOKEN_TTL);
        let after = Utc::now().timestamp();
        let iat = i64::try_from(claims.iat).unwrap_or(i64::MAX);
        assert!((before..=after).contains(&iat));
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
        assert_eq!(claims.username, "editor");
    }

    #[test]
    fn empty_secret_is_a_config_error() {
        assert!(matches!(JwtTokenService::new(""), Err(SiteError::Config(_))));
    }
}
