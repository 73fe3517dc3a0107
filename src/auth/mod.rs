//! Login, bearer-token authorization and the credential collaborators behind them.

mod password;
mod token;

pub use password::{BcryptHasher, DEFAULT_COST, PasswordHasher};
pub use token::{Claims, JwtTokenService, TOKEN_TTL, TokenService};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::accounts::{AccountStore, Verification};
use crate::error::SiteError;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Stateless sessions: a successful login yields a signed token, and every protected
/// call presents it back.
#[derive(Clone)]
pub struct AuthService {
    accounts: AccountStore,
    tokens: Arc<dyn TokenService>,
}

impl AuthService {
    #[must_use]
    pub fn new(accounts: AccountStore, tokens: Arc<dyn TokenService>) -> Self {
        Self { accounts, tokens }
    }

    /// # Errors
    /// `SiteError::BadRequest` for blank credentials, `SiteError::Unauthorized` when they
    /// do not match an account.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, SiteError> {
        if request.username.is_empty() || request.password.is_empty() {
            return Err(SiteError::BadRequest(
                "Username and password are required.".to_string(),
            ));
        }
        match self
            .accounts
            .verify(&request.username, &request.password)
            .await?
        {
            Verification::Matched(account) => {
                let claims = Claims::issue(account.id, account.username, TOKEN_TTL);
                let token = self.tokens.sign(&claims)?;
                info!(username = %request.username, "login successful");
                Ok(LoginResponse { token })
            }
            Verification::Rejected => Err(SiteError::Unauthorized(
                "Invalid username or password.".to_string(),
            )),
        }
    }

    /// Check an `Authorization: Bearer <token>` header value.
    ///
    /// # Errors
    /// `SiteError::Unauthorized` when no token is presented, `SiteError::Forbidden` when it
    /// is invalid or expired.
    pub fn authorize(&self, header: Option<&str>) -> Result<Claims, SiteError> {
        let token = header
            .and_then(|value| value.split(' ').nth(1))
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                SiteError::Unauthorized("Access denied. No token provided.".to_string())
            })?;
        self.tokens.verify(token).map_err(|e| {
            warn!(error = %e, "invalid token received");
            SiteError::Forbidden("Access denied. Invalid or expired token.".to_string())
        })
    }
}
