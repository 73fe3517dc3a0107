use std::sync::Arc;

use sitekeeper::auth::TOKEN_TTL;
use sitekeeper::prelude::*;
use tempfile::tempdir;

const SECRET: &str = "integration-secret";

#[tokio::test]
async fn login_then_authorize() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let manager = ConnectionManager::embedded(dir.path().join("school.db")).await?;
    let accounts = AccountStore::new(manager.database(), Arc::new(BcryptHasher::with_cost(4)));
    let admin = accounts.add("admin", "pw").await?;
    let auth = AuthService::new(accounts, Arc::new(JwtTokenService::new(SECRET)?));

    let response = auth
        .login(&LoginRequest {
            username: "admin".into(),
            password: "pw".into(),
        })
        .await?;
    let claims = auth.authorize(Some(&format!("Bearer {}", response.token)))?;
    assert_eq!(claims.id, admin.id);
    assert_eq!(claims.username, "admin");
    assert_eq!(claims.exp - claims.iat, TOKEN_TTL.as_secs());

    let wrong = auth
        .login(&LoginRequest {
            username: "admin".into(),
            password: "nope".into(),
        })
        .await;
    assert!(matches!(wrong, Err(SiteError::Unauthorized(_))));

    let blank = auth
        .login(&LoginRequest {
            username: String::new(),
            password: "pw".into(),
        })
        .await;
    assert!(matches!(blank, Err(SiteError::BadRequest(_))));

    manager.close().await?;
    Ok(())
}

#[tokio::test]
async fn bad_tokens_are_refused() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let manager = ConnectionManager::embedded(dir.path().join("school.db")).await?;
    let accounts = AccountStore::new(manager.database(), Arc::new(BcryptHasher::with_cost(4)));
    let tokens = Arc::new(JwtTokenService::new(SECRET)?);
    let auth = AuthService::new(accounts, tokens.clone());

    assert!(matches!(auth.authorize(None), Err(SiteError::Unauthorized(_))));
    assert!(matches!(auth.authorize(Some("Bearer")), Err(SiteError::Unauthorized(_))));
    assert!(matches!(
        auth.authorize(Some("Bearer not-a-token")),
        Err(SiteError::Forbidden(_))
    ));

    let expired = tokens.sign(&Claims {
        id: 1,
        username: "admin".into(),
        iat: 1_000,
        exp: 2_000,
    })?;
    assert!(matches!(
        auth.authorize(Some(&format!("Bearer {expired}"))),
        Err(SiteError::Forbidden(_))
    ));

    let foreign = JwtTokenService::new("someone-else")?.sign(&Claims::issue(
        1,
        "admin",
        std::time::Duration::from_secs(60),
    ))?;
    assert!(matches!(
        auth.authorize(Some(&format!("Bearer {foreign}"))),
        Err(SiteError::Forbidden(_))
    ));

    manager.close().await?;
    Ok(())
}
