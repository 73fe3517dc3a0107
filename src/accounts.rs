use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::PasswordHasher;
use crate::db::Database;
use crate::error::SiteError;
use crate::results::DbRow;
use crate::types::RowValues;

/// Public projection of an account. Never carries the password digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: i64,
    pub username: String,
}

impl AccountSummary {
    fn from_row(row: &DbRow) -> Result<Self, SiteError> {
        Ok(Self {
            id: row.int("id")?,
            username: row.text("username")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Matched(AccountSummary),
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    Created(AccountSummary),
    AlreadyPresent,
}

/// Operator accounts. The store never drops to zero accounts through [`AccountStore::remove`].
#[derive(Clone)]
pub struct AccountStore {
    db: Database,
    hasher: Arc<dyn PasswordHasher>,
}

impl std::fmt::Debug for AccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountStore").field("db", &self.db).finish_non_exhaustive()
    }
}

impl AccountStore {
    #[must_use]
    pub fn new(db: Database, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { db, hasher }
    }

    /// Check a username/password pair. Unknown users are rejected, not an error.
    ///
    /// # Errors
    /// Returns `SiteError::DataAccess` on query failure or `SiteError::Hash` for a corrupt digest.
    pub async fn verify(&self, username: &str, password: &str) -> Result<Verification, SiteError> {
        let row = self
            .db
            .fetch_one(
                "SELECT id, username, password FROM users WHERE username = ?",
                &[RowValues::from(username)],
            )
            .await?;
        let Some(row) = row else {
            return Ok(Verification::Rejected);
        };
        let digest = row.text("password")?;
        if self.hasher.verify(password, &digest).await? {
            Ok(Verification::Matched(AccountSummary::from_row(&row)?))
        } else {
            Ok(Verification::Rejected)
        }
    }

    async fn find_id(&self, username: &str) -> Result<Option<i64>, SiteError> {
        let row = self
            .db
            .fetch_one(
                "SELECT id FROM users WHERE username = ?",
                &[RowValues::from(username)],
            )
            .await?;
        row.map(|row| row.int("id")).transpose().map_err(SiteError::from)
    }

    /// Create an account with a freshly hashed password.
    ///
    /// # Errors
    /// `SiteError::Conflict` if the username is taken, `SiteError::BadRequest` for blank
    /// input. A concurrent insert of the same name surfaces as `SiteError::DataAccess`.
    pub async fn add(&self, username: &str, password: &str) -> Result<AccountSummary, SiteError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(SiteError::BadRequest(
                "Username and password are required.".to_string(),
            ));
        }
        if self.find_id(username).await?.is_some() {
            return Err(SiteError::Conflict(format!("User '{username}' already exists.")));
        }
        let digest = self.hasher.hash(password).await?;
        let outcome = self
            .db
            .execute(
                "INSERT INTO users (username, password) VALUES (?, ?)",
                &[RowValues::from(username), RowValues::Text(digest)],
            )
            .await?;
        let id = match outcome.inserted_id {
            Some(id) => id,
            None => self.find_id(username).await?.ok_or_else(|| {
                SiteError::NotFound(format!("User '{username}' vanished after insert."))
            })?,
        };
        info!(username, id, "user added");
        Ok(AccountSummary {
            id,
            username: username.to_owned(),
        })
    }

    /// Delete an account unless it is the last one.
    ///
    /// The count is checked before deleting, so the last-account guard holds for
    /// sequential callers only.
    ///
    /// # Errors
    /// `SiteError::Forbidden` when one account (or none) remains, `SiteError::NotFound`
    /// when no account has `id`.
    pub async fn remove(&self, id: i64) -> Result<(), SiteError> {
        let count = self.count().await?;
        if count <= 1 {
            warn!(id, "refusing to delete the last user");
            return Err(SiteError::Forbidden("Cannot delete the last user.".to_string()));
        }
        let outcome = self
            .db
            .execute("DELETE FROM users WHERE id = ?", &[RowValues::Int(id)])
            .await?;
        if outcome.affected == 0 {
            return Err(SiteError::NotFound(format!("User {id} not found.")));
        }
        info!(id, "user deleted");
        Ok(())
    }

    /// All accounts, by id.
    ///
    /// # Errors
    /// Returns `SiteError::DataAccess` on query failure.
    pub async fn list(&self) -> Result<Vec<AccountSummary>, SiteError> {
        let rows = self
            .db
            .fetch_all("SELECT id, username FROM users ORDER BY id ASC", &[])
            .await?;
        rows.iter().map(AccountSummary::from_row).collect()
    }

    async fn count(&self) -> Result<i64, SiteError> {
        let row = self
            .db
            .fetch_one("SELECT COUNT(*) AS n FROM users", &[])
            .await?;
        Ok(row.map(|row| row.int("n")).transpose()?.unwrap_or(0))
    }

    /// First-boot seeding: create `username` only if no account has that name.
    ///
    /// # Errors
    /// Returns query or hashing failures.
    pub async fn ensure_seed_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SeedOutcome, SiteError> {
        if self.find_id(username).await?.is_some() {
            info!(username, "admin user already exists");
            return Ok(SeedOutcome::AlreadyPresent);
        }
        let account = self.add(username, password).await?;
        info!(username, "default admin user created");
        Ok(SeedOutcome::Created(account))
    }
}
