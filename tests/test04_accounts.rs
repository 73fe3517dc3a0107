use std::sync::Arc;

use sitekeeper::prelude::*;
use tempfile::tempdir;

fn accounts(manager: &ConnectionManager) -> AccountStore {
    AccountStore::new(manager.database(), Arc::new(BcryptHasher::with_cost(4)))
}

#[test]
fn added_account_verifies_only_with_its_password() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let manager = ConnectionManager::embedded(dir.path().join("school.db")).await?;
        let store = accounts(&manager);

        let admin = store.add("admin", "pw").await?;
        assert_eq!(admin.username, "admin");

        assert_eq!(store.verify("admin", "pw").await?, Verification::Matched(admin.clone()));
        assert_eq!(store.verify("admin", "wrong").await?, Verification::Rejected);
        assert_eq!(store.verify("ghost", "pw").await?, Verification::Rejected);

        // the digest is stored, never the plain password
        let row = manager
            .database()
            .fetch_one("SELECT password FROM users WHERE id = ?", &[RowValues::Int(admin.id)])
            .await?;
        let digest = row.map(|r| r.text("password")).transpose()?.unwrap_or_default();
        assert!(digest.starts_with("$2"));

        let dup = store.add("admin", "other").await;
        assert!(matches!(dup, Err(SiteError::Conflict(_))));
        let blank = store.add(" ", "pw").await;
        assert!(matches!(blank, Err(SiteError::BadRequest(_))));

        manager.close().await?;
        Ok::<(), SiteError>(())
    })?;
    Ok(())
}

#[test]
fn last_account_cannot_be_removed() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let manager = ConnectionManager::embedded(dir.path().join("school.db")).await?;
        let store = accounts(&manager);

        // COUNT(*) on an empty table is 0, not a missing row
        assert!(matches!(store.remove(1).await, Err(SiteError::Forbidden(_))));

        let admin = store.add("admin", "pw").await?;
        let res = store.remove(admin.id).await;
        assert!(matches!(res, Err(SiteError::Forbidden(_))));
        assert_eq!(store.list().await?, vec![admin.clone()]);

        let editor = store.add("editor", "pw2").await?;
        let res = store.remove(9_999).await;
        assert!(matches!(res, Err(SiteError::NotFound(_))));

        store.remove(admin.id).await?;
        assert_eq!(store.list().await?, vec![editor.clone()]);
        let res = store.remove(editor.id).await;
        assert!(matches!(res, Err(SiteError::Forbidden(_))));

        manager.close().await?;
        Ok::<(), SiteError>(())
    })?;
    Ok(())
}

#[test]
fn seeding_runs_once() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let manager = ConnectionManager::embedded(dir.path().join("school.db")).await?;
        let store = accounts(&manager);

        let first = store.ensure_seed_admin("admin", "password123").await?;
        assert!(matches!(first, SeedOutcome::Created(_)));
        let second = store.ensure_seed_admin("admin", "changed").await?;
        assert_eq!(second, SeedOutcome::AlreadyPresent);

        assert!(matches!(
            store.verify("admin", "password123").await?,
            Verification::Matched(_)
        ));
        assert_eq!(store.list().await?.len(), 1);

        manager.close().await?;
        Ok::<(), SiteError>(())
    })?;
    Ok(())
}
