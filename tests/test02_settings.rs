use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use sitekeeper::pool::BackendPool;
use sitekeeper::prelude::*;
use sitekeeper::schema::sync_schema;
use sitekeeper::sqlite::SqliteConnection;
use tempfile::tempdir;

/// Fails every INSERT that binds `poison`.
struct FlakyBackend {
    inner: BackendPool,
    poison: &'static str,
}

#[async_trait]
impl Backend for FlakyBackend {
    fn dialect(&self) -> &'static dyn Dialect {
        self.inner.dialect()
    }

    async fn execute(&self, sql: &str, params: &[RowValues]) -> Result<ExecOutcome, DataAccessError> {
        let poisoned = params.iter().any(|p| p.as_text() == Some(self.poison));
        if poisoned && sql.trim_start().starts_with("INSERT") {
            return Err(DataAccessError::Worker("injected insert failure".into()));
        }
        self.inner.execute(sql, params).await
    }

    async fn fetch_all(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, DataAccessError> {
        self.inner.fetch_all(sql, params).await
    }

    async fn close(&self) -> Result<(), DataAccessError> {
        self.inner.close().await
    }
}

#[test]
fn structured_and_plain_values_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let manager = ConnectionManager::embedded(dir.path().join("school.db")).await?;
        let store = SettingsStore::new(manager.database());

        let mut settings = SettingsMap::new();
        settings.insert("schoolName".into(), json!("Hillside Academy"));
        settings.insert("socialLinks".into(), json!({ "facebook": "https://fb.example/hs" }));
        settings.insert("heroGradient".into(), json!({ "color1": "#000", "direction": "45deg" }));
        settings.insert("facilityCards".into(), json!([{ "title": "Library", "iconClass": "bi-book", "description": "" }]));
        store.replace_all(&settings).await?;

        let read = store.read_all().await?;
        assert_eq!(read, settings);

        // replacing again leaves one row per key
        store.replace_all(&settings).await?;
        let rows = manager
            .database()
            .fetch_all("SELECT id FROM settings WHERE setting_name = ?", &[RowValues::from("schoolName")])
            .await?;
        assert_eq!(rows.len(), 1);

        manager.close().await?;
        Ok::<(), SiteError>(())
    })?;
    Ok(())
}

#[test]
fn corrupted_structured_values_fall_back_to_empty() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let manager = ConnectionManager::embedded(dir.path().join("school.db")).await?;
        let db = manager.database();
        for (name, raw) in [
            ("socialLinks", "{not json"),
            ("facilityCards", "{\"title\":\"not a list\"}"),
            ("aboutGradient", ""),
        ] {
            db.execute(
                "INSERT INTO settings (setting_name, setting_value) VALUES (?, ?)",
                &[RowValues::from(name), RowValues::from(raw)],
            )
            .await?;
        }
        db.execute(
            "INSERT INTO settings (setting_name, setting_value) VALUES (?, NULL)",
            &[RowValues::from("contactGradient")],
        )
        .await?;

        let read = SettingsStore::new(db).read_all().await?;
        assert_eq!(read["socialLinks"], json!({}));
        assert_eq!(read["facilityCards"], json!([]));
        assert_eq!(read["aboutGradient"], json!({}));
        assert_eq!(read["contactGradient"], json!({}));

        manager.close().await?;
        Ok::<(), SiteError>(())
    })?;
    Ok(())
}

#[test]
fn read_scalars_returns_only_requested_keys() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let manager = ConnectionManager::embedded(dir.path().join("school.db")).await?;
        let store = SettingsStore::new(manager.database());
        store.replace("contactFormAction", &json!("email")).await?;
        store.replace("schoolName", &json!("Hillside")).await?;

        let read = store
            .read_scalars(&["contactFormAction", "adminSchoolWhatsappNumber"])
            .await?;
        assert_eq!(read.len(), 1);
        assert_eq!(read["contactFormAction"], json!("email"));

        manager.close().await?;
        Ok::<(), SiteError>(())
    })?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_replace_all_keeps_one_written_value() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let manager = ConnectionManager::embedded(dir.path().join("school.db")).await?;
    let store = SettingsStore::new(manager.database());
    let keys = ["schoolName", "schoolTagline", "schoolFont", "schoolTheme"];

    let mut handles = Vec::new();
    for writer in ["first", "second", "third"] {
        let store = store.clone();
        let batch: SettingsMap = keys
            .iter()
            .map(|key| ((*key).to_string(), Value::String(writer.to_string())))
            .collect();
        handles.push(tokio::spawn(async move { store.replace_all(&batch).await }));
    }
    for handle in handles {
        // interleaved delete-then-insert may trip the unique constraint; that is allowed
        let _ = handle.await?;
    }

    let read = store.read_all().await?;
    for key in keys {
        let value = read.get(key).and_then(Value::as_str);
        assert!(
            matches!(value, Some("first" | "second" | "third")),
            "{key} ended up as {value:?}"
        );
    }
    manager.close().await?;
    Ok(())
}

#[tokio::test]
async fn failing_key_does_not_stop_the_others() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let inner = BackendPool::Sqlite(SqliteConnection::open(dir.path().join("school.db")).await?);
    let manager = ConnectionManager::with_backend(Arc::new(FlakyBackend {
        inner,
        poison: "schoolTagline",
    }));
    sync_schema(&manager.database()).await?;
    let store = SettingsStore::new(manager.database());

    let mut batch = SettingsMap::new();
    batch.insert("schoolName".into(), json!("Hillside"));
    batch.insert("schoolTagline".into(), json!("Learning together"));
    batch.insert("schoolTheme".into(), json!("dark"));

    let result = store.replace_all(&batch).await;
    match result {
        Err(SiteError::Setting { name, .. }) => assert_eq!(name, "schoolTagline"),
        other => panic!("expected a setting failure, got {other:?}"),
    }

    let read = store.read_all().await?;
    assert_eq!(read.get("schoolName"), Some(&json!("Hillside")));
    assert_eq!(read.get("schoolTheme"), Some(&json!("dark")));
    assert!(!read.contains_key("schoolTagline"));

    manager.close().await?;
    Ok(())
}
