//! Key/value site settings.
//!
//! Values are stored as text. A fixed allow-list of keys holds JSON-encoded objects or
//! lists; those are decoded on read and fall back to an empty structure when the stored text
//! is blank or unreadable.

use std::collections::BTreeMap;

use futures_util::future::join_all;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::db::Database;
use crate::error::SiteError;
use crate::results::DbRow;
use crate::types::RowValues;

/// Settings keyed by name. Ordered so output is stable.
pub type SettingsMap = BTreeMap<String, Value>;

/// Shape a structured key decodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredShape {
    Object,
    List,
}

impl StructuredShape {
    /// Value used when the stored text cannot be decoded.
    #[must_use]
    pub fn empty(self) -> Value {
        match self {
            StructuredShape::Object => Value::Object(Map::new()),
            StructuredShape::List => Value::Array(Vec::new()),
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            StructuredShape::Object => value.is_object(),
            StructuredShape::List => value.is_array(),
        }
    }
}

pub const STRUCTURED_KEYS: &[(&str, StructuredShape)] = &[
    ("socialLinks", StructuredShape::Object),
    ("facilityCards", StructuredShape::List),
    ("heroGradient", StructuredShape::Object),
    ("aboutGradient", StructuredShape::Object),
    ("admissionsGradient", StructuredShape::Object),
    ("academicsGradient", StructuredShape::Object),
    ("facilitiesGradient", StructuredShape::Object),
    ("contactGradient", StructuredShape::Object),
];

#[must_use]
pub fn structured_shape(name: &str) -> Option<StructuredShape> {
    STRUCTURED_KEYS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, shape)| *shape)
}

/// Decode one stored value. Never fails: structured keys fall back to `{}` / `[]`.
#[must_use]
pub fn decode_setting(name: &str, raw: Option<String>) -> Value {
    let Some(shape) = structured_shape(name) else {
        return raw.map_or(Value::Null, Value::String);
    };

    let Some(text) = raw.filter(|text| !text.trim().is_empty()) else {
        return shape.empty();
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(value) if shape.matches(&value) => value,
        Ok(value) => {
            warn!(setting = name, found = %value, "stored setting has the wrong shape, using empty value");
            shape.empty()
        }
        Err(e) => {
            warn!(setting = name, error = %e, "stored setting is not valid JSON, using empty value");
            shape.empty()
        }
    }
}

/// Text form a value is stored as.
///
/// Objects and lists are JSON-encoded, strings are stored as-is, numbers and booleans as
/// their textual form, and null as the empty string.
#[must_use]
pub fn encode_setting(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Object(_) | Value::Array(_) => value.to_string(),
    }
}

/// Settings table access.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    db: Database,
}

impl SettingsStore {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Every stored setting, structured keys decoded. Not merged with defaults.
    ///
    /// # Errors
    /// Returns `SiteError::DataAccess` if the table cannot be read.
    pub async fn read_all(&self) -> Result<SettingsMap, SiteError> {
        let rows = self
            .db
            .fetch_all("SELECT setting_name, setting_value FROM settings", &[])
            .await?;
        collect_settings(rows.iter())
    }

    /// A subset of settings by name; names that are not stored are absent from the map.
    ///
    /// # Errors
    /// Returns `SiteError::DataAccess` if the table cannot be read.
    pub async fn read_scalars(&self, names: &[&str]) -> Result<SettingsMap, SiteError> {
        if names.is_empty() {
            return Ok(SettingsMap::new());
        }
        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            "SELECT setting_name, setting_value FROM settings WHERE setting_name IN ({placeholders})"
        );
        let params: Vec<RowValues> = names.iter().map(|name| RowValues::from(*name)).collect();
        let rows = self.db.fetch_all(&sql, &params).await?;
        collect_settings(rows.iter())
    }

    /// Replace every key in `settings` by deleting and re-inserting it.
    ///
    /// Keys run concurrently and independently; every key is attempted even when another
    /// fails. Keys that succeeded stay replaced.
    ///
    /// # Errors
    /// Returns the first `SiteError::Setting` in key order when any key failed.
    pub async fn replace_all(&self, settings: &SettingsMap) -> Result<(), SiteError> {
        let operations = settings
            .iter()
            .map(|(name, value)| self.replace_text(name, encode_setting(value)));
        let results = join_all(operations).await;

        let mut failures = results.into_iter().filter_map(Result::err);
        match failures.next() {
            None => {
                debug!(count = settings.len(), "settings saved");
                Ok(())
            }
            Some(first) => {
                let others = failures.count();
                warn!(error = %first, additional_failures = others, "failed to save settings");
                Err(first)
            }
        }
    }

    /// Replace a single key.
    ///
    /// # Errors
    /// Returns `SiteError::Setting` if the delete or insert fails.
    pub async fn replace(&self, name: &str, value: &Value) -> Result<(), SiteError> {
        self.replace_text(name, encode_setting(value)).await
    }

    async fn replace_text(&self, name: &str, text: String) -> Result<(), SiteError> {
        let wrap = |source| SiteError::Setting {
            name: name.to_owned(),
            source,
        };
        self.db
            .execute(
                "DELETE FROM settings WHERE setting_name = ?",
                &[RowValues::from(name)],
            )
            .await
            .map_err(wrap)?;
        self.db
            .execute(
                "INSERT INTO settings (setting_name, setting_value) VALUES (?, ?)",
                &[RowValues::from(name), RowValues::Text(text)],
            )
            .await
            .map_err(wrap)?;
        Ok(())
    }
}

fn collect_settings<'a>(
    rows: impl Iterator<Item = &'a DbRow>,
) -> Result<SettingsMap, SiteError> {
    let mut settings = SettingsMap::new();
    for row in rows {
        let name = row.text("setting_name")?;
        let raw = row.opt_text("setting_value")?;
        let value = decode_setting(&name, raw);
        settings.insert(name, value);
    }
    Ok(settings)
}
