use std::path::Path;
use std::sync::Arc;

use serde_json::{Value, json};
use sitekeeper::accounts::AccountStore;
use sitekeeper::auth::{AuthService, BcryptHasher, JwtTokenService, LoginRequest, TokenService};
use sitekeeper::carousel::{CarouselCreated, CarouselLedger, NewCarouselImage};
use sitekeeper::config::{AppConfig, CarouselCommand, Command, SettingsCommand, UsersCommand};
use sitekeeper::contact::{ContactRouter, ContactSubmission};
use sitekeeper::settings::{SettingsMap, SettingsStore, structured_shape};
use sitekeeper::site::{load_public_site, merge_settings};
use sitekeeper::storage::{
    LocalDirStore, ObjectStore, UploadedFile, VercelBlobStore, content_type_for,
};
use sitekeeper::uploads::AssetUploader;
use sitekeeper::{ConnectionManager, SiteError};
use tracing::info;

fn object_store(config: &AppConfig) -> Result<Arc<dyn ObjectStore>, SiteError> {
    match config.blob_token.as_deref().filter(|token| !token.is_empty()) {
        Some(token) => Ok(Arc::new(VercelBlobStore::new(token)?)),
        None => {
            info!(dir = %config.uploads_dir.display(), "no blob token, storing uploads locally");
            Ok(Arc::new(LocalDirStore::new(
                config.uploads_dir.clone(),
                config.uploads_prefix.clone(),
            )))
        }
    }
}

fn token_service(config: &AppConfig) -> Result<Arc<dyn TokenService>, SiteError> {
    let secret = config
        .jwt_secret
        .as_deref()
        .ok_or_else(|| SiteError::Config("JWT_SECRET is not set.".to_string()))?;
    Ok(Arc::new(JwtTokenService::new(secret)?))
}

async fn read_file(path: &Path) -> Result<Vec<u8>, SiteError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| SiteError::BadRequest(format!("cannot read {}: {e}", path.display())))
}

async fn read_upload(path: &Path) -> Result<UploadedFile, SiteError> {
    let bytes = read_file(path).await?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_string();
    let content_type = content_type_for(&file_name);
    Ok(UploadedFile::new(file_name, content_type, bytes))
}

/// Structured keys take JSON; everything else is stored as the literal text.
fn setting_value(key: &str, raw: &str) -> Result<Value, SiteError> {
    if structured_shape(key).is_some() {
        Ok(serde_json::from_str(raw)?)
    } else {
        Ok(Value::String(raw.to_string()))
    }
}

pub async fn run(config: &AppConfig, manager: &ConnectionManager) -> Result<Value, SiteError> {
    let db = manager.database();
    let accounts = AccountStore::new(db.clone(), Arc::new(BcryptHasher::default()));
    accounts
        .ensure_seed_admin(&config.admin_username, &config.admin_password)
        .await?;
    let settings = SettingsStore::new(db.clone());

    match &config.command {
        Command::Status => Ok(json!({ "backend": manager.mode() })),

        Command::Settings(SettingsCommand::Show { merged }) => {
            let stored = settings.read_all().await?;
            let shown = if *merged { merge_settings(&stored) } else { stored };
            Ok(serde_json::to_value(shown)?)
        }
        Command::Settings(SettingsCommand::Set { key, value }) => {
            let value = setting_value(key, value)?;
            settings.replace(key, &value).await?;
            let mut saved = serde_json::Map::new();
            saved.insert(key.clone(), value);
            Ok(Value::Object(saved))
        }
        Command::Settings(SettingsCommand::Import { file }) => {
            let map: SettingsMap = serde_json::from_slice(&read_file(file).await?)?;
            settings.replace_all(&map).await?;
            Ok(json!({ "saved": map.len() }))
        }

        Command::Carousel(command) => {
            let ledger = CarouselLedger::new(db, object_store(config)?, config.upload_policy());
            match command {
                CarouselCommand::List => Ok(serde_json::to_value(ledger.list().await?)?),
                CarouselCommand::Add(args) => {
                    let image = ledger
                        .create(NewCarouselImage {
                            file: read_upload(&args.file).await?,
                            alt_text: args.alt.clone(),
                            link_url: args.link.clone(),
                        })
                        .await?;
                    Ok(serde_json::to_value(CarouselCreated::from(&image))?)
                }
                CarouselCommand::Delete { id } => {
                    ledger.delete(*id).await?;
                    Ok(json!({ "deleted": id }))
                }
            }
        }

        Command::Users(UsersCommand::List) => Ok(serde_json::to_value(accounts.list().await?)?),
        Command::Users(UsersCommand::Add { username, password }) => {
            Ok(serde_json::to_value(accounts.add(username, password).await?)?)
        }
        Command::Users(UsersCommand::Delete { id }) => {
            accounts.remove(*id).await?;
            Ok(json!({ "deleted": id }))
        }

        Command::Login { username, password } => {
            let auth = AuthService::new(accounts, token_service(config)?);
            let response = auth
                .login(&LoginRequest {
                    username: username.clone(),
                    password: password.clone(),
                })
                .await?;
            Ok(serde_json::to_value(response)?)
        }
        Command::Whoami { token } => {
            let auth = AuthService::new(accounts, token_service(config)?);
            let claims = auth.authorize(Some(&format!("Bearer {token}")))?;
            Ok(serde_json::to_value(claims)?)
        }

        Command::Upload { kind, file } => {
            let uploader = AssetUploader::new(object_store(config)?, config.upload_policy());
            let asset = uploader.upload_asset(*kind, &read_upload(file).await?).await?;
            settings
                .replace(kind.setting_key(), &Value::String(asset.url.clone()))
                .await?;
            Ok(serde_json::to_value(asset)?)
        }

        Command::Site => {
            let ledger = CarouselLedger::new(db, object_store(config)?, config.upload_policy());
            Ok(serde_json::to_value(load_public_site(&settings, &ledger).await?)?)
        }

        Command::Contact { file } => {
            let submission: ContactSubmission = serde_json::from_slice(&read_file(file).await?)?;
            let router = ContactRouter::new(settings, config.contact_defaults());
            Ok(serde_json::to_value(router.route(&submission).await?)?)
        }
    }
}
