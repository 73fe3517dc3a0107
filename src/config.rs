//! Process configuration: command-line flags, each backed by an environment variable.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::contact::{ContactDefaults, DEFAULT_EMAIL_FROM};
use crate::manager::DatabaseConfig;
use crate::uploads::{AssetKind, DEFAULT_MAX_UPLOAD_BYTES, UploadPolicy};

pub const DEFAULT_SQLITE_PATH: &str = "./school.db";
pub const DEFAULT_POOL_SIZE: u32 = 8;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_ENV_FILE: &str = "variables.env";

#[derive(Debug, Clone, Parser)]
#[command(name = "sitekeeper", version, about = "School website content backend")]
pub struct AppConfig {
    /// PostgreSQL connection string; without it only the embedded database is used
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Embedded database file, used when PostgreSQL is absent or unreachable
    #[arg(long, env = "SQLITE_PATH", default_value = DEFAULT_SQLITE_PATH)]
    pub sqlite_path: PathBuf,

    #[arg(long, env = "PG_POOL_SIZE", default_value_t = DEFAULT_POOL_SIZE)]
    pub pg_pool_size: u32,

    /// Seconds to wait for the first PostgreSQL connection
    #[arg(long, env = "PG_CONNECT_TIMEOUT_SECS", default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    pub pg_connect_timeout: u64,

    #[arg(long, env = "ADMIN_USERNAME", default_value = "admin")]
    pub admin_username: String,

    #[arg(
        long,
        env = "ADMIN_PASSWORD_PLAIN",
        default_value = "password123",
        hide_env_values = true
    )]
    pub admin_password: String,

    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Blob store token; without it uploads go to `--uploads-dir`
    #[arg(long, env = "BLOB_READ_WRITE_TOKEN", hide_env_values = true)]
    pub blob_token: Option<String>,

    #[arg(long, env = "UPLOADS_DIR", default_value = "public/uploads")]
    pub uploads_dir: PathBuf,

    #[arg(long, env = "UPLOADS_PREFIX", default_value = "/uploads")]
    pub uploads_prefix: String,

    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    #[arg(long, env = "CONTACT_FORM_ACTION_DEFAULT", default_value = "whatsapp")]
    pub contact_action: String,

    #[arg(long, env = "SCHOOL_CONTACT_EMAIL_TO")]
    pub contact_email_to: Option<String>,

    #[arg(long, env = "SCHOOL_WHATSAPP_NUMBER")]
    pub whatsapp_number: Option<String>,

    #[arg(long, env = "EMAIL_FROM_ADDRESS", default_value = DEFAULT_EMAIL_FROM)]
    pub email_from: String,

    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,

    /// Extra environment file loaded before `.env`
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Connect, sync the schema and report the active backend
    Status,
    #[command(subcommand)]
    Settings(SettingsCommand),
    #[command(subcommand)]
    Carousel(CarouselCommand),
    #[command(subcommand)]
    Users(UsersCommand),
    /// Exchange credentials for a bearer token
    Login { username: String, password: String },
    /// Show the claims carried by a token
    Whoami { token: String },
    /// Upload a site asset and save its URL in settings
    Upload {
        #[arg(value_enum)]
        kind: AssetKind,
        file: PathBuf,
    },
    /// Print the public view of the site
    Site,
    /// Route a contact form submission given as a JSON file
    Contact { file: PathBuf },
}

#[derive(Debug, Clone, Subcommand)]
pub enum SettingsCommand {
    Show {
        /// Overlay stored values on the application defaults
        #[arg(long)]
        merged: bool,
    },
    Set { key: String, value: String },
    /// Replace every key present in a JSON object file
    Import { file: PathBuf },
}

#[derive(Debug, Clone, Subcommand)]
pub enum CarouselCommand {
    List,
    Add(CarouselAddArgs),
    Delete { id: i64 },
}

#[derive(Debug, Clone, Args)]
pub struct CarouselAddArgs {
    pub file: PathBuf,
    #[arg(long)]
    pub alt: Option<String>,
    #[arg(long)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum UsersCommand {
    List,
    Add { username: String, password: String },
    Delete { id: i64 },
}

impl AppConfig {
    #[must_use]
    pub fn database(&self) -> DatabaseConfig {
        let config = DatabaseConfig::embedded(self.sqlite_path.clone())
            .with_connect_timeout(Duration::from_secs(self.pg_connect_timeout));
        let config = DatabaseConfig {
            pool_size: self.pg_pool_size,
            ..config
        };
        match self.database_url.as_deref().filter(|url| !url.trim().is_empty()) {
            Some(url) => config.with_database_url(url),
            None => config,
        }
    }

    #[must_use]
    pub fn contact_defaults(&self) -> ContactDefaults {
        ContactDefaults {
            action: self.contact_action.clone(),
            email_to: self.contact_email_to.clone(),
            whatsapp_number: self.whatsapp_number.clone(),
            email_from: self.email_from.clone(),
        }
    }

    #[must_use]
    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_bytes: self.max_upload_bytes,
        }
    }
}

/// `--env-file` has to be known before clap reads the environment, so it is picked out
/// of the raw arguments first.
pub fn env_file_arg<I>(args: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--env-file" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.to_str().and_then(|a| a.strip_prefix("--env-file=")) {
            return Some(PathBuf::from(path));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() -> Result<(), clap::Error> {
        let config = AppConfig::try_parse_from(["sitekeeper", "--sqlite-path", "x.db", "status"])?;
        assert_eq!(config.pg_pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(config.uploads_prefix, "/uploads");
        assert!(matches!(config.command, Command::Status));

        let db = config.database();
        assert_eq!(db.sqlite_path, PathBuf::from("x.db"));
        assert_eq!(db.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(db.connect_timeout, Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS));
        Ok(())
    }

    #[test]
    fn nested_commands_parse() -> Result<(), clap::Error> {
        let config = AppConfig::try_parse_from([
            "sitekeeper",
            "carousel",
            "add",
            "slide.png",
            "--alt",
            "Campus",
        ])?;
        match config.command {
            Command::Carousel(CarouselCommand::Add(args)) => {
                assert_eq!(args.alt.as_deref(), Some("Campus"));
                assert_eq!(args.link, None);
            }
            other => panic!("unexpected command {other:?}"),
        }

        let config = AppConfig::try_parse_from(["sitekeeper", "upload", "about-image", "a.png"])?;
        assert!(matches!(
            config.command,
            Command::Upload {
                kind: AssetKind::AboutImage,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn env_file_is_found_in_either_form() {
        let args = |list: &[&str]| list.iter().map(OsString::from).collect::<Vec<_>>();
        assert_eq!(
            env_file_arg(args(&["sitekeeper", "--env-file", "prod.env", "status"])),
            Some(PathBuf::from("prod.env"))
        );
        assert_eq!(
            env_file_arg(args(&["sitekeeper", "--env-file=dev.env"])),
            Some(PathBuf::from("dev.env"))
        );
        assert_eq!(env_file_arg(args(&["sitekeeper", "status"])), None);
    }
}
