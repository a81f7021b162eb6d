//! Pipeline configuration.
//!
//! Settings live in a JSON file (by default `<config dir>/plata/config.json`)
//! and can be overridden from the command line. Secrets are held in
//! [`SecretString`], so they are redacted from `Debug` output and logs.

use crate::error::{EtlError, Result, ResultExt as _};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DbSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(deserialize_with = "deserialize_secret")]
    pub password: SecretString,
    pub database: String,
}

impl Default for DbSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 5432,
            user: "postgres".to_owned(),
            password: SecretString::from(String::new()),
            database: "postgres".to_owned(),
        }
    }
}

impl DbSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user,
            self.password.expose_secret(),
            self.host,
            self.port,
            self.database
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub errors_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Salt for the anonymization hash. Required.
    #[serde(deserialize_with = "deserialize_optional_secret")]
    pub salt: Option<SecretString>,
    /// When false the run uses a run-scoped in-memory store.
    pub enable_db: bool,
    /// Full connection URL; takes precedence over `database`.
    #[serde(deserialize_with = "deserialize_optional_secret")]
    pub database_url: Option<SecretString>,
    pub database: DbSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            errors_dir: PathBuf::from("errors"),
            log_dir: PathBuf::from("logs"),
            salt: None,
            enable_db: true,
            database_url: None,
            database: DbSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("plata").join("config.json"))
    }

    /// Loads the config at `path`, or the default location when `path` is
    /// `None`. A missing file at the default location yields defaults; a
    /// missing explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(EtlError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// The salt, or a configuration error if none was provided.
    pub fn require_salt(&self) -> Result<SecretString> {
        match &self.salt {
            Some(salt) if !salt.expose_secret().is_empty() => Ok(salt.clone()),
            _ => Err(EtlError::Config(
                "No anonymization salt configured (set PLATA_SALT or \"salt\" in the config file)"
                    .to_owned(),
            )),
        }
    }

    /// Connection URL for the store: `database_url` if set, else built from
    /// `database`.
    pub fn connection_string(&self) -> String {
        self.database_url.as_ref().map_or_else(
            || self.database.connection_string(),
            |url| url.expose_secret().to_owned(),
        )
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn deserialize_optional_secret<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}
