use config::{Config, ConfigError as BaseConfigError, File};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "PASTEBOX_CONFIG";

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct HttpConfig {
    pub bind_addr: String,
    /// Scheme used when building shareable links (`http` or `https`).
    pub scheme: String,
    /// Public host (and optional port) used when building shareable links.
    pub domain_name: String,
}

#[derive(Debug, Deserialize, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordStoreKind {
    Sqlite,
    Memory,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct StorageConfig {
    pub database_url: String,
    pub uploads_dir: PathBuf,
    pub record_store: RecordStoreKind,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct UploadsConfig {
    pub max_file_size_bytes: u64,
    pub require_login: bool,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub lifetime_days: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub storage: StorageConfig,
    pub uploads: UploadsConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Config(#[from] BaseConfigError),
    #[error("Uploads directory error: {0}")]
    UploadsDir(String),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let mut settings = Config::builder();

        settings = settings.add_source(Config::try_from(&AppConfig::default())?);

        settings = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => settings.add_source(File::with_name(&path).required(true)),
            Err(_) => settings.add_source(File::with_name("config").required(false)),
        };

        // Environment variables only override what they name
        settings = settings
            .set_override_option("http.bind_addr", env("HTTP_BIND_ADDR"))?
            .set_override_option("http.scheme", env("HTTP_SCHEME"))?
            .set_override_option("http.domain_name", env("HTTP_DOMAIN_NAME"))?
            .set_override_option("storage.database_url", env("DATABASE_URL"))?
            .set_override_option("storage.uploads_dir", env("UPLOADS_DIR"))?
            .set_override_option("storage.record_store", env("RECORD_STORE"))?
            .set_override_option(
                "uploads.max_file_size_bytes",
                env_parsed::<u64>("MAX_FILE_SIZE_BYTES")?,
            )?
            .set_override_option("uploads.require_login", env_parsed::<bool>("REQUIRE_LOGIN")?)?
            .set_override_option("session.cookie_name", env("SESSION_COOKIE_NAME"))?
            .set_override_option(
                "session.lifetime_days",
                env_parsed::<i64>("SESSION_LIFETIME_DAYS")?,
            )?
            .set_override_option("session.cookie_secure", env_parsed::<bool>("COOKIE_SECURE")?)?
            .set_override_option("logging.format", env("LOG_FORMAT"))?;

        let mut config: AppConfig = settings.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    /// Configuration rooted in a scratch directory, used by tests.
    pub fn for_testing(root: &std::path::Path) -> Self {
        let mut config = Self::default();
        config.http.domain_name = "paste.test".to_string();
        config.storage.database_url = format!(
            "sqlite://{}?mode=rwc",
            root.join("pastebox.db").display()
        );
        config.storage.uploads_dir = root.join("uploads");
        config
    }

    /// Parsed socket address to listen on.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.http.bind_addr.parse().map_err(|e| {
            ConfigError::Validation(format!("Invalid bind address {}: {}", self.http.bind_addr, e))
        })
    }

    /// Absolute shareable link for a path such as `/t/42`.
    pub fn public_link(&self, path: &str) -> String {
        format!("{}://{}{}", self.http.scheme, self.http.domain_name, path)
    }

    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.bind_addr()?;

        if self.http.scheme != "http" && self.http.scheme != "https" {
            return Err(ConfigError::Validation(format!(
                "HTTP scheme must be http or https, got {:?}",
                self.http.scheme
            )));
        }

        if self.http.domain_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Domain name cannot be empty".to_string(),
            ));
        }

        if self.uploads.max_file_size_bytes == 0 {
            return Err(ConfigError::Validation(
                "MAX_FILE_SIZE_BYTES must be greater than zero".to_string(),
            ));
        }

        if self.session.cookie_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Session cookie name cannot be empty".to_string(),
            ));
        }

        if self.session.lifetime_days < 1 {
            return Err(ConfigError::Validation(
                "SESSION_LIFETIME_DAYS must be at least 1".to_string(),
            ));
        }

        if let Err(e) = fs::create_dir_all(&self.storage.uploads_dir) {
            return Err(ConfigError::UploadsDir(format!(
                "Cannot create uploads directory {}: {}",
                self.storage.uploads_dir.display(),
                e
            )));
        }

        Ok(())
    }
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_parsed<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Validation(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig {
                bind_addr: "127.0.0.1:8080".to_string(),
                scheme: "http".to_string(),
                domain_name: "localhost:8080".to_string(),
            },
            storage: StorageConfig {
                database_url: "sqlite://./data/pastebox.db?mode=rwc".to_string(),
                uploads_dir: PathBuf::from("./data/uploads"),
                record_store: RecordStoreKind::Sqlite,
            },
            uploads: UploadsConfig {
                max_file_size_bytes: 1024 * 1024, // 1MB
                require_login: true,
            },
            session: SessionConfig {
                cookie_name: "id".to_string(),
                lifetime_days: 365,
                cookie_secure: false,
            },
            logging: LoggingConfig {
                format: LogFormat::Pretty,
            },
        }
    }
}
