use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// How startup initialization is sequenced against serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMode {
    /// Initialize first, then listen. Initialization failure terminates the process.
    Listen,
    /// Listen immediately and hold requests behind the init guard.
    Guarded,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub name: String,
    pub url: String,
    pub host: String,
    pub port: u16,
    /// Path prefix for every registered route, without slashes (e.g. "api").
    pub api_prefix: String,
    pub environment: Environment,
    /// Running on a read-only serverless filesystem (only the temp dir is writable).
    pub serverless: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Full connection string, preferred outside development.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Root directory for the embedded document store.
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub allowed_mime_types: Vec<String>,
    /// Maximum size of a single uploaded file in bytes
    pub max_file_size: u64,
    pub max_files: usize,
}

pub const DEFAULT_ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Ovenly".to_string(),
            url: "http://localhost:3000".to_string(),
            host: "localhost".to_string(),
            port: 3000,
            api_prefix: "api".to_string(),
            environment: Environment::Production,
            serverless: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 27017,
            name: "ovenly".to_string(),
            user: None,
            password: None,
            data_dir: "./data".to_string(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_mime_types: DEFAULT_ALLOWED_MIME_TYPES
                .iter()
                .map(|m| m.to_string())
                .collect(),
            max_file_size: 10 * 1024 * 1024, // 10MB
            max_files: 10,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let environment = match std::env::var("NODE_ENV")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "development" => Environment::Development,
            _ => Environment::Production,
        };

        let defaults = AppConfig::default();
        let port = match std::env::var("PORT") {
            Ok(p) => p
                .parse()
                .map_err(|_| ConfigError::ValidationError(format!("PORT is not a valid port: {p}")))?,
            Err(_) => defaults.port,
        };

        let app = AppConfig {
            name: std::env::var("APP_NAME").unwrap_or(defaults.name),
            url: std::env::var("APP_URL").unwrap_or(defaults.url),
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port,
            api_prefix: std::env::var("API_PREFIX")
                .map(|p| p.trim_matches('/').to_string())
                .unwrap_or(defaults.api_prefix),
            environment,
            serverless: detect_serverless(),
        };

        let db_defaults = DatabaseConfig::default();
        let database = DatabaseConfig {
            url: non_empty_var("DATABASE_URL"),
            host: std::env::var("DATABASE_HOST").unwrap_or(db_defaults.host),
            port: std::env::var("DATABASE_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(db_defaults.port),
            name: std::env::var("DATABASE_NAME").unwrap_or(db_defaults.name),
            user: non_empty_var("DATABASE_USER"),
            password: non_empty_var("DATABASE_PASSWORD"),
            data_dir: std::env::var("DATA_DIR").unwrap_or(db_defaults.data_dir),
        };

        let upload_defaults = UploadConfig::default();
        let uploads = UploadConfig {
            allowed_mime_types: upload_defaults.allowed_mime_types,
            max_file_size: std::env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(upload_defaults.max_file_size),
            max_files: std::env::var("MAX_UPLOAD_FILES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(upload_defaults.max_files),
        };

        let config = Config {
            app,
            database,
            uploads,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "DATABASE_NAME cannot be empty".to_string(),
            ));
        }

        if self.uploads.max_file_size == 0 || self.uploads.max_files == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE and MAX_UPLOAD_FILES must be greater than 0".to_string(),
            ));
        }

        if !self.is_development() && self.database.url.is_none() {
            tracing::warn!(
                "DATABASE_URL is not set outside development; falling back to {}:{}",
                self.database.host,
                self.database.port
            );
        }

        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.app.environment == Environment::Development
    }

    /// Development listens after initializing; everything else serves behind the init guard.
    pub fn init_mode(&self) -> InitMode {
        if self.is_development() {
            InitMode::Listen
        } else {
            InitMode::Guarded
        }
    }

    pub fn bind_address(&self) -> String {
        let host = if self.is_development() {
            self.app.host.as_str()
        } else {
            "0.0.0.0"
        };
        format!("{host}:{}", self.app.port)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Serverless platforms only allow writes under the temp directory.
fn detect_serverless() -> bool {
    let flag = std::env::var("SERVERLESS")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);
    let platform = ["VERCEL", "VERCEL_ENV", "AWS_LAMBDA_FUNCTION_NAME"]
        .iter()
        .any(|name| std::env::var_os(name).is_some());
    let task_root = std::env::current_dir()
        .map(|dir| dir.starts_with("/var/task"))
        .unwrap_or(false);

    flag || platform || task_root
}
