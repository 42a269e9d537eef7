use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::intake::validation::{ValidationPolicy, DEFAULT_MAX_FILE_BYTES};

/// Webhook receiving completed applications unless `INTAKE_ENDPOINT_URL` overrides it.
pub const DEFAULT_ENDPOINT_URL: &str =
    "https://workflow.hasnatech.cloud/webhook/44b8f3ea-4447-46c3-9697-32a516bd1883";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the intake service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub intake: IntakeConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            intake: IntakeConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where completed applications go and how answers are checked.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub endpoint_url: String,
    pub timeout: Duration,
    pub phone_pattern: Option<String>,
    pub max_file_bytes: u64,
}

impl IntakeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let endpoint_url =
            env::var("INTAKE_ENDPOINT_URL").unwrap_or_else(|_| DEFAULT_ENDPOINT_URL.to_string());
        let endpoint = reqwest::Url::parse(&endpoint_url)
            .map_err(|_| ConfigError::InvalidEndpoint(endpoint_url.clone()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEndpoint(endpoint_url));
        }

        let timeout_secs = match env::var("INTAKE_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout)?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        let max_file_bytes = match env::var("INTAKE_MAX_FILE_BYTES") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|bytes| *bytes > 0)
                .ok_or(ConfigError::InvalidFileLimit)?,
            Err(_) => DEFAULT_MAX_FILE_BYTES,
        };

        let phone_pattern = env::var("INTAKE_PHONE_PATTERN")
            .ok()
            .filter(|pattern| !pattern.trim().is_empty());

        let config = Self {
            endpoint_url,
            timeout: Duration::from_secs(timeout_secs),
            phone_pattern,
            max_file_bytes,
        };
        config.validation_policy()?;
        Ok(config)
    }

    /// Validation rules with the configured regional overrides applied.
    pub fn validation_policy(&self) -> Result<ValidationPolicy, ConfigError> {
        let policy = ValidationPolicy::standard().with_max_file_bytes(self.max_file_bytes);
        match &self.phone_pattern {
            Some(pattern) => policy
                .with_phone_pattern(pattern)
                .map_err(|source| ConfigError::InvalidPhonePattern { source }),
            None => Ok(policy),
        }
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            phone_pattern: None,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidEndpoint(String),
    InvalidTimeout,
    InvalidFileLimit,
    InvalidPhonePattern { source: regex::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidEndpoint(value) => {
                write!(f, "INTAKE_ENDPOINT_URL must be an http(s) URL, got '{value}'")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "INTAKE_TIMEOUT_SECS must be a positive number of seconds")
            }
            ConfigError::InvalidFileLimit => {
                write!(f, "INTAKE_MAX_FILE_BYTES must be a positive byte count")
            }
            ConfigError::InvalidPhonePattern { .. } => {
                write!(f, "INTAKE_PHONE_PATTERN must be a valid regular expression")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPhonePattern { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidEndpoint(_)
            | ConfigError::InvalidTimeout
            | ConfigError::InvalidFileLimit => None,
        }
    }
}
