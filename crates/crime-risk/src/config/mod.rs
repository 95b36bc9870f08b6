use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::assessment::service::DEFAULT_MAX_BATCH_SIZE;
use crate::assessment::{AssessmentEngine, AssessmentServiceError, ReferenceTables};

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub assessment: AssessmentConfig,
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

        let reference_tables = env::var("APP_REFERENCE_TABLES")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let max_batch_size = match env::var("APP_MAX_BATCH_SIZE") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(size) if size >= 1 => size,
                _ => return Err(ConfigError::InvalidBatchSize { value: raw }),
            },
            Err(_) => DEFAULT_MAX_BATCH_SIZE,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            assessment: AssessmentConfig {
                reference_tables,
                max_batch_size,
            },
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Reference data source and request limits for the assessment engine.
#[derive(Debug, Clone)]
pub struct AssessmentConfig {
    pub reference_tables: Option<PathBuf>,
    pub max_batch_size: usize,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            reference_tables: None,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl AssessmentConfig {
    /// Embedded research tables, or the configured JSON override.
    pub fn load_tables(&self) -> Result<ReferenceTables, AssessmentServiceError> {
        match &self.reference_tables {
            Some(path) => Ok(ReferenceTables::from_path(path)?),
            None => Ok(ReferenceTables::standard()),
        }
    }

    pub fn build_engine(&self) -> Result<AssessmentEngine, AssessmentServiceError> {
        AssessmentEngine::with_batch_limit(self.load_tables()?, self.max_batch_size)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidBatchSize { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidBatchSize { value } => {
                write!(f, "APP_MAX_BATCH_SIZE must be a positive integer, found '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidBatchSize { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("APP_REFERENCE_TABLES");
        env::remove_var("APP_MAX_BATCH_SIZE");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.assessment.reference_tables.is_none());
        assert_eq!(config.assessment.max_batch_size, 100);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn rejects_zero_batch_size() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_MAX_BATCH_SIZE", "0");
        let err = AppConfig::load().expect_err("zero batch size rejected");
        assert!(matches!(err, ConfigError::InvalidBatchSize { .. }));
        reset_env();
    }

    #[test]
    fn missing_reference_override_fails_engine_build() {
        let config = AssessmentConfig {
            reference_tables: Some(PathBuf::from("/nonexistent/tables.json")),
            ..AssessmentConfig::default()
        };
        assert!(matches!(
            config.build_engine(),
            Err(AssessmentServiceError::Tables(_))
        ));
    }

    #[test]
    fn default_assessment_config_builds_standard_engine() {
        let engine = AssessmentConfig::default()
            .build_engine()
            .expect("standard tables build");
        assert_eq!(engine.max_batch_size(), 100);
    }
}
