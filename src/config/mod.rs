use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub filter: FilterConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub default_limit: i32,
    pub max_limit: Option<i32>,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for uploaded venue media
    pub media_root: String,
    /// Working directory for rendered expense reports (HTML + PDF)
    pub report_dir: String,
    /// Headless browser executable used to print reports to PDF
    pub browser_bin: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set ({0:?} mode has no usable secret)")]
    MissingJwtSecret(Environment),
}

impl AppConfig {
    /// Settings the server refuses to start without, whatever the environment
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingJwtSecret(self.environment.clone()));
        }
        Ok(())
    }

    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Some(port) = env_parsed::<u16>("VENUE_API_PORT").or_else(|| env_parsed("PORT")) {
            self.server.port = port;
        }

        override_from_env(&mut self.filter.default_limit, "FILTER_DEFAULT_LIMIT");
        if let Ok(v) = env::var("FILTER_MAX_LIMIT") {
            // anything unparseable lifts the cap
            self.filter.max_limit = v.parse().ok();
        }
        override_from_env(&mut self.filter.debug_logging, "FILTER_DEBUG_LOGGING");

        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        override_from_env(&mut self.database.max_connections, "DATABASE_MAX_CONNECTIONS");
        override_from_env(&mut self.database.connection_timeout, "DATABASE_CONNECTION_TIMEOUT");
        override_from_env(&mut self.database.auto_migrate, "DATABASE_AUTO_MIGRATE");

        override_from_env(&mut self.security.enable_cors, "SECURITY_ENABLE_CORS");
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        override_from_env(&mut self.security.jwt_secret, "JWT_SECRET");
        override_from_env(&mut self.security.jwt_expiry_hours, "SECURITY_JWT_EXPIRY_HOURS");

        override_from_env(&mut self.storage.media_root, "STORAGE_MEDIA_ROOT");
        override_from_env(&mut self.storage.report_dir, "STORAGE_REPORT_DIR");
        override_from_env(&mut self.storage.browser_bin, "STORAGE_BROWSER_BIN");
        override_from_env(&mut self.storage.max_upload_bytes, "STORAGE_MAX_UPLOAD_BYTES");

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            filter: FilterConfig {
                default_limit: 10,
                max_limit: Some(1000),
                debug_logging: true,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 5,
                auto_migrate: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_secret: "development-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
            },
            storage: StorageConfig {
                media_root: "uploads".to_string(),
                report_dir: "reports".to_string(),
                browser_bin: "chromium".to_string(),
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            filter: FilterConfig {
                default_limit: 10,
                max_limit: Some(500),
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                auto_migrate: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
            },
            storage: StorageConfig {
                media_root: "/var/lib/venue-admin/uploads".to_string(),
                report_dir: "/var/lib/venue-admin/reports".to_string(),
                browser_bin: "chromium".to_string(),
                max_upload_bytes: 5 * 1024 * 1024, // 5MB
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            filter: FilterConfig {
                default_limit: 10,
                max_limit: Some(100),
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                auto_migrate: false,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://admin.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 12,
            },
            storage: StorageConfig {
                media_root: "/var/lib/venue-admin/uploads".to_string(),
                report_dir: "/var/lib/venue-admin/reports".to_string(),
                browser_bin: "chromium".to_string(),
                max_upload_bytes: 5 * 1024 * 1024, // 5MB
            },
        }
    }
}

fn env_parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Replace `slot` with the parsed value of `key`; unset or malformed values keep the preset.
fn override_from_env<T: FromStr>(slot: &mut T, key: &str) {
    if let Some(v) = env_parsed(key) {
        *slot = v;
    }
}

pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.filter.max_limit, Some(1000));
        assert!(config.database.auto_migrate);
        assert!(!config.security.jwt_secret.is_empty());
    }

    #[test]
    fn malformed_override_keeps_the_preset() {
        let mut limit = 10i32;
        std::env::set_var("VENUE_TEST_BAD_LIMIT", "ten");
        override_from_env(&mut limit, "VENUE_TEST_BAD_LIMIT");
        assert_eq!(limit, 10);

        std::env::set_var("VENUE_TEST_GOOD_LIMIT", "25");
        override_from_env(&mut limit, "VENUE_TEST_GOOD_LIMIT");
        assert_eq!(limit, 25);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.filter.max_limit, Some(100));
        assert!(!config.database.auto_migrate);
        // production must be given a secret explicitly
        assert!(config.security.jwt_secret.is_empty());
    }

    #[test]
    fn empty_secret_is_refused_outside_development_defaults() {
        assert_eq!(AppConfig::development().validate(), Ok(()));
        assert_eq!(
            AppConfig::staging().validate(),
            Err(ConfigError::MissingJwtSecret(Environment::Staging))
        );
        assert!(AppConfig::production().validate().is_err());

        let mut blank = AppConfig::development();
        blank.security.jwt_secret = "   ".to_string();
        assert!(blank.validate().is_err());
    }
}
