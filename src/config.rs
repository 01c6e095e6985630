//! Runtime configuration read from the environment (and `.env` via dotenvy).

use rand::distr::{Alphanumeric, SampleString};
use std::path::PathBuf;

/// Secrets shorter than this are rejected in production.
const MIN_SECRET_LENGTH: usize = 32;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    /// Bootstrap credentials accepted while no admin user exists.
    pub admin_email: Option<String>,
    pub admin_password_hash: Option<String>,
    pub upload_dir: PathBuf,
    pub notify_webhook_url: Option<String>,
    pub site_url: String,
    pub site_title: String,
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let environment = env_opt("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let jwt_secret = match env_opt("JWT_SECRET") {
            Some(secret) => secret,
            None if environment == "production" => {
                return Err("JWT_SECRET must be set in production".to_string());
            }
            None => {
                tracing::warn!("JWT_SECRET not set; sessions will not survive a restart");
                Alphanumeric.sample_string(&mut rand::rng(), 64)
            }
        };
        if environment == "production" && jwt_secret.len() < MIN_SECRET_LENGTH {
            return Err(format!(
                "JWT_SECRET must be at least {} bytes in production",
                MIN_SECRET_LENGTH
            ));
        }

        Ok(Self {
            host: env_opt("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: env_parse("PORT", 3001),
            database_url: env_opt("DATABASE_URL"),
            jwt_secret,
            session_ttl_hours: env_parse("SESSION_TTL_HOURS", 12),
            admin_email: env_opt("ADMIN_EMAIL"),
            admin_password_hash: env_opt("ADMIN_PASSWORD_HASH"),
            upload_dir: PathBuf::from(
                env_opt("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()),
            ),
            notify_webhook_url: env_opt("NOTIFY_WEBHOOK_URL"),
            site_url: env_opt("SITE_URL").unwrap_or_else(|| "https://eshrm.com".to_string()),
            site_title: env_opt("SITE_TITLE").unwrap_or_else(|| "ESHRM Insights".to_string()),
            environment,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Configuration for tests and local tooling.
    pub fn for_tests(upload_dir: PathBuf) -> Self {
        Self {
            environment: "test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: None,
            jwt_secret: "test-secret-test-secret-test-secret".to_string(),
            session_ttl_hours: 1,
            admin_email: None,
            admin_password_hash: None,
            upload_dir,
            notify_webhook_url: None,
            site_url: "http://localhost:3000".to_string(),
            site_title: "ESHRM Insights".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse_falls_back_on_garbage() {
        assert_eq!(env_parse("ESHRM_TEST_UNSET_PORT", 3001u16), 3001);
    }

    #[test]
    fn test_for_tests_is_not_production() {
        let config = AppConfig::for_tests(PathBuf::from("uploads"));
        assert!(!config.is_production());
        assert!(config.database_url.is_none());
    }
}
