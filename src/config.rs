// ⚙️ Runtime configuration from the environment

use std::env;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "minicore.db";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_format: LogFormat::Compact,
        }
    }
}

impl AppConfig {
    /// Read `MINICORE_DB_PATH`, `MINICORE_BIND`, `PORT` and
    /// `MINICORE_LOG_FORMAT`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "ignoring invalid PORT");
                defaults.port
            }),
            None => defaults.port,
        };

        let log_format = match lookup("MINICORE_LOG_FORMAT").as_deref() {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        AppConfig {
            db_path: lookup("MINICORE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            host: lookup("MINICORE_BIND").unwrap_or(defaults.host),
            port,
            log_format,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
