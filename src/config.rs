use serde::{Deserialize, Serialize};

use crate::utils::constants::{BACKEND_URL, MAX_SYNC_ATTEMPTS, OFFLINE_DB_NAME};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub backend_url_development: String,
    pub backend_url_production: String,
    pub environment: String,
    pub enable_logging: bool,
    pub max_sync_attempts: u32,
    /// 0 desactiva el reintento periódico; los eventos de red siguen disparando
    pub retry_interval_seconds: u32,
    pub offline_db_name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backend_url_development: BACKEND_URL.to_string(),
            backend_url_production: "https://api.trashdrop.app".to_string(),
            environment: "development".to_string(),
            enable_logging: true,
            max_sync_attempts: MAX_SYNC_ATTEMPTS,
            retry_interval_seconds: 0,
            offline_db_name: OFFLINE_DB_NAME.to_string(),
        }
    }
}

impl SyncConfig {
    /// Construye la config con variables de entorno de compilación
    /// (build.rs reenvía las que encuentra en `.env`).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend_url_development: option_env!("BACKEND_URL_DEVELOPMENT")
                .map(str::to_string)
                .unwrap_or(defaults.backend_url_development),
            backend_url_production: option_env!("BACKEND_URL_PRODUCTION")
                .map(str::to_string)
                .unwrap_or(defaults.backend_url_production),
            environment: option_env!("ENVIRONMENT")
                .map(str::to_string)
                .unwrap_or(defaults.environment),
            enable_logging: parse_or(option_env!("ENABLE_LOGGING"), defaults.enable_logging),
            max_sync_attempts: parse_or(option_env!("MAX_SYNC_ATTEMPTS"), defaults.max_sync_attempts)
                .max(1),
            retry_interval_seconds: parse_or(
                option_env!("SYNC_RETRY_INTERVAL_SECONDS"),
                defaults.retry_interval_seconds,
            ),
            offline_db_name: option_env!("OFFLINE_DB_NAME")
                .map(str::to_string)
                .unwrap_or(defaults.offline_db_name),
        }
    }

    /// URL del backend para el entorno actual
    pub fn backend_url(&self) -> &str {
        match self.environment.as_str() {
            "production" => &self.backend_url_production,
            _ => &self.backend_url_development,
        }
    }

    pub fn is_logging_enabled(&self) -> bool {
        self.enable_logging
    }

    /// Intervalo de reintento en milisegundos, si está activo
    pub fn retry_interval_ms(&self) -> Option<u32> {
        match self.retry_interval_seconds {
            0 => None,
            secs => Some(secs.saturating_mul(1000)),
        }
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<&str>, fallback: T) -> T {
    raw.and_then(|value| value.trim().parse().ok()).unwrap_or(fallback)
}
