//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.
//! Todas las variables tienen un valor por defecto; un valor presente pero
//! mal formado es un error de configuración.

use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::cache::CacheConfig;
use crate::services::ReconciliationPolicy;

/// Ítems del checklist de inspección por defecto
pub const DEFAULT_CHECKLIST_ITEMS: [&str; 6] =
    ["tires", "lights", "brakes", "mirrors", "fluids", "documents"];

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a valid number, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} has an invalid value: {message}")]
    InvalidValue { name: &'static str, message: String },
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub log_level: String,
    // Store durable
    pub redis_url: String,
    pub cache_key_prefix: String,
    pub journey_ttl_seconds: u64,
    // Sistema de registro
    pub system_of_record_url: String,
    pub system_of_record_token: Option<String>,
    pub remote_timeout_seconds: u64,
    // Jornada
    pub checklist_items: Vec<String>,
    pub reconciliation_policy: ReconciliationPolicy,
    pub finalize_retry_interval_seconds: u64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            cors_origins: Vec::new(),
            log_level: "info".to_string(),
            redis_url: "redis://localhost:6379".to_string(),
            cache_key_prefix: "duty_journey".to_string(),
            journey_ttl_seconds: 604_800,
            system_of_record_url: "http://localhost:8080/api".to_string(),
            system_of_record_token: None,
            remote_timeout_seconds: 15,
            checklist_items: DEFAULT_CHECKLIST_ITEMS.iter().map(|s| s.to_string()).collect(),
            reconciliation_policy: ReconciliationPolicy::default(),
            finalize_retry_interval_seconds: 60,
        }
    }
}

impl EnvironmentConfig {
    /// Leer la configuración desde el entorno (tras `dotenvy::dotenv()`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let reconciliation_policy = match optional("RECONCILIATION_POLICY") {
            Some(value) => ReconciliationPolicy::from_str(&value).map_err(|message| {
                ConfigError::InvalidValue {
                    name: "RECONCILIATION_POLICY",
                    message,
                }
            })?,
            None => defaults.reconciliation_policy,
        };

        let checklist_items = optional("CHECKLIST_ITEMS")
            .map(|value| split_list(&value))
            .filter(|items| !items.is_empty())
            .unwrap_or(defaults.checklist_items);

        Ok(Self {
            environment: optional("ENVIRONMENT").unwrap_or(defaults.environment),
            port: number("PORT", defaults.port)?,
            host: optional("HOST").unwrap_or(defaults.host),
            cors_origins: optional("CORS_ORIGINS")
                .map(|value| split_list(&value))
                .unwrap_or(defaults.cors_origins),
            log_level: optional("LOG_LEVEL").unwrap_or(defaults.log_level),
            redis_url: optional("REDIS_URL").unwrap_or(defaults.redis_url),
            cache_key_prefix: optional("CACHE_KEY_PREFIX").unwrap_or(defaults.cache_key_prefix),
            journey_ttl_seconds: number("JOURNEY_TTL_SECONDS", defaults.journey_ttl_seconds)?,
            system_of_record_url: optional("SYSTEM_OF_RECORD_URL")
                .unwrap_or(defaults.system_of_record_url),
            system_of_record_token: optional("SYSTEM_OF_RECORD_TOKEN"),
            remote_timeout_seconds: number("REMOTE_TIMEOUT_SECONDS", defaults.remote_timeout_seconds)?,
            checklist_items,
            reconciliation_policy,
            finalize_retry_interval_seconds: number(
                "FINALIZE_RETRY_INTERVAL_SECONDS",
                defaults.finalize_retry_interval_seconds,
            )?,
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Obtener la dirección del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            redis_url: self.redis_url.clone(),
            key_prefix: self.cache_key_prefix.clone(),
            default_ttl: self.journey_ttl_seconds,
        }
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_seconds)
    }

    pub fn finalize_retry_interval(&self) -> Duration {
        Duration::from_secs(self.finalize_retry_interval_seconds.max(1))
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn number<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(default),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
