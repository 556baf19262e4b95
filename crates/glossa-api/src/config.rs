//! Server configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABASE_URL` | `postgres://localhost/glossa` |
//! | `HOST` / `PORT` | `0.0.0.0` / `3000` |
//! | `PER_PAGE` | 100 (clamped to 1..=1000) |
//! | `DEBUG` | `false`; `true` exposes internal error text |
//! | `ALLOWED_ORIGINS` | unset or `*` allows any origin |
//! | `DB_MAX_CONNECTIONS` | 10 |
//! | `DB_ACQUIRE_TIMEOUT_SECS` | 30 |
//! | `GENERATOR_ID`, `GENERATOR_NAME`, `GENERATOR_HOMEPAGE` | unset (no `generator`) |
//! | `MAX_BODY_BYTES` | 1 MiB |

use std::str::FromStr;
use std::time::Duration;

use serde_json::{json, Value as JsonValue};
use tracing::warn;

use glossa_core::defaults::{MAX_PER_PAGE, PER_PAGE};
use glossa_db::pool::{PoolConfig, DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_MAX_CONNECTIONS};

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/glossa";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Software agent advertised as `generator` on every resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub id: String,
    pub name: Option<String>,
    pub homepage: Option<String>,
}

impl GeneratorConfig {
    pub fn to_json(&self) -> JsonValue {
        let mut out = json!({ "id": self.id, "type": "Software" });
        if let Some(name) = &self.name {
            out["name"] = json!(name);
        }
        if let Some(homepage) = &self.homepage {
            out["homepage"] = json!(homepage);
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub per_page: i64,
    pub debug: bool,
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub generator: Option<GeneratorConfig>,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            per_page: PER_PAGE,
            debug: false,
            allowed_origins: Vec::new(),
            db_max_connections: DEFAULT_MAX_CONNECTIONS,
            db_acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            generator: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

fn parse_or<T: FromStr + Copy>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = key, value = %raw, "Invalid value, using default");
            default
        }),
    }
}

fn parse_bool(raw: Option<String>) -> bool {
    raw.map(|v| v == "true" || v == "1").unwrap_or(false)
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty() && *o != "*")
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let generator = lookup("GENERATOR_ID")
            .filter(|id| !id.trim().is_empty())
            .map(|id| GeneratorConfig {
                id,
                name: lookup("GENERATOR_NAME"),
                homepage: lookup("GENERATOR_HOMEPAGE"),
            });

        Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            per_page: parse_or(&lookup, "PER_PAGE", defaults.per_page).clamp(1, MAX_PER_PAGE),
            debug: parse_bool(lookup("DEBUG")),
            allowed_origins,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections),
            db_acquire_timeout_secs: parse_or(
                &lookup,
                "DB_ACQUIRE_TIMEOUT_SECS",
                defaults.db_acquire_timeout_secs,
            ),
            generator,
            max_body_bytes: parse_or(&lookup, "MAX_BODY_BYTES", defaults.max_body_bytes),
        }
    }

    pub fn generator_json(&self) -> Option<JsonValue> {
        self.generator.as_ref().map(GeneratorConfig::to_json)
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(
            self.db_max_connections,
            Duration::from_secs(self.db_acquire_timeout_secs),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> ServerConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let c = config(&[]);
        assert_eq!(c.port, DEFAULT_PORT);
        assert_eq!(c.per_page, PER_PAGE);
        assert!(!c.debug);
        assert!(c.allowed_origins.is_empty());
        assert!(c.generator_json().is_none());
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let c = config(&[("PORT", "eighty"), ("PER_PAGE", "-")]);
        assert_eq!(c.port, DEFAULT_PORT);
        assert_eq!(c.per_page, PER_PAGE);
    }

    #[test]
    fn test_per_page_is_clamped() {
        assert_eq!(config(&[("PER_PAGE", "0")]).per_page, 1);
        assert_eq!(config(&[("PER_PAGE", "50000")]).per_page, MAX_PER_PAGE);
    }

    #[test]
    fn test_allowed_origins_split() {
        let c = config(&[("ALLOWED_ORIGINS", "https://a.example, ,http://localhost:3000")]);
        assert_eq!(c.allowed_origins, vec!["https://a.example", "http://localhost:3000"]);
        assert!(config(&[("ALLOWED_ORIGINS", "*")]).allowed_origins.is_empty());
    }

    #[test]
    fn test_generator_json() {
        let c = config(&[
            ("GENERATOR_ID", "https://glossa.example/"),
            ("GENERATOR_NAME", "glossa"),
        ]);
        assert_eq!(
            c.generator_json(),
            Some(json!({"id": "https://glossa.example/", "type": "Software", "name": "glossa"}))
        );
    }

    #[test]
    fn test_pool_settings_from_environment() {
        let c = config(&[("DB_MAX_CONNECTIONS", "3"), ("DB_ACQUIRE_TIMEOUT_SECS", "7")]);
        let pool = c.pool_config();
        assert_eq!(pool.max_connections, 3);
        assert_eq!(pool.acquire_timeout, Duration::from_secs(7));
        assert_eq!(config(&[]).pool_config(), PoolConfig::default());
    }

    #[test]
    fn test_debug_flag() {
        assert!(config(&[("DEBUG", "true")]).debug);
        assert!(config(&[("DEBUG", "1")]).debug);
        assert!(!config(&[("DEBUG", "yes")]).debug);
    }
}
