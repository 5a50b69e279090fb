/// Configuration management for the API server
///
/// Configuration is read from environment variables, with a `.env` file
/// loaded first when present.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: *)
/// - `DEFAULT_PAGE_SIZE`: List page size when `limit` is absent (default: 100)
/// - `MAX_PAGE_SIZE`: Upper bound for `limit` (default: 1000)
/// - `STORE_BACKEND`: `postgres` or `memory` (default: postgres)
/// - `DATABASE_URL`: PostgreSQL connection string (required for postgres)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `RUN_MIGRATIONS`: Apply embedded migrations at start-up (default: true)
///
/// # Example
///
/// ```no_run
/// use pingcrm_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Which record store backs the API
    pub store: StoreBackend,

    /// Database configuration
    pub database: DatabaseConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Page size used when a list request has no `limit`
    pub default_page_size: i64,

    /// Largest accepted `limit`
    pub max_page_size: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            default_page_size: 100,
            max_page_size: 1000,
        }
    }
}

/// Record store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("Unknown store backend: {}", other),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: Option<String>,

    /// Maximum number of connections in pool
    pub max_connections: u32,

    /// Apply embedded migrations at start-up
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            run_migrations: true,
        }
    }
}

/// Reads and parses an environment variable, falling back to `default`
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// In-memory configuration with default API settings
    pub fn in_memory() -> Self {
        Self {
            api: ApiConfig::default(),
            store: StoreBackend::Memory,
            database: DatabaseConfig::default(),
        }
    }

    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` is missing while the postgres backend is selected
    /// - A variable has a value that does not parse
    /// - The page size bounds are inconsistent
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let defaults = ApiConfig::default();

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.cors_origins);

        let api = ApiConfig {
            host: env::var("API_HOST").unwrap_or(defaults.host),
            port: env_or("API_PORT", defaults.port)?,
            cors_origins,
            default_page_size: env_or("DEFAULT_PAGE_SIZE", defaults.default_page_size)?,
            max_page_size: env_or("MAX_PAGE_SIZE", defaults.max_page_size)?,
        };

        if api.max_page_size < 1 {
            anyhow::bail!("MAX_PAGE_SIZE must be at least 1");
        }
        if api.default_page_size < 1 || api.default_page_size > api.max_page_size {
            anyhow::bail!("DEFAULT_PAGE_SIZE must be between 1 and MAX_PAGE_SIZE");
        }

        let store = env_or("STORE_BACKEND", StoreBackend::Postgres)?;

        let url = env::var("DATABASE_URL").ok();
        if store == StoreBackend::Postgres && url.is_none() {
            anyhow::bail!("DATABASE_URL environment variable is required");
        }

        let database = DatabaseConfig {
            url,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10u32)?,
            run_migrations: env_or("RUN_MIGRATIONS", true)?,
        };

        Ok(Self {
            api,
            store,
            database,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether CORS accepts any origin
    pub fn cors_is_permissive(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}
