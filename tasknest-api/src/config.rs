//! Configuration management for the API server
//!
//! Loaded once at startup from environment variables (and a `.env` file if
//! present).
//!
//! # Environment Variables
//!
//! - `API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `API_PORT`: Port to bind to (default: 3000)
//! - `API_PRODUCTION`: Enables HSTS (default: false)
//! - `CORS_ORIGINS`: Comma-separated origins, `*` for any (default: *)
//! - `AVATAR_MAX_BYTES`: Avatar upload cap (default: 1000000)
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
//! - `JWT_SECRET`: Token signing secret, at least 32 characters (required)
//! - `PASSWORD_HASH_MEMORY_KIB`, `PASSWORD_HASH_ITERATIONS`,
//!   `PASSWORD_HASH_PARALLELISM`: Argon2id cost (default: 65536 / 3 / 4)
//! - `SENDGRID_API_KEY`: Enables email delivery when set
//! - `EMAIL_FROM`: Sender address for account emails
//! - `RUST_LOG`: Log filter
//!
//! # Example
//!
//! ```no_run
//! use tasknest_api::config::Config;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! println!("Server will listen on {}", config.bind_address());
//! # Ok(())
//! # }
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tasknest_shared::auth::HashingCost;
use tasknest_shared::avatar::DEFAULT_MAX_BYTES;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub email: EmailConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Production mode; adds HSTS
    pub production: bool,

    /// Allowed CORS origins, `*` allows any
    pub cors_origins: Vec<String>,

    /// Largest accepted avatar upload in bytes
    pub avatar_max_bytes: usize,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Token signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HMAC secret for session tokens
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Argon2id work factor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

/// Outbound email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SendGrid key; emails are only logged when unset
    pub sendgrid_api_key: Option<String>,

    /// Sender address
    pub from: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let default_cost = HashingCost::default();

        Ok(Self {
            api: ApiConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env("API_PORT", 3000)?,
                production: parse_env("API_PRODUCTION", false)?,
                cors_origins,
                avatar_max_bytes: parse_env("AVATAR_MAX_BYTES", DEFAULT_MAX_BYTES)?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            jwt: JwtConfig { secret: jwt_secret },
            password: PasswordConfig {
                memory_kib: parse_env("PASSWORD_HASH_MEMORY_KIB", default_cost.memory_kib)?,
                iterations: parse_env("PASSWORD_HASH_ITERATIONS", default_cost.iterations)?,
                parallelism: parse_env("PASSWORD_HASH_PARALLELISM", default_cost.parallelism)?,
            },
            email: EmailConfig {
                sendgrid_api_key: env::var("SENDGRID_API_KEY").ok().filter(|k| !k.is_empty()),
                from: env::var("EMAIL_FROM").unwrap_or_else(|_| "noreply@tasknest.dev".to_string()),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn hashing_cost(&self) -> HashingCost {
        HashingCost {
            memory_kib: self.password.memory_kib,
            iterations: self.password.iterations,
            parallelism: self.password.parallelism,
        }
    }

    /// True if CORS should accept any origin
    pub fn cors_allows_any(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}
