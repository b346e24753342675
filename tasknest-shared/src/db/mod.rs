//! PostgreSQL bootstrap
//!
//! - [`pool`]: connection pool creation, health check and shutdown
//! - [`migrations`]: embedded schema migrations
//!
//! Queries themselves live in [`crate::store::postgres`].
//!
//! # Example
//!
//! ```no_run
//! use tasknest_shared::db::pool::{create_pool, DatabaseConfig};
//! use tasknest_shared::db::migrations::run_migrations;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig {
//!         url: std::env::var("DATABASE_URL")?,
//!         ..Default::default()
//!     };
//!
//!     let pool = create_pool(config).await?;
//!     run_migrations(&pool).await?;
//!     Ok(())
//! }
//! ```

pub mod migrations;
pub mod pool;
