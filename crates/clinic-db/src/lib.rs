//! # clinic-db
//!
//! Storage layer implementing the `clinic-core` ports.
//!
//! ## Overview
//!
//! - Connection pool management and runtime migrations
//! - Database models with SQLx `FromRow` derives
//! - Model → entity mappers
//! - PostgreSQL repositories (`Pg*`)
//! - In-memory repositories for tests and local development (`InMemory*`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clinic_db::{create_pool, run_migrations, PgRefreshTokenRepository, PoolConfig};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&PoolConfig::from_env()).await?;
//!     run_migrations(&pool, "./migrations").await?;
//!     let refresh_tokens = PgRefreshTokenRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use memory::{InMemoryAccountStore, InMemoryRefreshTokenRepository};
pub use pool::{create_pool, run_migrations, PgPool, PoolConfig};
pub use repositories::{PgAccountRepository, PgRefreshTokenRepository};
