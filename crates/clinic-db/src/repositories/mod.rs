//! Repository implementations
//!
//! PostgreSQL implementations of the ports defined in clinic-core.

mod account;
mod error;
mod refresh_token;

pub use account::PgAccountRepository;
pub use refresh_token::PgRefreshTokenRepository;
