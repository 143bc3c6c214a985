//! In-memory adapters
//!
//! Process-local implementations of the storage ports backed by `DashMap`.
//! Used by tests and by `STORAGE_BACKEND=memory` for local development.
//! Per-key operations run under the map's shard lock, which gives the same
//! single-winner guarantee as the conditional updates in PostgreSQL.

mod account;
mod refresh_token;

pub use account::InMemoryAccountStore;
pub use refresh_token::InMemoryRefreshTokenRepository;
