//! Business logic services
//!
//! Services borrow a [`ServiceContext`] and are cheap to construct per call.

pub mod concurrency;
pub mod context;
pub mod error;
pub mod lockout;
pub mod purge;
pub mod refresh_token;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use concurrency::{AccountLockGuard, AccountLockRegistry};
pub use context::{ServiceContext, ServiceContextBuilder, SessionPolicy};
pub use error::{ServiceError, ServiceResult};
pub use lockout::AccountLockoutGuard;
pub use purge::{purge_once, spawn_purge_task, PurgeReport};
pub use refresh_token::RefreshTokenStore;
pub use session::{SessionService, SessionTokens};
