//! # clinic-core
//!
//! Domain layer for the session subsystem: refresh-token and lockout entities,
//! the account id value object, the injectable clock, and the repository ports
//! implemented by the infrastructure crates.
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod clock;
pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use entities::{
    generate_refresh_token_value, AccountClaims, AccountRecord, LockoutState, RefreshToken,
};
pub use error::DomainError;
pub use traits::{IdentityProvider, LockoutRepository, RefreshTokenRepository, RepoResult};
pub use value_objects::{AccountId, AccountIdParseError};
