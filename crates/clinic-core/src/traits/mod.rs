//! Repository traits (ports)

mod repositories;

pub use repositories::{IdentityProvider, LockoutRepository, RefreshTokenRepository, RepoResult};
