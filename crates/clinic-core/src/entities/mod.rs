//! Domain entities - core business objects

mod account;
mod lockout;
mod refresh_token;

pub use account::{AccountClaims, AccountRecord};
pub use lockout::LockoutState;
pub use refresh_token::{generate_refresh_token_value, RefreshToken, REFRESH_TOKEN_BYTES};
