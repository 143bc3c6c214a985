//! Authentication utilities

mod password;
mod token_issuer;

pub use password::{hash_password, verify_dummy_password, verify_password};
pub use token_issuer::{AccessClaims, IssuedAccessToken, TokenIssuer, TokenVerification};
