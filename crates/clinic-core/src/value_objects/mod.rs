//! Value objects - immutable types that represent domain concepts

mod account_id;

pub use account_id::{AccountId, AccountIdParseError};
