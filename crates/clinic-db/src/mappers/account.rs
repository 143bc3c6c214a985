//! Account models -> domain views

use clinic_core::entities::{AccountRecord, LockoutState};
use clinic_core::value_objects::AccountId;

use crate::models::{AccountModel, LockoutModel};

impl From<AccountModel> for AccountRecord {
    fn from(model: AccountModel) -> Self {
        AccountRecord {
            id: AccountId::from_uuid(model.id),
            email: model.email,
            username: model.username,
            email_confirmed: model.email_confirmed,
        }
    }
}

impl From<LockoutModel> for LockoutState {
    fn from(model: LockoutModel) -> Self {
        LockoutState {
            failed_login_attempts: model.failed_login_attempts,
            lockout_until: model.lockout_until,
        }
    }
}
