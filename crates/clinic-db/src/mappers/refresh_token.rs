//! RefreshToken entity <-> model mapper

use clinic_core::entities::RefreshToken;
use clinic_core::value_objects::AccountId;

use crate::models::RefreshTokenModel;

impl From<RefreshTokenModel> for RefreshToken {
    fn from(model: RefreshTokenModel) -> Self {
        RefreshToken {
            id: model.id,
            token: model.token,
            account_id: AccountId::from_uuid(model.account_id),
            issued_at: model.issued_at,
            expires_at: model.expires_at,
            created_by_ip: model.created_by_ip,
            revoked_by_ip: model.revoked_by_ip,
            is_revoked: model.is_revoked,
            revoked_at: model.revoked_at,
            replaced_by_token: model.replaced_by_token,
        }
    }
}
