//! Account views returned by the identity collaborator

use std::collections::BTreeSet;

use crate::value_objects::AccountId;

/// Minimal account projection needed to authenticate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub id: AccountId,
    pub email: String,
    pub username: String,
    /// Surfaced to clients as metadata; never blocks login
    pub email_confirmed: bool,
}

/// Authorization data embedded in access tokens
///
/// Re-read from the identity store on every issuance so role or tenant
/// changes take effect at the next refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountClaims {
    pub roles: BTreeSet<String>,
    pub tenant_id: Option<String>,
}

impl AccountClaims {
    pub fn new<I, S>(roles: I, tenant_id: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            tenant_id,
        }
    }
}
