//! User account model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

/// Account row linked to one identity-provider subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    /// Opaque subject id issued by the identity provider. Unique.
    pub clerk_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Insert payload for a new account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub clerk_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
}

impl NewUser {
    pub fn new(clerk_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            clerk_id: clerk_id.into(),
            email: email.into(),
            ..Self::default()
        }
    }
}
