//! User records owned by the identity provider

use serde::{Deserialize, Serialize};

/// Cached view of the identity provider's user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub email_verified: bool,
}

/// Profile fields a user may change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ProfileChanges {
    pub fn display_name(name: impl Into<String>) -> Self {
        Self {
            email: None,
            display_name: Some(name.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.display_name.is_none()
    }
}

/// The user document mirrored into the document store
pub type UserDocument = ProfileChanges;
