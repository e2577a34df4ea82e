use serde::{Deserialize, Serialize};

use super::repo_types::User;

/// Request body for signup. Fields are optional so that missing values
/// produce our own 422 rather than a decoder rejection.
#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub bio: Option<String>,
    pub image_url: Option<String>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            bio: u.bio,
            image_url: u.image_url,
        }
    }
}

/// Treats absent, null and empty strings alike.
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
