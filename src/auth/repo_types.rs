use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::password::CredentialHasher;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string, never exposed in JSON
    pub bio: Option<String>,
    pub image_url: Option<String>,
}

impl User {
    /// Check a raw password against the stored hash.
    pub fn authenticate(&self, password: &str, hasher: &dyn CredentialHasher) -> anyhow::Result<bool> {
        hasher.verify(password, &self.password_hash)
    }
}

/// A user that has not been persisted yet. Only the derived hash is held.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub bio: Option<String>,
    pub image_url: Option<String>,
}

impl NewUser {
    pub fn new(
        username: String,
        password: &str,
        bio: Option<String>,
        image_url: Option<String>,
        hasher: &dyn CredentialHasher,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            username,
            password_hash: hasher.hash(password)?,
            bio,
            image_url,
        })
    }
}
