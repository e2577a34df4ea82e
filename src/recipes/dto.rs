use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::dto::PublicUser;
use crate::recipes::repo_types::RecipeRow;

#[derive(Debug, Default, Deserialize)]
pub struct CreateRecipeRequest {
    pub title: Option<String>,
    pub instructions: Option<String>,
    pub minutes_to_complete: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub title: String,
    pub instructions: String,
    pub minutes_to_complete: Option<i32>,
    pub user_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user: PublicUser,
}

impl From<RecipeRow> for RecipeResponse {
    fn from(r: RecipeRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            instructions: r.instructions,
            minutes_to_complete: r.minutes_to_complete,
            user_id: r.user_id,
            created_at: r.created_at,
            user: PublicUser {
                id: r.user_id,
                username: r.username,
                bio: r.bio,
                image_url: r.image_url,
            },
        }
    }
}
