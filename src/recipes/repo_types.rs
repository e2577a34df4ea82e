use sqlx::FromRow;
use time::OffsetDateTime;

/// A recipe joined with its owner's public columns.
#[derive(Debug, Clone, FromRow)]
pub struct RecipeRow {
    pub id: i64,
    pub title: String,
    pub instructions: String,
    pub minutes_to_complete: Option<i32>,
    pub user_id: i64,
    pub created_at: OffsetDateTime,
    pub username: String,
    pub bio: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub title: String,
    pub instructions: String,
    pub minutes_to_complete: Option<i32>,
    pub user_id: i64,
}
