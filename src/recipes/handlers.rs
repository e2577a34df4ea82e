use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{info, instrument, warn};

use crate::{
    auth::{dto::present, extractors::CurrentUser},
    error::{AppError, AppResult},
    extract::AppJson,
    recipes::{
        dto::{CreateRecipeRequest, RecipeResponse},
        repo_types::NewRecipe,
    },
    state::AppState,
};

pub fn recipe_routes() -> Router<AppState> {
    Router::new().route("/recipes", get(list_recipes).post(create_recipe))
}

/// Public listing, no session needed.
#[instrument(skip(state))]
pub async fn list_recipes(State(state): State<AppState>) -> AppResult<Json<Vec<RecipeResponse>>> {
    let rows = state.recipes.list_all().await?;
    Ok(Json(rows.into_iter().map(RecipeResponse::from).collect()))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn create_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(payload): AppJson<CreateRecipeRequest>,
) -> AppResult<(StatusCode, Json<RecipeResponse>)> {
    let (Some(title), Some(instructions)) = (present(payload.title), present(payload.instructions))
    else {
        warn!("recipe missing title or instructions");
        return Err(AppError::Validation("Title and instructions required".into()));
    };

    let row = state
        .recipes
        .create(NewRecipe {
            title,
            instructions,
            minutes_to_complete: payload.minutes_to_complete,
            user_id: user.id,
        })
        .await?;

    info!(recipe_id = row.id, "recipe created");
    Ok((StatusCode::CREATED, Json(row.into())))
}
