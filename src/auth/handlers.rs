use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{present, LoginRequest, PublicUser, SignupRequest},
        extractors::{bind_user, unbind_user, CurrentUser},
        repo_types::NewUser,
    },
    error::{AppError, AppResult},
    extract::AppJson,
    state::AppState,
    store::StoreError,
};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", delete(logout))
        .route("/check_session", get(check_session))
}

#[instrument(skip(state, session, payload))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    AppJson(payload): AppJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    let (Some(username), Some(password)) = (present(payload.username), present(payload.password))
    else {
        warn!("signup missing username or password");
        return Err(AppError::Validation("Username and password required".into()));
    };

    // argon2 is CPU-bound; keep it off the async workers
    let hasher = state.hasher.clone();
    let (bio, image_url) = (payload.bio.unwrap_or_default(), payload.image_url.unwrap_or_default());
    let new = tokio::task::spawn_blocking(move || {
        NewUser::new(username, &password, Some(bio), Some(image_url), hasher.as_ref())
    })
    .await
    .context("password hashing task failed")??;

    let user = match state.users.create(new).await {
        Ok(u) => u,
        Err(StoreError::Conflict) => {
            warn!("signup with taken username");
            return Err(AppError::Conflict("Username already exists".into()));
        }
        Err(e) => return Err(e.into()),
    };

    // never reuse an id the client arrived with
    session.cycle_id().await?;
    bind_user(&session, user.id).await?;

    info!(user_id = user.id, username = %user.username, "user signed up");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, session, payload))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<PublicUser>> {
    let (Some(username), Some(password)) = (present(payload.username), present(payload.password))
    else {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    let Some(user) = state.users.find_by_username(&username).await? else {
        warn!(%username, "login unknown username");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    let hasher = state.hasher.clone();
    let candidate = user.clone();
    let valid = tokio::task::spawn_blocking(move || candidate.authenticate(&password, hasher.as_ref()))
        .await
        .context("password verification task failed")??;
    if !valid {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    session.cycle_id().await?;
    bind_user(&session, user.id).await?;

    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok(Json(user.into()))
}

#[instrument(skip_all)]
pub async fn check_session(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(user.into())
}

#[instrument(skip_all)]
pub async fn logout(session: Session) -> AppResult<StatusCode> {
    unbind_user(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}
