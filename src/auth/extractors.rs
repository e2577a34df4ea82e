use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use tracing::{debug, warn};

use crate::{auth::repo_types::User, error::AppError, state::AppState};

/// Session key holding the authenticated user's id.
pub const USER_ID_KEY: &str = "user_id";

const UNAUTHORIZED: &str = "Unauthorized";

pub async fn bind_user(session: &Session, user_id: i64) -> Result<(), AppError> {
    session.insert(USER_ID_KEY, user_id).await?;
    Ok(())
}

pub async fn session_user_id(session: &Session) -> Result<Option<i64>, AppError> {
    Ok(session.get::<i64>(USER_ID_KEY).await?)
}

/// Drops the user binding by flushing the session from the store. A request
/// without a session is a no-op.
pub async fn unbind_user(session: &Session) -> Result<(), AppError> {
    session.flush().await?;
    Ok(())
}

/// Resolves the session cookie to a live user, or rejects with 401.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(status, msg)| {
                AppError::Internal(anyhow::anyhow!("session layer missing ({status}): {msg}"))
            })?;

        let Some(user_id) = session_user_id(&session).await? else {
            debug!("no user bound to session");
            return Err(AppError::Unauthorized(UNAUTHORIZED.into()));
        };

        match state.users.find_by_id(user_id).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => {
                warn!(user_id, "session references a missing user");
                Err(AppError::Unauthorized(UNAUTHORIZED.into()))
            }
        }
    }
}
