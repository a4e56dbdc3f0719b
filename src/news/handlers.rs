use axum::{extract::State, Json};
use tracing::{instrument, warn};

use crate::{
    auth::{extractors::AuthUser, repo::User},
    error::ApiError,
    state::AppState,
};

/// Returns the caller's preference set, read fresh from the store. The
/// identity comes from the session only; no user field besides the
/// preferences leaves this handler.
#[instrument(skip(state, current))]
pub async fn categories(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
) -> Result<Json<Vec<String>>, ApiError> {
    let prefs = User::find_preferences(&state.db, current.id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| {
            warn!(user_id = %current.id, "preferences for unknown user");
            ApiError::NotFound
        })?;

    Ok(Json(prefs))
}
