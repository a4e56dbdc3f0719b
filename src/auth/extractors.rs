use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use tracing::warn;

use crate::auth::repo::User;
use crate::auth::services::JwtKeys;
use crate::error::ApiError;
use crate::state::AppState;

/// Name of the transport cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Session gate: reads the session cookie, verifies the token and resolves
/// it to a stored user. Every failure mode collapses to a 401, so a caller
/// cannot tell a bad signature from a vanished user.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .ok_or(ApiError::Unauthorized)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(&token).map_err(|e| {
            warn!(error = %e, "session token rejected");
            ApiError::Unauthorized
        })?;

        // The token may outlive the account; a store miss or store failure
        // both end the session here.
        let user = User::find_by_id(&state.db, claims.sub)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id = %claims.sub, "user lookup failed");
                ApiError::Unauthorized
            })?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "session for unknown user");
                ApiError::Unauthorized
            })?;

        Ok(AuthUser(user))
    }
}
