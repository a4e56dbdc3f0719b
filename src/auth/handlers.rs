use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MessageResponse, PreferencesRequest, RegisterRequest},
        extractors::{AuthUser, SESSION_COOKIE},
        repo::{is_unique_violation, User},
        services::{hash_password, is_valid_email, verify_password, JwtKeys},
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/preferences/:email", post(update_preferences))
}

/// Session cookie as the browser should hold it: HttpOnly, strict same-site,
/// Secure on production transport. No max-age, so the browser keeps it for
/// the session and the token's own expiry bounds its life.
pub(crate) fn session_cookie(token: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .build()
}

#[instrument(skip(state, jar, payload))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }

    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::BadRequest("Password too short".into()));
    }

    // Friendly duplicate check; the unique index on email is what actually
    // holds the invariant under concurrent registration.
    if User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(ApiError::internal)?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict);
    }

    let hash = hash_password(&payload.password).map_err(ApiError::internal)?;

    let user = match User::create(&state.db, &payload.name, &payload.email, &hash).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %payload.email, "email registered concurrently");
            return Err(ApiError::Conflict);
        }
        Err(e) => return Err(ApiError::internal(e)),
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id).map_err(ApiError::internal)?;
    let jar = jar.add(session_cookie(&token, state.config.production));

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            success: true,
            message: "User registered successfully".into(),
            token,
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }

    // Unknown email and wrong password take the same exit.
    let user = User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::InvalidCredentials
        })?;

    let ok = verify_password(&payload.password, &user.password_hash).map_err(ApiError::internal)?;
    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id).map_err(ApiError::internal)?;
    let jar = jar.add(session_cookie(&token, state.config.production));

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            message: "Login successful".into(),
            token,
        }),
    ))
}

/// Clears the session cookie and nothing else. The token itself stays valid
/// until expiry; there is no server-side revocation.
#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (
        jar,
        Json(MessageResponse {
            success: true,
            message: "Logged out successfully".into(),
        }),
    )
}

#[instrument(skip(state, current, payload))]
pub async fn update_preferences(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Path(email): Path<String>,
    Json(payload): Json<PreferencesRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = email.trim().to_lowercase();

    // The caller may only rewrite their own preference set.
    if current.email != email {
        warn!(user_id = %current.id, target = %email, "preference update for another account");
        return Err(ApiError::Forbidden);
    }

    let updated = User::update_preferences(&state.db, &email, &payload.news_preferences)
        .await
        .map_err(ApiError::internal)?;

    let Some(user) = updated else {
        warn!(email = %email, "preference update for unknown email");
        return Err(ApiError::NotFound);
    };

    info!(user_id = %user.id, count = user.news_preferences.len(), "news preferences updated");
    Ok(Json(MessageResponse {
        success: true,
        message: "News preferences updated successfully".into(),
    }))
}
