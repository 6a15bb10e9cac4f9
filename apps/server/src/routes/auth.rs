//! Sign-in.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{verify_password, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;
use shopdesk_core::User;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: User,
}

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    // Same answer for unknown user, wrong password and disabled account.
    let rejected = || ApiError::Unauthenticated("Invalid username or password".to_string());

    let Some(creds) = state.db.users().get_credentials(&req.username).await? else {
        warn!(username = %req.username, "Login for unknown user");
        return Err(rejected());
    };

    if !creds.user.is_active || !verify_password(&req.password, &creds.password_hash) {
        warn!(username = %creds.user.username, "Login rejected");
        return Err(rejected());
    }

    let token = state.jwt.issue(&creds.user)?;
    info!(user_id = %creds.user.id, role = %creds.user.role, "User signed in");

    Ok(Json(LoginResponse {
        token,
        expires_in: state.jwt.lifetime_secs(),
        user: creds.user,
    }))
}

async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}
