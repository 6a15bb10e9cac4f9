//! User administration (admin only).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::{hash_password, AdminUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;
use shopdesk_core::validation::{validate_password, validate_person_name, validate_username};
use shopdesk_core::{CoreError, Role, User};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", delete(delete_user))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub display_name: Option<String>,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Cashier
}

async fn list_users(_admin: AdminUser, State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.db.users().list().await?))
}

async fn create_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    validate_username(&req.username).map_err(CoreError::from)?;
    validate_password(&req.password).map_err(CoreError::from)?;

    let username = req.username.trim().to_string();
    let display_name = req
        .display_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| username.clone());
    validate_person_name(&display_name).map_err(CoreError::from)?;

    let user = User {
        id: Uuid::new_v4().to_string(),
        username,
        display_name,
        role: req.role,
        is_active: true,
        created_at: Utc::now(),
    };
    let hash = hash_password(&req.password)?;
    state.db.users().insert(&user, &hash).await?;

    info!(user_id = %user.id, username = %user.username, role = %user.role, by = %admin.username, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn delete_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if admin.id == id {
        return Err(ApiError::conflict(
            "CANNOT_DELETE_SELF",
            "You cannot delete your own account",
        ));
    }

    state.db.users().delete(&id).await?;
    info!(user_id = %id, by = %admin.username, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
