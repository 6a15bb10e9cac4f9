use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use crate::auth::{AdminUser, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;
use shopdesk_core::validation::validate_business_settings;
use shopdesk_core::{BusinessSettings, CoreError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/business", get(get_business).put(put_business))
        .route("/app", get(get_app).put(put_app))
}

async fn get_business(_user: AuthUser, State(state): State<AppState>) -> ApiResult<Json<BusinessSettings>> {
    Ok(Json(state.db.settings().business().await?))
}

async fn put_business(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    ApiJson(settings): ApiJson<BusinessSettings>,
) -> ApiResult<Json<BusinessSettings>> {
    validate_business_settings(&settings).map_err(CoreError::from)?;
    state.db.settings().put_business(&settings).await?;

    info!(by = %admin.username, "Business settings saved");
    Ok(Json(settings))
}

async fn get_app(_user: AuthUser, State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    Ok(Json(state.db.settings().app().await?))
}

/// Client preferences, stored as given. Must be a JSON object.
async fn put_app(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    ApiJson(settings): ApiJson<serde_json::Value>,
) -> ApiResult<Json<serde_json::Value>> {
    if !settings.is_object() {
        return Err(ApiError::bad_request("App settings must be a JSON object"));
    }
    state.db.settings().put_app(&settings).await?;

    info!(by = %admin.username, "App settings saved");
    Ok(Json(settings))
}
