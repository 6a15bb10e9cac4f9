//! Full backup download and restore (admin only).
//!
//! Restoring replaces every table. The file is parsed and checked before
//! anything is touched, and the import runs in a single transaction.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::CONTENT_DISPOSITION;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use tracing::{info, warn};

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use shopdesk_core::backup::{BackupCounts, BackupData};

/// Backups carry the full sales history.
const MAX_BACKUP_BYTES: usize = 64 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(export).post(import))
        .layer(DefaultBodyLimit::max(MAX_BACKUP_BYTES))
}

async fn export(AdminUser(admin): AdminUser, State(state): State<AppState>) -> ApiResult<Response> {
    let now = Utc::now();
    let data = state.db.backup().export(now).await?;

    info!(by = %admin.username, "Backup downloaded");
    let filename = format!("shopdesk-backup-{}.json", now.format("%Y%m%d-%H%M%S"));
    Ok((
        [(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )],
        Json(data),
    )
        .into_response())
}

async fn import(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<BackupCounts>> {
    let data = BackupData::parse(&body)?;

    if !data.has_active_admin() {
        warn!(by = %admin.username, "Backup without an active admin refused");
        return Err(ApiError::BadRequest {
            code: "MALFORMED_BACKUP",
            message: "Backup has no active admin account".to_string(),
        });
    }

    let counts = state.db.backup().import(&data).await?;
    info!(by = %admin.username, ?counts, "Backup restored");
    Ok(Json(counts))
}
