//! Operational day: open, live summary, close with cash count.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;
use shopdesk_core::accounting::{
    close_day, open_day, summarize_day, CashCount, CloseDayRequest, DaySummary, OpenDayRequest,
};
use shopdesk_core::{AccountingSettings, ClosureDetails, CoreError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_state))
        .route("/open", post(open))
        .route("/close", post(close))
        .route("/summary", get(summary))
        .route("/closures", get(closures))
}

#[derive(Debug, Default, Deserialize)]
pub struct ClosuresQuery {
    pub limit: Option<i64>,
}

async fn get_state(_user: AuthUser, State(state): State<AppState>) -> ApiResult<Json<AccountingSettings>> {
    Ok(Json(state.db.accounting().get(state.today()).await?))
}

async fn open(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<OpenDayRequest>,
) -> ApiResult<Json<AccountingSettings>> {
    let today = state.today();
    let current = state.db.accounting().get(today).await?;

    let opened = open_day(&current, &request, &user.username, today, Utc::now())?;
    state.db.accounting().open_day(&opened).await?;
    Ok(Json(opened))
}

/// Totals of the current operational date so far.
async fn summarize_current(state: &AppState) -> ApiResult<DaySummary> {
    let current = state.db.accounting().get(state.today()).await?;
    let date = current.current_operational_date;

    let sales = state.db.sales().list_between(date, date).await?;
    let payments = state.db.invoices().payments_on(date).await?;
    Ok(summarize_day(date, current.opening_cash_cents, &sales, &payments))
}

async fn summary(_user: AuthUser, State(state): State<AppState>) -> ApiResult<Json<DaySummary>> {
    Ok(Json(summarize_current(&state).await?))
}

/// Closes the day. The summary is taken inside the closing transaction, so a
/// sale booked while the cash was being counted still lands in it.
async fn close(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CloseDayRequest>,
) -> ApiResult<Json<ClosureDetails>> {
    let current = state.db.accounting().get(state.today()).await?;
    if !current.is_day_open {
        return Err(CoreError::DayClosed.into());
    }

    let count = CashCount::new(request.cash_breakdown)?;
    let date = current.current_operational_date;
    let closure = state
        .db
        .accounting()
        .close_day(date, |sales, payments| -> ApiResult<ClosureDetails> {
            let summary = summarize_day(date, current.opening_cash_cents, sales, payments);
            let (_, closure) = close_day(&current, &summary, count, &user.username, request.notes, Utc::now())?;
            Ok(closure)
        })
        .await?;

    Ok(Json(closure))
}

async fn closures(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ClosuresQuery>,
) -> ApiResult<Json<Vec<ClosureDetails>>> {
    Ok(Json(state.db.accounting().closures(query.limit).await?))
}
