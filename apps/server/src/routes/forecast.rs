use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Duration;
use serde::Deserialize;
use tracing::debug;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::state::AppState;
use shopdesk_core::forecast::{forecast_sales, SalesForecast};
use shopdesk_db::ProductFilter;

/// How far back the model looks.
const HISTORY_WINDOW_DAYS: i64 = 180;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_forecast))
}

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_days() -> u32 {
    7
}

async fn get_forecast(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ForecastQuery>,
) -> ApiResult<Json<SalesForecast>> {
    let today = state.today();
    let from = today - Duration::days(HISTORY_WINDOW_DAYS);

    let sales = state.db.sales().list_between(from, today).await?;
    let products = state.db.products().list(ProductFilter::default()).await?;
    debug!(sales = sales.len(), horizon = query.days, "Building forecast");

    Ok(Json(forecast_sales(&sales, &products, query.days, today)?))
}
