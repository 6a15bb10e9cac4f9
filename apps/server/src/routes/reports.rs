use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::routes::sales::DateRangeQuery;
use crate::state::AppState;
use shopdesk_core::report::{inventory_csv, sales_csv, InventoryReport, SalesReport};
use shopdesk_db::ProductFilter;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sales", get(sales_report))
        .route("/sales.csv", get(sales_export))
        .route("/inventory", get(inventory_report))
        .route("/inventory.csv", get(inventory_export))
}

fn csv_attachment(filename: &str, body: String) -> Response {
    (
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

async fn sales_report(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> ApiResult<Json<SalesReport>> {
    let (from, to) = query.resolve(state.today())?;
    let sales = state.db.sales().list_between(from, to).await?;
    Ok(Json(SalesReport::build(from, to, &sales)))
}

async fn sales_export(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> ApiResult<Response> {
    let (from, to) = query.resolve(state.today())?;
    let sales = state.db.sales().list_between(from, to).await?;
    let body = sales_csv(&sales)?;
    Ok(csv_attachment(&format!("sales_{}_{}.csv", from, to), body))
}

async fn inventory_report(
    _user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<InventoryReport>> {
    let products = state.db.products().list(ProductFilter::default()).await?;
    let settings = state.db.settings().business().await?;
    Ok(Json(InventoryReport::build(&products, settings.low_stock_threshold)))
}

async fn inventory_export(_user: AuthUser, State(state): State<AppState>) -> ApiResult<Response> {
    let products = state.db.products().list(ProductFilter::default()).await?;
    let body = inventory_csv(&products)?;
    Ok(csv_attachment(
        &format!("inventory_{}.csv", state.today()),
        body,
    ))
}
