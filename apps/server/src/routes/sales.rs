//! Sales registration and voids.
//!
//! ## Registering a sale
//! ```text
//! POST /api/sales
//!      │
//!      ├── load: accounting state, products on the ticket, customer,
//!      │         business settings
//!      ├── shopdesk_core::sale::prepare_sale()   validate + price
//!      └── SaleRepository::record()              one transaction:
//!                                                receipt no., stock, invoice
//! ```

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{AdminUser, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;
use shopdesk_core::sale::{check_voidable, prepare_sale, SaleContext, SaleRequest};
use shopdesk_core::validation::validate_date_range;
use shopdesk_core::{CoreError, Invoice, Sale};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route("/:id", get(get_sale))
        .route("/:id/void", post(void_sale))
}

/// Date window by operational date. Both ends default to the current
/// operational day.
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRangeQuery {
    /// Resolves missing ends against `default` and validates the range.
    pub fn resolve(&self, default: NaiveDate) -> ApiResult<(NaiveDate, NaiveDate)> {
        let to = self.to.unwrap_or(default);
        let from = self.from.unwrap_or(to);
        validate_date_range(from, to).map_err(CoreError::from)?;
        Ok((from, to))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub sale: Sale,
    pub invoice: Option<Invoice>,
}

async fn list_sales(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> ApiResult<Json<Vec<Sale>>> {
    let accounting = state.db.accounting().get(state.today()).await?;
    let (from, to) = query.resolve(accounting.current_operational_date)?;
    Ok(Json(state.db.sales().list_between(from, to).await?))
}

async fn get_sale(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleResponse>> {
    let sale = state
        .db
        .sales()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", &id))?;
    let invoice = state.db.invoices().get_by_sale(&id).await?;
    Ok(Json(SaleResponse { sale, invoice }))
}

async fn create_sale(
    AuthUser(cashier): AuthUser,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SaleRequest>,
) -> ApiResult<(StatusCode, Json<SaleResponse>)> {
    let accounting = state.db.accounting().get(state.today()).await?;

    let ids: Vec<&str> = request.items.iter().map(|l| l.product_id.as_str()).collect();
    let products = state.db.products().get_many(&ids).await?;

    let customer = match request.customer_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(id) => Some(
            state
                .db
                .customers()
                .get_by_id(id)
                .await?
                .ok_or_else(|| ApiError::not_found("Customer", id))?,
        ),
        None => None,
    };

    let settings = state.db.settings().business().await?;

    let prepared = prepare_sale(
        &request,
        &products,
        &accounting,
        customer.as_ref(),
        &settings,
        SaleContext {
            sale_id: Uuid::new_v4().to_string(),
            invoice_id: Uuid::new_v4().to_string(),
            cashier_id: cashier.id.clone(),
            now: Utc::now(),
        },
    )?;

    let recorded = state.db.sales().record(prepared).await?;

    Ok((
        StatusCode::CREATED,
        Json(SaleResponse {
            sale: recorded.sale,
            invoice: recorded.invoice,
        }),
    ))
}

async fn void_sale(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleResponse>> {
    let sale = state
        .db
        .sales()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", &id))?;
    let accounting = state.db.accounting().get(state.today()).await?;
    let invoice = state.db.invoices().get_by_sale(&id).await?;

    check_voidable(&sale, &accounting, invoice.as_ref())?;

    let voided = state.db.sales().void(&id, Utc::now()).await?;
    let invoice = state.db.invoices().get_by_sale(&id).await?;

    Ok(Json(SaleResponse {
        sale: voided,
        invoice,
    }))
}
