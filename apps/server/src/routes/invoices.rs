//! Accounts receivable.
//!
//! Stored statuses lag behind the calendar, so every read first promotes
//! pending invoices past their due date to overdue.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;
use shopdesk_core::invoice::{apply_payment, InvoicePaymentRequest, ReceivablesSummary};
use shopdesk_core::validation::normalize_optional;
use shopdesk_core::{CoreError, Invoice, InvoicePaymentRecord, InvoiceStatus};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_invoices))
        .route("/summary", get(summary))
        .route("/:id", get(get_invoice))
        .route("/:id/payments", post(record_payment))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceQuery {
    pub status: Option<InvoiceStatus>,
    pub customer_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub payments: Vec<InvoicePaymentRecord>,
}

async fn list_invoices(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<InvoiceQuery>,
) -> ApiResult<Json<Vec<Invoice>>> {
    let invoices = state.db.invoices();
    invoices.refresh_overdue(state.today()).await?;
    Ok(Json(
        invoices
            .list(query.status, query.customer_id.as_deref())
            .await?,
    ))
}

async fn summary(_user: AuthUser, State(state): State<AppState>) -> ApiResult<Json<ReceivablesSummary>> {
    let today = state.today();
    let invoices = state.db.invoices();
    invoices.refresh_overdue(today).await?;

    let all = invoices.list_all().await?;
    Ok(Json(ReceivablesSummary::build(&all, today)))
}

async fn get_invoice(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<InvoiceDetail>> {
    let invoices = state.db.invoices();
    invoices.refresh_overdue(state.today()).await?;

    let invoice = invoices
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Invoice", &id))?;
    let payments = invoices.payments_for(&id).await?;
    Ok(Json(InvoiceDetail { invoice, payments }))
}

/// Books a payment on the open operational day.
async fn record_payment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<InvoicePaymentRequest>,
) -> ApiResult<(StatusCode, Json<InvoiceDetail>)> {
    request.validate()?;

    let today = state.today();
    let accounting = state.db.accounting().get(today).await?;
    if !accounting.is_day_open {
        return Err(CoreError::DayClosed.into());
    }

    let invoices = state.db.invoices();
    let invoice = invoices
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Invoice", &id))?;

    let now = Utc::now();
    let updated = apply_payment(&invoice, request.amount_cents, today, now)?;

    let payment = InvoicePaymentRecord {
        id: Uuid::new_v4().to_string(),
        invoice_id: invoice.id.clone(),
        amount_cents: request.amount_cents,
        method: request.method,
        operational_date: accounting.current_operational_date,
        paid_at: now,
        recorded_by: user.id.clone(),
        notes: normalize_optional(request.notes),
    };
    invoices
        .record_payment(&updated, invoice.paid_cents, &payment)
        .await?;

    let payments = invoices.payments_for(&id).await?;
    Ok((
        StatusCode::CREATED,
        Json(InvoiceDetail {
            invoice: updated,
            payments,
        }),
    ))
}
