use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;
use shopdesk_core::order::{build_order, check_deletable, transition, NewOrder, OrderStatusUpdate};
use shopdesk_core::{Order, OrderStatus};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order).delete(delete_order))
        .route("/:id/status", patch(update_status))
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
}

async fn load(state: &AppState, id: &str) -> ApiResult<Order> {
    state
        .db
        .orders()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", id))
}

async fn list_orders(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.db.orders().list(query.status).await?))
}

async fn get_order(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    Ok(Json(load(&state, &id).await?))
}

async fn create_order(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewOrder>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    if let Some(customer_id) = input.customer_id.as_deref().filter(|s| !s.trim().is_empty()) {
        if state.db.customers().get_by_id(customer_id).await?.is_none() {
            return Err(ApiError::not_found("Customer", customer_id));
        }
    }

    let ids: Vec<&str> = input.items.iter().map(|l| l.product_id.as_str()).collect();
    let products = state.db.products().get_many(&ids).await?;

    let order = build_order(input, &products, Uuid::new_v4().to_string(), Utc::now())?;
    let order = state.db.orders().insert(&order).await?;

    Ok((StatusCode::CREATED, Json(order)))
}

async fn update_status(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<OrderStatusUpdate>,
) -> ApiResult<Json<Order>> {
    let current = load(&state, &id).await?;
    let updated = transition(&current, body.status, Utc::now())?;
    state.db.orders().update_status(&updated, current.status).await?;

    Ok(Json(updated))
}

async fn delete_order(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let order = load(&state, &id).await?;
    check_deletable(&order)?;
    state.db.orders().delete(&id).await?;

    info!(order_id = %id, number = %order.order_number, "Order deleted");
    Ok(StatusCode::NO_CONTENT)
}
