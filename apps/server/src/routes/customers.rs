use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;
use shopdesk_core::catalog::{apply_customer_update, build_customer, CustomerInput};
use shopdesk_core::Customer;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route(
            "/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerQuery {
    pub search: Option<String>,
}

async fn load(state: &AppState, id: &str) -> ApiResult<Customer> {
    state
        .db
        .customers()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer", id))
}

async fn list_customers(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CustomerQuery>,
) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.db.customers().list(query.search.as_deref()).await?))
}

async fn get_customer(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    Ok(Json(load(&state, &id).await?))
}

async fn create_customer(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CustomerInput>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let customer = build_customer(input, Uuid::new_v4().to_string(), Utc::now())?;
    state.db.customers().insert(&customer).await?;

    info!(customer_id = %customer.id, "Customer created");
    Ok((StatusCode::CREATED, Json(customer)))
}

async fn update_customer(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<CustomerInput>,
) -> ApiResult<Json<Customer>> {
    let current = load(&state, &id).await?;
    let updated = apply_customer_update(&current, input, Utc::now())?;
    state.db.customers().update(&updated).await?;
    Ok(Json(updated))
}

async fn delete_customer(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.customers().delete(&id).await?;
    info!(customer_id = %id, "Customer deleted");
    Ok(StatusCode::NO_CONTENT)
}
