//! Product catalog.
//!
//! Open to unauthenticated clients, like the rest of the catalog surface the
//! storefront reads from.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;
use shopdesk_core::catalog::{apply_patch, apply_update, build_product, NewProduct, ProductPatch, ProductUpdate};
use shopdesk_core::validation::validate_stock_delta;
use shopdesk_core::{CoreError, Product};
use shopdesk_db::{ProductFilter, StockChange};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/categories", get(list_categories))
        .route(
            "/:id",
            get(get_product)
                .put(update_product)
                .patch(patch_product)
                .delete(delete_product),
        )
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

async fn load(state: &AppState, id: &str) -> ApiResult<Product> {
    state
        .db
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))
}

async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    let filter = ProductFilter {
        category: query.category,
        search: query.search,
    };
    Ok(Json(state.db.products().list(filter).await?))
}

async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.db.products().categories().await?))
}

async fn get_product(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Product>> {
    Ok(Json(load(&state, &id).await?))
}

async fn create_product(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = build_product(input, Uuid::new_v4().to_string(), Utc::now())?;
    state.db.products().insert(&product).await?;

    info!(product_id = %product.id, name = %product.name, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<ProductUpdate>,
) -> ApiResult<Json<Product>> {
    let current = load(&state, &id).await?;
    let updated = apply_update(&current, input, Utc::now())?;
    state.db.products().update(&updated).await?;
    Ok(Json(updated))
}

/// Partial update. The edited fields and any stock change are saved in one
/// transaction; a `stockDelta` is added in the database so a concurrent sale
/// is never overwritten.
async fn patch_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(mut patch): ApiJson<ProductPatch>,
) -> ApiResult<Json<Product>> {
    if patch.is_empty() {
        return Err(ApiError::bad_request("Nothing to update"));
    }

    let current = load(&state, &id).await?;
    // A lone delta is checked against the stored level by the database, not
    // against the copy just read.
    let stock = match (patch.stock, patch.stock_delta) {
        (Some(_), _) => StockChange::Set,
        (None, Some(delta)) => {
            validate_stock_delta(delta).map_err(CoreError::from)?;
            patch.stock_delta = None;
            StockChange::Adjust(delta)
        }
        (None, None) => StockChange::Keep,
    };

    let updated = apply_patch(&current, patch, Utc::now())?;
    let saved = state.db.products().patch(&updated, stock).await?;

    if stock != StockChange::Keep {
        info!(product_id = %id, stock = saved.stock, "Stock adjusted");
    }

    Ok(Json(saved))
}

async fn delete_product(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.db.products().delete(&id).await?;
    info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
