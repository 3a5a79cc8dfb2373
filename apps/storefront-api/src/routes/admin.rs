//! Admin back office. Every operation is re-checked against the caller's
//! role by the repositories.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use otherproteins_core::{require_admin, Category, NewProduct, Order, OrderStatus, Product};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StockRequest {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

pub async fn orders(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(query): ApiQuery<OrdersQuery>,
) -> ApiResult<Json<Vec<Order>>> {
    let status = match query.status.as_deref() {
        Some(s) if !s.is_empty() => Some(s.parse::<OrderStatus>()?),
        _ => None,
    };
    Ok(Json(state.db().orders().list_all(&actor, status).await?))
}

pub async fn advance_status(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> ApiResult<Json<Order>> {
    let order = state
        .db()
        .orders()
        .advance_status(&actor, id, req.status, Utc::now())
        .await?;
    Ok(Json(order))
}

pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(product): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let created = state.db().catalog().create_product(&actor, &product).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Renames and/or reprices. Both fields are validated before either is
/// written.
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<i64>,
    ApiJson(patch): ApiJson<ProductPatch>,
) -> ApiResult<Json<Product>> {
    require_admin(&actor, "update_product")?;

    if patch.name.is_none() && patch.price_cents.is_none() {
        return Err(ApiError::BadRequest("name or price_cents is required".to_string()));
    }

    let product = state
        .db()
        .catalog()
        .update_product(&actor, id, patch.name.as_deref(), patch.price_cents)
        .await?;
    Ok(Json(product))
}

pub async fn adjust_stock(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<StockRequest>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.db().catalog().adjust_stock(&actor, id, req.delta).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(req): ApiJson<CategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let category = state
        .db()
        .catalog()
        .create_category(&actor, &req.name, req.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}
