//! Cart handlers. Each mutation answers with the refreshed cart view.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use otherproteins_core::{Actor, CartView, DeliveryMethod};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CartQuery {
    #[serde(default)]
    pub delivery: DeliveryMethod,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
}

async fn view(state: &AppState, actor: &Actor, delivery: DeliveryMethod) -> ApiResult<Json<CartView>> {
    let cart = state
        .db()
        .carts()
        .get_cart(actor, state.policy(), delivery)
        .await?;
    Ok(Json(cart))
}

pub async fn show(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(query): ApiQuery<CartQuery>,
) -> ApiResult<Json<CartView>> {
    view(&state, &actor, query.delivery).await
}

pub async fn add(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(req): ApiJson<AddItemRequest>,
) -> ApiResult<Json<CartView>> {
    state
        .db()
        .carts()
        .add_item(&actor, req.product_id, req.quantity)
        .await?;
    view(&state, &actor, DeliveryMethod::default()).await
}

pub async fn set_quantity(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(product_id): Path<i64>,
    ApiJson(req): ApiJson<SetQuantityRequest>,
) -> ApiResult<Json<CartView>> {
    state
        .db()
        .carts()
        .set_quantity(&actor, product_id, req.quantity)
        .await?;
    view(&state, &actor, DeliveryMethod::default()).await
}

pub async fn remove(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(product_id): Path<i64>,
) -> ApiResult<Json<CartView>> {
    state.db().carts().remove_item(&actor, product_id).await?;
    view(&state, &actor, DeliveryMethod::default()).await
}

pub async fn clear(State(state): State<AppState>, AuthUser(actor): AuthUser) -> ApiResult<StatusCode> {
    state.db().carts().clear(&actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
