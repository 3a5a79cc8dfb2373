//! Checkout, order history, cancellation and invoices.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

use otherproteins_core::invoice::{invoice_number, render_invoice};
use otherproteins_core::{CheckoutRequest, Order, OrderDetail};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

pub async fn checkout(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(req): ApiJson<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<OrderDetail>)> {
    let detail = state
        .db()
        .orders()
        .checkout(&actor, &req, state.policy(), Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn index(State(state): State<AppState>, AuthUser(actor): AuthUser) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.db().orders().list_for_user(&actor).await?))
}

pub async fn show(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<OrderDetail>> {
    Ok(Json(state.db().orders().get(&actor, id).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<OrderDetail>> {
    let detail = state
        .db()
        .orders()
        .cancel(&actor, id, state.policy(), Utc::now())
        .await?;
    Ok(Json(detail))
}

/// PDF invoice for an order the caller may see.
pub async fn invoice(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let detail = state.db().orders().get(&actor, id).await?;
    let customer = state.db().users().get_by_id(detail.order.user_id).await?;

    let pdf = render_invoice(state.store(), &detail, &customer.profile(), Utc::now());
    let disposition = format!("inline; filename=\"{}.pdf\"", invoice_number(&detail.order));

    tracing::debug!(order_id = id, bytes = pdf.len(), "Invoice rendered");
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}
