//! Order endpoints: checkout, history, payment retry.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use storefront_core::Order;
use storefront_payments::PaymentSession;

use crate::error::ApiResult;
use crate::extract::UserId;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub shipping_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order_id: String,
    pub payment_client_secret: String,
    pub order: Order,
}

/// POST /api/orders/checkout
pub async fn checkout(
    State(state): State<AppState>,
    UserId(user): UserId,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CheckoutResponse>)> {
    let Json(req) = body?;
    let receipt = state.checkout.checkout(&user, &req.shipping_address).await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order_id: receipt.order.id.clone(),
            payment_client_secret: receipt.payment.client_secret,
            order: receipt.order,
        }),
    ))
}

/// GET /api/orders
pub async fn list_orders(
    State(state): State<AppState>,
    UserId(user): UserId,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.db.orders().list_for_user(&user).await?))
}

/// GET /api/orders/{orderId}
pub async fn get_order(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(order_id): Path<String>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.db.orders().get_for_user(&order_id, &user).await?))
}

/// POST /api/orders/{orderId}/payment
pub async fn request_payment(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(order_id): Path<String>,
) -> ApiResult<Json<PaymentSession>> {
    Ok(Json(state.payments.request_payment(&user, &order_id).await?))
}
