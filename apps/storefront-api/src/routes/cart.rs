//! Cart endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use storefront_core::Cart;

use crate::error::ApiResult;
use crate::extract::UserId;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// GET /api/cart
pub async fn get_cart(State(state): State<AppState>, UserId(user): UserId) -> ApiResult<Json<Cart>> {
    Ok(Json(state.db.carts().get_cart(&user).await?))
}

/// POST /api/cart/items
pub async fn add_item(
    State(state): State<AppState>,
    UserId(user): UserId,
    body: Result<Json<AddItemRequest>, JsonRejection>,
) -> ApiResult<Json<Cart>> {
    let Json(req) = body?;
    let cart = state
        .db
        .carts()
        .add_item(&user, &req.product_id, req.quantity)
        .await?;
    Ok(Json(cart))
}

/// PUT /api/cart/items/{productId}
pub async fn update_quantity(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(product_id): Path<String>,
    body: Result<Json<UpdateQuantityRequest>, JsonRejection>,
) -> ApiResult<Json<Cart>> {
    let Json(req) = body?;
    let cart = state
        .db
        .carts()
        .update_quantity(&user, &product_id, req.quantity)
        .await?;
    Ok(Json(cart))
}

/// DELETE /api/cart/items/{productId}
pub async fn remove_item(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(product_id): Path<String>,
) -> ApiResult<Json<Cart>> {
    Ok(Json(state.db.carts().remove_item(&user, &product_id).await?))
}

/// DELETE /api/cart
pub async fn clear_cart(
    State(state): State<AppState>,
    UserId(user): UserId,
) -> ApiResult<StatusCode> {
    state.db.carts().clear(&user).await?;
    Ok(StatusCode::NO_CONTENT)
}
