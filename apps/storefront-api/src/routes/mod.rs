//! # HTTP Routes
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GET    /health                                                        │
//! │                                                                         │
//! │  X-User-Id required                                                    │
//! │  GET    /api/cart                         cart contents                │
//! │  POST   /api/cart/items                   {productId, quantity}        │
//! │  PUT    /api/cart/items/{productId}       {quantity}                   │
//! │  DELETE /api/cart/items/{productId}                                    │
//! │  DELETE /api/cart                                                      │
//! │  POST   /api/orders/checkout              {shippingAddress}            │
//! │  GET    /api/orders                                                    │
//! │  GET    /api/orders/{orderId}                                          │
//! │  POST   /api/orders/{orderId}/payment     new payment intent           │
//! │                                                                         │
//! │  GET    /api/admin/orders?status=&limit=                               │
//! │  POST   /api/webhooks/payments            signed provider events       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod admin;
pub mod cart;
pub mod health;
pub mod orders;
pub mod webhooks;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    let cart = Router::new()
        .route("/api/cart", get(cart::get_cart).delete(cart::clear_cart))
        .route("/api/cart/items", post(cart::add_item))
        .route(
            "/api/cart/items/{product_id}",
            put(cart::update_quantity).delete(cart::remove_item),
        );

    let orders = Router::new()
        .route("/api/orders", get(orders::list_orders))
        .route("/api/orders/checkout", post(orders::checkout))
        .route("/api/orders/{order_id}", get(orders::get_order))
        .route("/api/orders/{order_id}/payment", post(orders::request_payment));

    let admin = Router::new().route("/api/admin/orders", get(admin::list_orders));

    let webhooks = Router::new().route("/api/webhooks/payments", post(webhooks::payment_event));

    Router::new()
        .route("/health", get(health::health))
        .merge(cart)
        .merge(orders)
        .merge(admin)
        .merge(webhooks)
        .with_state(state)
}
