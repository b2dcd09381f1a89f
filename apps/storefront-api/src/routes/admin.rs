//! Back-office endpoints. Access control sits in front of the service.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use storefront_core::{Order, OrderStatus};

use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
pub struct OrderFilter {
    pub status: Option<String>,
    pub limit: Option<u32>,
}

/// GET /api/admin/orders?status=paid&limit=50
pub async fn list_orders(
    State(state): State<AppState>,
    query: Result<Query<OrderFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<Order>>> {
    let Query(filter) = query?;

    let status = match filter.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<OrderStatus>()?),
    };
    let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    Ok(Json(state.db.orders().list(status, limit).await?))
}
