//! Payment provider webhooks.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use storefront_payments::{PaymentError, ReconcileOutcome};

use crate::error::ApiResult;
use crate::state::AppState;

/// Header carrying `t=...,v1=...`.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /api/webhooks/payments
///
/// Takes the raw body: the signature covers the exact bytes sent.
pub async fn payment_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ReconcileOutcome>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| PaymentError::InvalidSignature("missing signature header".to_string()))?;

    let outcome = state.reconciliation.handle_event(&body, signature).await?;
    Ok(Json(outcome))
}
