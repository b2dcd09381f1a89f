//! # API Errors
//!
//! Maps library errors to HTTP responses.
//!
//! ## Status Mapping
//! ```text
//! ┌──────────────────────────────────────┬────────┬───────────────────────────┐
//! │ Error                                │ Status │ code                      │
//! ├──────────────────────────────────────┼────────┼───────────────────────────┤
//! │ NotFound                             │  404   │ NOT_FOUND                 │
//! │ ItemNotFound                         │  404   │ ITEM_NOT_FOUND            │
//! │ Validation, bad JSON, CartTooLarge   │  400   │ VALIDATION_ERROR          │
//! │ EmptyCart                            │  400   │ EMPTY_CART                │
//! │ InsufficientStock                    │  409   │ INSUFFICIENT_STOCK        │
//! │ InvalidOrderStatus                   │  409   │ INVALID_ORDER_STATUS      │
//! │ UNIQUE / FK / CHECK violation        │  409   │ CONFLICT                  │
//! │ ConcurrencyConflict, PoolExhausted   │  503   │ CONCURRENCY_CONFLICT      │
//! │ Gateway, Timeout                     │  502   │ PAYMENT_GATEWAY_ERROR     │
//! │ InvalidSignature                     │  400   │ INVALID_SIGNATURE         │
//! │ MalformedEvent                       │  400   │ MALFORMED_EVENT           │
//! │ missing X-User-Id                    │  401   │ UNAUTHENTICATED           │
//! │ anything else                        │  500   │ INTERNAL_ERROR            │
//! └──────────────────────────────────────┴────────┴───────────────────────────┘
//! ```
//!
//! Body: `{"code": "INSUFFICIENT_STOCK", "message": "..."}`. Internal errors
//! are logged and answered with a generic message. When checkout placed an
//! order but could not start its payment, the body also carries `orderId`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use storefront_core::{CoreError, ValidationError};
use storefront_db::DbError;
use storefront_payments::PaymentError;

/// Result type alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ItemNotFound,
    ValidationError,
    EmptyCart,
    InsufficientStock,
    InvalidOrderStatus,
    Conflict,
    ConcurrencyConflict,
    PaymentGatewayError,
    InvalidSignature,
    MalformedEvent,
    Unauthenticated,
    InternalError,
}

impl ErrorCode {
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound | ErrorCode::ItemNotFound => StatusCode::NOT_FOUND,

            ErrorCode::ValidationError
            | ErrorCode::EmptyCart
            | ErrorCode::InvalidSignature
            | ErrorCode::MalformedEvent => StatusCode::BAD_REQUEST,

            ErrorCode::InsufficientStock
            | ErrorCode::InvalidOrderStatus
            | ErrorCode::Conflict => StatusCode::CONFLICT,

            ErrorCode::ConcurrencyConflict => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::PaymentGatewayError => StatusCode::BAD_GATEWAY,
            ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    /// Order left PENDING by a checkout whose payment never started.
    #[serde(rename = "orderId", default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

/// Errors returned by handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request did not carry a usable identity.
    #[error("{0}")]
    Unauthenticated(String),

    /// The request body or query could not be decoded.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl ApiError {
    /// Classifies the error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Unauthenticated(_) => ErrorCode::Unauthenticated,
            ApiError::BadRequest(_) => ErrorCode::ValidationError,
            ApiError::Payment(err) => payment_code(err),
        }
    }

    /// The order a failed request still created, if any.
    pub fn order_id(&self) -> Option<&str> {
        match self {
            ApiError::Payment(err) => err.order_id(),
            _ => None,
        }
    }
}

fn payment_code(err: &PaymentError) -> ErrorCode {
    match err {
        PaymentError::Gateway(_) | PaymentError::Timeout(_) => ErrorCode::PaymentGatewayError,
        PaymentError::InvalidSignature(_) => ErrorCode::InvalidSignature,
        PaymentError::MalformedEvent(_) => ErrorCode::MalformedEvent,
        PaymentError::InvalidConfig(_) => ErrorCode::InternalError,
        PaymentError::Database(err) => db_code(err),
        PaymentError::PaymentNotStarted { source, .. } => payment_code(source),
    }
}

fn db_code(err: &DbError) -> ErrorCode {
    match err {
        DbError::Domain(err) => core_code(err),
        DbError::NotFound { .. } => ErrorCode::NotFound,
        DbError::ConcurrencyConflict(_) | DbError::PoolExhausted => {
            ErrorCode::ConcurrencyConflict
        }
        DbError::UniqueViolation(_)
        | DbError::ForeignKeyViolation(_)
        | DbError::CheckViolation(_) => ErrorCode::Conflict,
        _ => ErrorCode::InternalError,
    }
}

fn core_code(err: &CoreError) -> ErrorCode {
    match err {
        CoreError::NotFound { .. } => ErrorCode::NotFound,
        CoreError::ItemNotFound { .. } => ErrorCode::ItemNotFound,
        CoreError::EmptyCart => ErrorCode::EmptyCart,
        CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
        CoreError::InvalidOrderStatus { .. } => ErrorCode::InvalidOrderStatus,
        CoreError::CartTooLarge { .. }
        | CoreError::AmountOverflow { .. }
        | CoreError::Validation(_) => ErrorCode::ValidationError,
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        ApiError::Payment(PaymentError::Database(err))
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Payment(err.into())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Payment(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        let order_id = self.order_id().map(str::to_string);
        let message = if code == ErrorCode::InternalError {
            error!(error = %self, "Internal error while handling request");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (
            code.http_status(),
            Json(ErrorBody {
                code,
                message,
                order_id,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::OrderStatus;

    #[test]
    fn test_domain_statuses() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (CoreError::not_found("Order", "o-1").into(), StatusCode::NOT_FOUND),
            (
                CoreError::ItemNotFound {
                    product_id: "p-1".into(),
                }
                .into(),
                StatusCode::NOT_FOUND,
            ),
            (CoreError::EmptyCart.into(), StatusCode::BAD_REQUEST),
            (
                CoreError::InsufficientStock {
                    product_id: "p-1".into(),
                    product_name: "Mug".into(),
                    available: 1,
                    requested: 2,
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (
                CoreError::InvalidOrderStatus {
                    order_id: "o-1".into(),
                    current: OrderStatus::Paid,
                    operation: "request payment".into(),
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (
                ValidationError::Required {
                    field: "shipping_address".into(),
                }
                .into(),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.code().http_status(), status, "{:?}", err);
        }
    }

    #[test]
    fn test_infrastructure_statuses() {
        let conflict: ApiError = DbError::ConcurrencyConflict("locked".into()).into();
        assert_eq!(conflict.code(), ErrorCode::ConcurrencyConflict);
        assert_eq!(conflict.code().http_status(), StatusCode::SERVICE_UNAVAILABLE);

        let gateway = ApiError::Payment(PaymentError::Timeout(10));
        assert_eq!(gateway.code().http_status(), StatusCode::BAD_GATEWAY);

        let signature = ApiError::Payment(PaymentError::InvalidSignature("mismatch".into()));
        assert_eq!(signature.code().http_status(), StatusCode::BAD_REQUEST);

        let storage: ApiError = DbError::QueryFailed("disk I/O error".into()).into();
        assert_eq!(storage.code(), ErrorCode::InternalError);
    }

    #[test]
    fn test_unstarted_payment_keeps_gateway_status() {
        let err = ApiError::Payment(PaymentError::PaymentNotStarted {
            order_id: "o-7".into(),
            source: Box::new(PaymentError::Timeout(10)),
        });
        assert_eq!(err.code(), ErrorCode::PaymentGatewayError);
        assert_eq!(err.code().http_status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.order_id(), Some("o-7"));

        let plain = ApiError::Payment(PaymentError::Timeout(10));
        assert_eq!(plain.order_id(), None);
    }

    #[test]
    fn test_order_id_omitted_when_absent() {
        let body = ErrorBody {
            code: ErrorCode::EmptyCart,
            message: "Cart is empty".into(),
            order_id: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("orderId").is_none());

        let body = ErrorBody {
            order_id: Some("o-7".into()),
            ..body
        };
        assert_eq!(serde_json::to_value(&body).unwrap()["orderId"], "o-7");
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
        let json = serde_json::to_string(&ErrorCode::PaymentGatewayError).unwrap();
        assert_eq!(json, "\"PAYMENT_GATEWAY_ERROR\"");
    }
}
