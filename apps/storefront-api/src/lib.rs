//! # storefront-api: HTTP Surface of the Storefront
//!
//! Carts, checkout, order history, payment retry, and the payment
//! provider webhook over JSON.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP request                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  routes::build_router ──► handler ──► UserId (X-User-Id)               │
//! │                               │                                         │
//! │                               ▼                                         │
//! │                  AppState (Database, CheckoutService,                  │
//! │                  PaymentCoordinator, ReconciliationHandler)            │
//! │                               │                                         │
//! │                               ▼                                         │
//! │            Ok(Json)  or  ApiError ──► {code, message} + status         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - layered configuration (defaults, TOML, environment)
//! - [`state`] - shared handler state
//! - [`routes`] - router and handlers
//! - [`extract`] - caller identity
//! - [`error`] - error to HTTP mapping

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::build_router;
pub use state::{AppState, PaymentSettings};
