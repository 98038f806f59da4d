//! HTTP surface
//!
//! Thin axum handlers over [`PaymentHighwayGateway`]. The storefront owns
//! sessions; the logged-in customer arrives in the `x-user-id` header and
//! customer notices leave in the `x-payment-notices` header. Vendor return
//! redirects are picked up on any path by [`callbacks::dispatch_callbacks`].

pub mod callbacks;
pub mod checkout;
pub mod health;

use axum::{
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::config::Config;
use crate::error::GatewayError;
use crate::payments::{CallbackDispatcher, PaymentHighwayGateway, WorkflowContext};

pub const USER_HEADER: &str = "x-user-id";
pub const NOTICES_HEADER: &str = "x-payment-notices";

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub gateway: Arc<PaymentHighwayGateway>,
    pub dispatcher: Arc<CallbackDispatcher>,
    #[cfg(feature = "database")]
    pub pool: Option<sqlx::PgPool>,
}

/// Routes, with the callback dispatcher in front of every path including
/// the fallback
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/payment-highway/return", get(callbacks::handle_return))
        .route("/orders/:order_id/payment", post(checkout::process_payment))
        .route("/orders/:order_id/refund", post(checkout::refund))
        .route("/account/add-card", get(checkout::add_card))
        .fallback(callbacks::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            callbacks::dispatch_callbacks,
        ))
        .with_state(state)
}

/// Request context from the storefront's headers
pub fn workflow_context(headers: &HeaderMap) -> WorkflowContext {
    match headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        Some(user_id) => WorkflowContext::for_user(user_id),
        None => WorkflowContext::guest(),
    }
}

/// Attach pending notices to a response
pub fn with_notices(mut response: Response, ctx: &mut WorkflowContext) -> Response {
    let notices = ctx.take_notices();
    if notices.is_empty() {
        return response;
    }
    match serde_json::to_string(&notices)
        .ok()
        .and_then(|json| HeaderValue::from_str(&json).ok())
    {
        Some(value) => {
            response.headers_mut().insert(NOTICES_HEADER, value);
        }
        None => error!("Failed to encode {} customer notices", notices.len()),
    }
    response
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Gateway error as an HTTP response
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            GatewayError::OrderNotFound { .. } | GatewayError::TokenNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            GatewayError::AlreadyPaid { .. } | GatewayError::TransactionIdConflict { .. } => {
                StatusCode::CONFLICT
            }
            GatewayError::SignatureInvalid | GatewayError::InvalidInput { .. } => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::PolicyRejected => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::PreconditionFailed { .. } => StatusCode::PRECONDITION_FAILED,
            GatewayError::VendorRejected { .. } => StatusCode::PAYMENT_REQUIRED,
            GatewayError::VendorUnreachable { .. } | GatewayError::MalformedResponse { .. } => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::Configuration { .. } | GatewayError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.0.affects_money_movement() {
            error!("Payment step failed, manual reconciliation may be needed: {}", self.0);
        }
        // Internal detail stays in the log
        let message = if status.is_server_error() {
            error!("Request failed: {}", self.0);
            status
                .canonical_reason()
                .unwrap_or("Internal error")
                .to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
