//! Checkout, saved-card and refund endpoints

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{with_notices, workflow_context, ApiError, AppState};
use crate::payments::types::PaymentSource;

#[derive(Debug, Default, Deserialize)]
pub struct PaymentRequest {
    /// Saved card to charge; a new card is entered on the hosted form otherwise
    pub token_id: Option<Uuid>,
}

/// POST /orders/:order_id/payment
pub async fn process_payment(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
    request: Option<Json<PaymentRequest>>,
) -> Response {
    let mut ctx = workflow_context(&headers);
    let source = match request.and_then(|Json(r)| r.token_id) {
        Some(token_id) => PaymentSource::SavedToken(token_id),
        None => PaymentSource::NewCard,
    };

    let response = match state
        .gateway
        .process_payment(&order_id, source, &mut ctx)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => ApiError(e).into_response(),
    };
    with_notices(response, &mut ctx)
}

/// GET /account/add-card
///
/// Redirects a logged-in customer to the hosted add-card form.
pub async fn add_card(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut ctx = workflow_context(&headers);
    if ctx.current_user.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let response = match state.gateway.start_add_card() {
        Ok(form) => {
            (StatusCode::SEE_OTHER, [(header::LOCATION, form.redirect_url())]).into_response()
        }
        Err(e) => ApiError(e).into_response(),
    };
    with_notices(response, &mut ctx)
}

#[derive(Debug, Default, Deserialize)]
pub struct RefundRequest {
    /// Major units; the full amount when absent
    pub amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub order_id: String,
    pub refunded: bool,
}

/// POST /orders/:order_id/refund
pub async fn refund(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    request: Option<Json<RefundRequest>>,
) -> Result<Json<RefundResponse>, ApiError> {
    let amount = request.and_then(|Json(r)| r.amount);
    let refunded = state.gateway.process_refund(&order_id, amount).await?;
    Ok(Json(RefundResponse { order_id, refunded }))
}
