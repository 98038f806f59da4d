//! Return redirects from the hosted forms
//!
//! The vendor sends the customer back to storefront pages tagged with a
//! callback flag (`?key=..&payment_success`). [`dispatch_callbacks`] runs in
//! front of every route, so a flagged request is handled whatever its path.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::{with_notices, workflow_context, ApiError, AppState};
use crate::error::GatewayError;
use crate::payments::CallbackParams;

fn query_params(request: &Request) -> CallbackParams {
    request
        .uri()
        .query()
        .map(|query| url::form_urlencoded::parse(query.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Middleware: run every handler whose flag is on the query string and
/// redirect to where the last successful one points. Requests without a
/// flag pass through untouched.
pub async fn dispatch_callbacks(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let params = query_params(&request);
    if state.dispatcher.matching(&params).is_empty() {
        return next.run(request).await;
    }

    let mut ctx = workflow_context(request.headers());
    let results = state
        .dispatcher
        .dispatch(state.gateway.as_ref(), &params, &mut ctx)
        .await;

    let mut last_error = None;
    let mut redirect = None;
    for (_, result) in results {
        match result {
            Ok(outcome) => redirect = Some(outcome.redirect),
            Err(e) => last_error = Some(e),
        }
    }

    let response = match (redirect, last_error) {
        (Some(location), _) => {
            (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response()
        }
        (None, Some(e)) => ApiError(e).into_response(),
        (None, None) => StatusCode::NO_CONTENT.into_response(),
    };
    with_notices(response, &mut ctx)
}

/// GET /payment-highway/return
///
/// Flagged returns never get here; they are answered by [`dispatch_callbacks`].
pub async fn handle_return(request: Request) -> Response {
    warn!(
        "Return request without a callback flag: {}",
        query_params(&request)
    );
    ApiError(GatewayError::invalid_input("no callback flag on request")).into_response()
}

/// Storefront pages are not served here; only flagged returns are answered
pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
