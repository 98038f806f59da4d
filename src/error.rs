//! Gateway error taxonomy
//!
//! Every failure the payment workflow can produce, grouped by how the caller
//! is expected to react to it.

use crate::database::error::DatabaseError;
use thiserror::Error;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Inbound redirect parameters failed signature verification
    #[error("Signature mismatch on callback parameters")]
    SignatureInvalid,

    /// Vendor answered with a result code other than 100
    #[error("Payment Highway rejected the request: code {code}, {message}")]
    VendorRejected { code: i64, message: String },

    /// Transport-level failure talking to the vendor API
    #[error("Payment Highway is unreachable: {message}")]
    VendorUnreachable { message: String },

    /// Vendor answered with a body that could not be decoded
    #[error("Malformed Payment Highway response: {message}")]
    MalformedResponse { message: String },

    /// Card requires CVC and the merchant does not accept such cards
    #[error("Card could not be used without CVC")]
    PolicyRejected,

    /// Operation attempted on an order that is not in a suitable state
    #[error("Precondition failed: {message}")]
    PreconditionFailed { message: String },

    #[error("Order '{order_id}' not found")]
    OrderNotFound { order_id: String },

    #[error("Card token '{token_id}' not found")]
    TokenNotFound { token_id: String },

    /// Commit or debit attempted against an order that is already settled
    #[error("Order '{order_id}' is already paid")]
    AlreadyPaid { order_id: String },

    /// A different transaction id is already recorded on the order
    #[error("Order '{order_id}' already carries transaction '{existing}', refusing '{incoming}'")]
    TransactionIdConflict {
        order_id: String,
        existing: String,
        incoming: String,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

impl GatewayError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::VendorUnreachable {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Failures that mean money may or may not have moved and need a human
    pub fn affects_money_movement(&self) -> bool {
        matches!(
            self,
            Self::VendorRejected { .. }
                | Self::VendorUnreachable { .. }
                | Self::MalformedResponse { .. }
                | Self::TransactionIdConflict { .. }
        )
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::unreachable(format!("request timed out: {}", err))
        } else if err.is_decode() {
            GatewayError::malformed(format!("decode error: {}", err))
        } else {
            GatewayError::unreachable(format!("request error: {}", err))
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::malformed(format!("JSON error: {}", err))
    }
}
