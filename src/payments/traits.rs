//! Payment Highway capability traits
//!
//! [`PaymentApi`] is the vendor REST surface the workflow consumes;
//! [`PaymentGateway`] is what a host integration layer drives.

use crate::error::GatewayResult;
use crate::payments::context::WorkflowContext;
use crate::payments::dispatcher::{CallbackKind, CallbackOutcome, CallbackParams};
use crate::payments::response::VendorResponse;
use crate::payments::types::{DebitRequest, RedirectForm};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Vendor REST calls
///
/// Each call either returns a decoded [`VendorResponse`] or fails as a whole;
/// a rejection by the vendor is a successful call carrying
/// [`VendorResponse::Rejected`].
#[async_trait]
pub trait PaymentApi: Send + Sync {
    /// Create a transaction to debit a stored token against
    async fn init_transaction(&self) -> GatewayResult<VendorResponse>;

    /// Charge a card token on a previously initialized transaction
    async fn debit_transaction(
        &self,
        transaction_id: &str,
        request: &DebitRequest,
    ) -> GatewayResult<VendorResponse>;

    /// Capture the payment the customer approved on the hosted form
    async fn commit_form_transaction(
        &self,
        transaction_id: &str,
        amount: i64,
        currency: &str,
    ) -> GatewayResult<VendorResponse>;

    /// Refund; `None` reverts the full amount
    async fn revert_transaction(
        &self,
        transaction_id: &str,
        amount: Option<i64>,
    ) -> GatewayResult<VendorResponse>;

    /// Exchange a tokenization id from the add-card form for a card token
    async fn tokenize(&self, tokenization_id: &str) -> GatewayResult<VendorResponse>;
}

/// What the customer is being redirected to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectRequest {
    /// Enter a new card and pay for the order
    NewCardPayment { order_id: String },
    /// Save a card to the customer's account without paying
    AddCard,
}

/// Host-facing gateway surface
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn build_redirect(
        &self,
        request: RedirectRequest,
        ctx: &mut WorkflowContext,
    ) -> GatewayResult<RedirectForm>;

    async fn handle_callback(
        &self,
        kind: CallbackKind,
        params: &CallbackParams,
        ctx: &mut WorkflowContext,
    ) -> GatewayResult<CallbackOutcome>;

    /// Refund in major currency units; `None` refunds the full amount
    async fn refund(&self, order_id: &str, amount: Option<Decimal>) -> GatewayResult<bool>;
}
