//! Payment workflow controller
//!
//! Drives an order from pending to paid, failed or refunded:
//!
//! ```text
//! pending --(redirect built, customer approves)--> awaiting callback
//! awaiting callback --(signature valid, code 100)--> paid
//! awaiting callback --(signature invalid | code != 100)--> failed
//! paid --(refund, code 100)--> refunded
//! paid --(refund, code != 100)--> paid
//! ```
//!
//! Failures that touch money are logged at error level with the order id,
//! transaction id, vendor code and vendor message. The customer only ever
//! sees generic notices.

use crate::database::repository::{CardTokenRepository, OrderRepository};
use crate::error::{GatewayError, GatewayResult};
use crate::payments::card_policy::should_store_card;
use crate::payments::context::WorkflowContext;
use crate::payments::dispatcher::{CallbackKind, CallbackOutcome, CallbackParams};
use crate::payments::forms::FormBuilder;
use crate::payments::providers::payment_highway::PaymentHighwayConfig;
use crate::payments::response::{VendorResponse, VendorSuccess};
use crate::payments::signer::SecureSigner;
use crate::payments::stamp::{StampSource, SystemStamp};
use crate::payments::traits::{PaymentApi, PaymentGateway, RedirectRequest};
use crate::payments::types::{
    DebitRequest, Order, OrderStatus, PaymentResult, PaymentSource, RedirectForm,
    StoredCardToken, GATEWAY_ID,
};
use crate::payments::urls::StorefrontUrls;
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const PAYMENT_FAILED_NOTICE: &str = "Payment failed, please try again.";
const CARD_NOT_SAVED_NOTICE: &str = "Card could not be saved.";
const CARD_SAVED_NOTICE: &str = "Card saved.";
const CVC_REQUIRED_NOTICE: &str = "Card could not be saved. Card could not be used without cvc.";

/// Convert a major-unit amount to minor units, truncating sub-cent digits
pub fn to_minor_units(amount: Decimal) -> GatewayResult<i64> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(GatewayError::invalid_input(format!(
            "amount must not be negative, got {}",
            amount
        )));
    }
    (amount * Decimal::ONE_HUNDRED)
        .trunc()
        .to_i64()
        .ok_or_else(|| GatewayError::invalid_input(format!("amount {} is out of range", amount)))
}

pub struct PaymentHighwayGateway {
    config: PaymentHighwayConfig,
    urls: StorefrontUrls,
    forms: FormBuilder,
    signer: SecureSigner,
    api: Arc<dyn PaymentApi>,
    orders: Arc<dyn OrderRepository>,
    tokens: Arc<dyn CardTokenRepository>,
}

impl PaymentHighwayGateway {
    pub fn new(
        config: PaymentHighwayConfig,
        urls: StorefrontUrls,
        api: Arc<dyn PaymentApi>,
        orders: Arc<dyn OrderRepository>,
        tokens: Arc<dyn CardTokenRepository>,
    ) -> Self {
        Self::with_stamp_source(config, urls, api, orders, tokens, Arc::new(SystemStamp))
    }

    pub fn with_stamp_source(
        config: PaymentHighwayConfig,
        urls: StorefrontUrls,
        api: Arc<dyn PaymentApi>,
        orders: Arc<dyn OrderRepository>,
        tokens: Arc<dyn CardTokenRepository>,
        stamps: Arc<dyn StampSource>,
    ) -> Self {
        Self {
            forms: FormBuilder::new(&config, stamps),
            signer: config.signer(),
            config,
            urls,
            api,
            orders,
            tokens,
        }
    }

    pub fn urls(&self) -> &StorefrontUrls {
        &self.urls
    }

    async fn load_order(&self, order_id: &str) -> GatewayResult<Order> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| GatewayError::OrderNotFound {
                order_id: order_id.to_string(),
            })
    }

    fn ensure_unsettled(order: &Order) -> GatewayResult<()> {
        if order.status.is_settled() {
            warn!(
                order_id = %order.id,
                status = %order.status,
                "Refusing to charge an order that is already settled"
            );
            return Err(GatewayError::AlreadyPaid {
                order_id: order.id.clone(),
            });
        }
        Ok(())
    }

    /// Checkout entry point: redirect to the hosted form, or charge a saved card
    pub async fn process_payment(
        &self,
        order_id: &str,
        source: PaymentSource,
        ctx: &mut WorkflowContext,
    ) -> GatewayResult<PaymentResult> {
        match source {
            PaymentSource::NewCard => {
                let form = self.start_new_card_payment(order_id).await?;
                Ok(PaymentResult::success(form.redirect_url()))
            }
            PaymentSource::SavedToken(token_id) => {
                self.process_payment_with_token(order_id, token_id, ctx).await
            }
        }
    }

    /// Start a new attempt on the order, reserve stock and build the
    /// add-card-and-pay form
    pub async fn start_new_card_payment(&self, order_id: &str) -> GatewayResult<RedirectForm> {
        let mut order = self.load_order(order_id).await?;
        Self::ensure_unsettled(&order)?;

        order.begin_attempt();
        self.orders.save(&order).await?;
        self.orders.reduce_stock_levels(&order.id).await?;

        let return_urls = self
            .urls
            .checkout_return_urls(&order, CallbackKind::PaymentSuccess)?;
        let form = self.forms.build_add_card_and_payment_form(
            order.total,
            &order.currency,
            &order.id,
            &order.description(),
            &return_urls,
        )?;

        info!(
            order_id = %order.id,
            amount = order.total,
            currency = %order.currency,
            "Redirecting to Payment Highway add card and pay form"
        );
        Ok(form)
    }

    /// Form for saving a card to the customer's account
    pub fn start_add_card(&self) -> GatewayResult<RedirectForm> {
        let return_urls = self.urls.add_card_return_urls()?;
        Ok(self
            .forms
            .build_add_card_form(self.config.accept_cvc_required, &return_urls))
    }

    /// Init a transaction and debit `token` on it as a new attempt.
    ///
    /// A rejected init is returned as-is without debiting.
    pub async fn start_token_payment(
        &self,
        order_id: &str,
        token: &str,
        amount: i64,
        currency: &str,
    ) -> GatewayResult<VendorResponse> {
        let mut order = self.load_order(order_id).await?;
        Self::ensure_unsettled(&order)?;
        order.begin_attempt();
        self.debit_with_token(&mut order, token, amount, currency).await
    }

    async fn debit_with_token(
        &self,
        order: &mut Order,
        token: &str,
        amount: i64,
        currency: &str,
    ) -> GatewayResult<VendorResponse> {
        Self::ensure_unsettled(order)?;

        let init = self.api.init_transaction().await?;
        let transaction_id = match &init {
            VendorResponse::Rejected { code, message } => {
                error!(
                    order_id = %order.id,
                    code = *code,
                    vendor_message = %message,
                    "Error while initializing transaction"
                );
                return Ok(init);
            }
            VendorResponse::Success(payload) => payload.transaction_id.clone().ok_or_else(|| {
                GatewayError::malformed("transaction init response carries no id")
            })?,
        };

        order.assign_transaction_id(&transaction_id)?;
        self.orders.save(order).await?;

        let request = DebitRequest::new(token, amount, currency, &order.id);
        self.api.debit_transaction(&transaction_id, &request).await
    }

    async fn process_payment_with_token(
        &self,
        order_id: &str,
        token_id: uuid::Uuid,
        ctx: &mut WorkflowContext,
    ) -> GatewayResult<PaymentResult> {
        let token = self.owned_token(token_id, ctx).await?;

        let mut order = self.load_order(order_id).await?;
        Self::ensure_unsettled(&order)?;
        order.begin_attempt();
        self.orders.save(&order).await?;
        self.orders.reduce_stock_levels(&order.id).await?;

        let amount = order.total;
        let currency = order.currency.clone();
        let response = self
            .debit_with_token(&mut order, &token.token, amount, &currency)
            .await?;

        match response {
            VendorResponse::Success(_) => {
                order.status = OrderStatus::Paid;
                self.orders.save(&order).await?;
                info!(
                    order_id = %order.id,
                    transaction_id = order.transaction_id.as_deref().unwrap_or_default(),
                    "Payment with saved card completed"
                );
                Ok(PaymentResult::success(self.urls.order_received_url(&order)))
            }
            VendorResponse::Rejected { code, message } => {
                error!(
                    order_id = %order.id,
                    transaction_id = order.transaction_id.as_deref().unwrap_or_default(),
                    code,
                    vendor_message = %message,
                    "Error while making debit transaction with token"
                );
                order.status = OrderStatus::Failed;
                self.orders.save(&order).await?;
                ctx.error(PAYMENT_FAILED_NOTICE);
                Ok(PaymentResult::failure(self.urls.checkout_url()))
            }
        }
    }

    /// Saved token belonging to the current customer and this gateway
    async fn owned_token(
        &self,
        token_id: uuid::Uuid,
        ctx: &WorkflowContext,
    ) -> GatewayResult<StoredCardToken> {
        let not_found = || GatewayError::TokenNotFound {
            token_id: token_id.to_string(),
        };
        let token = self.tokens.find_by_id(token_id).await?.ok_or_else(not_found)?;

        let owned = ctx.current_user.as_deref() == Some(token.user_id.as_str());
        if !owned || token.gateway_id != GATEWAY_ID {
            warn!(token_id = %token_id, "Card token does not belong to the current customer");
            return Err(not_found());
        }
        Ok(token)
    }

    /// Return from the add-card-and-pay form
    pub async fn handle_payment_success_callback(
        &self,
        params: &CallbackParams,
        ctx: &mut WorkflowContext,
    ) -> GatewayResult<CallbackOutcome> {
        let order_id = params.get("sph-order").ok_or_else(|| {
            error!("Payment callback without sph-order: {}", params);
            GatewayError::invalid_input("payment callback carries no sph-order")
        })?;
        let mut order = self.load_order(order_id).await?;

        if order.status.is_settled() {
            // Replayed redirect, e.g. the back button after a completed payment
            warn!(
                order_id = %order.id,
                status = %order.status,
                "Ignoring repeated payment callback for settled order"
            );
            return Ok(self.payment_outcome(self.urls.order_received_url(&order)));
        }

        if self.signer.validate_form_redirect(params.iter()).is_err() {
            let detail = format!("Signature mismatch: {}", params);
            return self.fail_payment(&mut order, ctx, None, &detail).await;
        }

        let (transaction_id, amount, currency) = match Self::commit_fields(params) {
            Ok(fields) => fields,
            Err(e) => return self.fail_payment(&mut order, ctx, None, &e.to_string()).await,
        };

        if amount != order.total || currency != order.currency {
            let detail = format!(
                "Callback amount {} {} does not match order total {} {}",
                amount, currency, order.total, order.currency
            );
            return self.fail_payment(&mut order, ctx, None, &detail).await;
        }

        if let Err(e) = order.assign_transaction_id(&transaction_id) {
            return self.fail_payment(&mut order, ctx, None, &e.to_string()).await;
        }

        let response = self
            .api
            .commit_form_transaction(&transaction_id, amount, &currency)
            .await?;

        match response {
            VendorResponse::Success(payload) => {
                info!(
                    order_id = %order.id,
                    transaction_id = %transaction_id,
                    "Payment Highway payment committed: {}",
                    payload.message
                );
                order.status = OrderStatus::Paid;
                self.orders.save(&order).await?;

                if let Some(user_id) = ctx.current_user.clone() {
                    match self.save_card(&payload, &user_id, ctx).await {
                        Ok(_) => {}
                        Err(GatewayError::PolicyRejected) => ctx.notice(CVC_REQUIRED_NOTICE),
                        Err(_) => ctx.notice(CARD_NOT_SAVED_NOTICE),
                    }
                }

                Ok(self.payment_outcome(self.urls.order_received_url(&order)))
            }
            VendorResponse::Rejected { code, message } => {
                self.fail_payment(&mut order, ctx, Some(code), &message).await
            }
        }
    }

    fn commit_fields(params: &CallbackParams) -> GatewayResult<(String, i64, String)> {
        let field = |name: &str| {
            params
                .get(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| GatewayError::invalid_input(format!("callback carries no {}", name)))
        };

        let transaction_id = field("sph-transaction-id")?.to_string();
        let amount = field("sph-amount")?
            .parse::<i64>()
            .map_err(|e| GatewayError::invalid_input(format!("invalid sph-amount: {}", e)))?;
        let currency = field("sph-currency")?.to_string();
        Ok((transaction_id, amount, currency))
    }

    fn payment_outcome(&self, redirect: String) -> CallbackOutcome {
        CallbackOutcome {
            kind: CallbackKind::PaymentSuccess,
            redirect,
        }
    }

    async fn fail_payment(
        &self,
        order: &mut Order,
        ctx: &mut WorkflowContext,
        code: Option<i64>,
        detail: &str,
    ) -> GatewayResult<CallbackOutcome> {
        error!(
            order_id = %order.id,
            transaction_id = order.transaction_id.as_deref().unwrap_or_default(),
            code,
            vendor_message = %detail,
            "Payment Highway payment failed"
        );
        order.status = OrderStatus::Failed;
        self.orders.save(order).await?;
        ctx.error(PAYMENT_FAILED_NOTICE);
        Ok(self.payment_outcome(self.urls.checkout_url()))
    }

    /// Store the card from a successful response if policy allows.
    ///
    /// Attempted once per response; never changes the payment outcome.
    async fn save_card(
        &self,
        payload: &VendorSuccess,
        user_id: &str,
        ctx: &mut WorkflowContext,
    ) -> GatewayResult<StoredCardToken> {
        let (Some(card), Some(token)) = (&payload.card, &payload.card_token) else {
            warn!("Payment Highway response carries no card token to save");
            return Err(GatewayError::malformed("response carries no card token"));
        };

        if !should_store_card(card.cvc_required, self.config.accept_cvc_required) {
            debug!("Card requires CVC and merchant does not accept such cards");
            return Err(GatewayError::PolicyRejected);
        }

        let stored = self
            .tokens
            .insert(&StoredCardToken::from_card(token, card, user_id))
            .await
            .map_err(|e| {
                warn!(user_id = %user_id, "Failed to store card token: {}", e);
                GatewayError::from(e)
            })?;

        ctx.success(CARD_SAVED_NOTICE);
        Ok(stored)
    }

    /// Return from the add-card form with a tokenization id
    pub async fn handle_add_card_success_callback(
        &self,
        params: &CallbackParams,
        ctx: &mut WorkflowContext,
    ) -> GatewayResult<CallbackOutcome> {
        if self.signer.validate_form_redirect(params.iter()).is_err() {
            return Ok(self.fail_add_card(ctx, &format!("Signature mismatch: {}", params)));
        }

        let Some(tokenization_id) = params.get("sph-tokenization-id").filter(|v| !v.is_empty())
        else {
            return Ok(self.fail_add_card(ctx, "Add card callback carries no sph-tokenization-id"));
        };

        let Some(user_id) = ctx.current_user.clone() else {
            return Ok(self.fail_add_card(ctx, "Add card callback without a logged-in customer"));
        };

        let response = self.api.tokenize(tokenization_id).await?;
        info!(
            code = response.code(),
            "Payment Highway tokenize response: {}",
            response.message()
        );

        match response {
            VendorResponse::Success(payload) => match self.save_card(&payload, &user_id, ctx).await {
                Ok(_) => Ok(self.add_card_outcome(CallbackKind::AddCardSuccess)),
                Err(GatewayError::PolicyRejected) => {
                    error!(user_id = %user_id, "Card could not be used without cvc.");
                    ctx.notice(CVC_REQUIRED_NOTICE);
                    Ok(self.add_card_outcome(CallbackKind::AddCardSuccess))
                }
                Err(e) => Ok(self.fail_add_card(ctx, &e.to_string())),
            },
            VendorResponse::Rejected { code, message } => {
                error!(code, vendor_message = %message, "Payment Highway tokenization rejected");
                ctx.error(CARD_NOT_SAVED_NOTICE);
                Ok(self.add_card_outcome(CallbackKind::AddCardSuccess))
            }
        }
    }

    /// Return from the add-card form after the customer failed or cancelled
    pub fn handle_add_card_failure_callback(
        &self,
        params: &CallbackParams,
        ctx: &mut WorkflowContext,
    ) -> CallbackOutcome {
        error!("Payment Highway add card failed: {}", params);
        ctx.error(CARD_NOT_SAVED_NOTICE);
        self.add_card_outcome(CallbackKind::AddCardFailure)
    }

    fn fail_add_card(&self, ctx: &mut WorkflowContext, detail: &str) -> CallbackOutcome {
        error!(vendor_message = %detail, "Payment Highway add card failed");
        ctx.error(CARD_NOT_SAVED_NOTICE);
        self.add_card_outcome(CallbackKind::AddCardSuccess)
    }

    fn add_card_outcome(&self, kind: CallbackKind) -> CallbackOutcome {
        CallbackOutcome {
            kind,
            redirect: self.urls.account_url(),
        }
    }

    /// Revert a paid order; `None` reverts the full amount.
    ///
    /// Returns `false` when the order cannot be refunded or the vendor
    /// declines; the order is left untouched in both cases.
    pub async fn process_refund(
        &self,
        order_id: &str,
        amount: Option<Decimal>,
    ) -> GatewayResult<bool> {
        let Some(mut order) = self.orders.find_by_id(order_id).await? else {
            return Ok(false);
        };
        let Some(transaction_id) = order.transaction_id.clone() else {
            debug!(order_id = %order_id, "Refund requested for order without transaction id");
            return Ok(false);
        };
        if order.status != OrderStatus::Paid {
            debug!(order_id = %order_id, status = %order.status, "Refund requested for unpaid order");
            return Ok(false);
        }

        let ph_amount = amount.map(to_minor_units).transpose()?;
        info!(
            order_id = %order_id,
            transaction_id = %transaction_id,
            "Revert order: amount: {:?}, ph-amount: {:?}",
            amount,
            ph_amount
        );

        match self.api.revert_transaction(&transaction_id, ph_amount).await? {
            VendorResponse::Success(_) => {
                order.status = OrderStatus::Refunded;
                self.orders.save(&order).await?;
                Ok(true)
            }
            VendorResponse::Rejected { code, message } => {
                error!(
                    order_id = %order_id,
                    transaction_id = %transaction_id,
                    code,
                    vendor_message = %message,
                    "Error while making refund"
                );
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl PaymentGateway for PaymentHighwayGateway {
    async fn build_redirect(
        &self,
        request: RedirectRequest,
        _ctx: &mut WorkflowContext,
    ) -> GatewayResult<RedirectForm> {
        match request {
            RedirectRequest::NewCardPayment { order_id } => {
                self.start_new_card_payment(&order_id).await
            }
            RedirectRequest::AddCard => self.start_add_card(),
        }
    }

    async fn handle_callback(
        &self,
        kind: CallbackKind,
        params: &CallbackParams,
        ctx: &mut WorkflowContext,
    ) -> GatewayResult<CallbackOutcome> {
        match kind {
            CallbackKind::PaymentSuccess => self.handle_payment_success_callback(params, ctx).await,
            CallbackKind::AddCardSuccess => self.handle_add_card_success_callback(params, ctx).await,
            CallbackKind::AddCardFailure => Ok(self.handle_add_card_failure_callback(params, ctx)),
        }
    }

    async fn refund(&self, order_id: &str, amount: Option<Decimal>) -> GatewayResult<bool> {
        self.process_refund(order_id, amount).await
    }
}
