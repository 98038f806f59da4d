//! Payment Highway gateway types and data structures
//!
//! Orders, return URLs, redirect forms, card data and user notices shared by
//! the form builder, the callback dispatcher and the workflow controller.

use crate::error::{GatewayError, GatewayResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;
use uuid::Uuid;

/// Gateway identifier stored on card tokens and used in log lines
pub const GATEWAY_ID: &str = "payment_highway";

/// Order lifecycle as seen by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    /// Created, or waiting for the customer to come back from the hosted form
    Pending,
    OnHold,
    Paid,
    Failed,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::OnHold => "on-hold",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Money has already moved for this order; no new commit or debit is allowed
    pub fn is_settled(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Refunded)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "on-hold" => Ok(OrderStatus::OnHold),
            "paid" => Ok(OrderStatus::Paid),
            "failed" => Ok(OrderStatus::Failed),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(GatewayError::invalid_input(format!(
                "unknown order status '{}'",
                other
            ))),
        }
    }
}

/// Line item, only used to describe the order on the hosted form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
}

/// Order as owned by the surrounding store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Secret key that authorizes viewing the order-received page
    pub order_key: String,
    /// Customer that placed the order, `None` for guest checkout
    pub customer_id: Option<String>,
    /// Total in minor currency units
    pub total: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub transaction_id: Option<String>,
    pub items: Vec<OrderItem>,
}

impl Order {
    pub fn new(id: impl Into<String>, total: i64, currency: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            order_key: format!("wc_order_{}", Uuid::new_v4().simple()),
            customer_id: None,
            total,
            currency: currency.into(),
            status: OrderStatus::Pending,
            transaction_id: None,
            items: Vec::new(),
        }
    }

    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_item(mut self, name: impl Into<String>, quantity: u32) -> Self {
        self.items.push(OrderItem {
            name: name.into(),
            quantity,
        });
        self
    }

    /// Start a fresh payment attempt: back to pending, forgetting the
    /// transaction of any earlier failed attempt
    pub fn begin_attempt(&mut self) {
        self.status = OrderStatus::Pending;
        self.transaction_id = None;
    }

    /// Record the vendor transaction id of the current attempt.
    ///
    /// Setting the same id twice is a no-op; a different id is refused so a
    /// payment attempt never loses track of the transaction it started.
    pub fn assign_transaction_id(&mut self, transaction_id: &str) -> GatewayResult<()> {
        match &self.transaction_id {
            Some(existing) if existing == transaction_id => Ok(()),
            Some(existing) => Err(GatewayError::TransactionIdConflict {
                order_id: self.id.clone(),
                existing: existing.clone(),
                incoming: transaction_id.to_string(),
            }),
            None => {
                self.transaction_id = Some(transaction_id.to_string());
                Ok(())
            }
        }
    }

    /// Description shown on the hosted payment page, e.g. `"42: 2x Mug, 1x Tee"`
    pub fn description(&self) -> String {
        let items = self
            .items
            .iter()
            .map(|item| format!("{}x {}", item.quantity, item.name))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}: {}", self.id, items)
    }
}

/// The three locations the hosted form redirects back to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnUrlSet {
    pub success_url: String,
    pub failure_url: String,
    pub cancel_url: String,
}

impl ReturnUrlSet {
    /// Build a set, rejecting anything that is not an absolute URL
    pub fn new(
        success_url: impl Into<String>,
        failure_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> GatewayResult<Self> {
        let urls = Self {
            success_url: success_url.into(),
            failure_url: failure_url.into(),
            cancel_url: cancel_url.into(),
        };
        for candidate in [&urls.success_url, &urls.failure_url, &urls.cancel_url] {
            Url::parse(candidate).map_err(|e| {
                GatewayError::invalid_input(format!(
                    "return URL '{}' is not absolute: {}",
                    candidate, e
                ))
            })?;
        }
        Ok(urls)
    }
}

/// Outbound signed request descriptor for the hosted form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectForm {
    pub action_url: String,
    /// Parameters in the order they were added, signature last
    pub parameters: Vec<(String, String)>,
}

impl RedirectForm {
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Parameters minus the signature, for comparing two forms
    pub fn unsigned_parameters(&self) -> Vec<(String, String)> {
        self.parameters
            .iter()
            .filter(|(key, _)| key != "signature")
            .cloned()
            .collect()
    }

    /// `action?query` location the customer is sent to with an HTTP GET
    pub fn redirect_url(&self) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.parameters.iter())
            .finish();
        format!("{}?{}", self.action_url, query)
    }
}

/// Whether the issuer demands CVC on every token charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CvcRequired {
    Yes,
    No,
    NotTested,
    #[serde(other)]
    Unknown,
}

/// Card details returned by commit and tokenize calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInfo {
    #[serde(rename = "type")]
    pub card_type: String,
    pub partial_pan: String,
    pub expire_month: String,
    pub expire_year: String,
    pub cvc_required: CvcRequired,
}

/// Saved card a customer can pay with later
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct StoredCardToken {
    pub id: Uuid,
    pub token: String,
    pub gateway_id: String,
    pub card_type: String,
    pub last4: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl StoredCardToken {
    pub fn from_card(token: &str, card: &CardInfo, user_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            token: token.to_string(),
            gateway_id: GATEWAY_ID.to_string(),
            card_type: card.card_type.to_lowercase(),
            last4: card.partial_pan.clone(),
            expiry_month: card.expire_month.clone(),
            expiry_year: card.expire_year.clone(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRef {
    pub id: String,
}

/// Body of a debit-with-token call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitRequest {
    pub token: TokenRef,
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
    /// Wait for the debit to settle before answering
    pub blocking: bool,
    /// Merchant order reference
    pub order: String,
}

impl DebitRequest {
    pub fn new(token: &str, amount: i64, currency: &str, order: &str) -> Self {
        Self {
            token: TokenRef {
                id: token.to_string(),
            },
            amount,
            currency: currency.to_string(),
            blocking: true,
            order: order.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Notice,
    Error,
}

/// Transient message for the customer's next page view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// How the customer chose to pay at checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentSource {
    /// Enter a card on the hosted form, saving it on success
    NewCard,
    /// Charge a previously stored token by its id
    SavedToken(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentResultKind {
    Success,
    Failure,
}

/// Answer to a checkout submission: where to send the customer next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub result: PaymentResultKind,
    pub redirect: String,
}

impl PaymentResult {
    pub fn success(redirect: impl Into<String>) -> Self {
        Self {
            result: PaymentResultKind::Success,
            redirect: redirect.into(),
        }
    }

    pub fn failure(redirect: impl Into<String>) -> Self {
        Self {
            result: PaymentResultKind::Failure,
            redirect: redirect.into(),
        }
    }
}
