//! Shared fixtures: a scripted vendor API, in-memory stores and log capture

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use payment_highway_gateway::database::error::{DatabaseError, DatabaseErrorKind};
use payment_highway_gateway::database::memory::{
    InMemoryCardTokenRepository, InMemoryOrderRepository,
};
use payment_highway_gateway::database::repository::CardTokenRepository;
use payment_highway_gateway::error::{GatewayError, GatewayResult};
use payment_highway_gateway::payments::response::{VendorResponse, VendorSuccess};
use payment_highway_gateway::payments::signer::SecureSigner;
use payment_highway_gateway::payments::stamp::{FixedStamp, RequestStamp};
use payment_highway_gateway::payments::types::{CardInfo, CvcRequired, DebitRequest, StoredCardToken};
use payment_highway_gateway::payments::urls::StorefrontUrls;
use payment_highway_gateway::payments::{
    CallbackParams, PaymentApi, PaymentHighwayConfig, PaymentHighwayGateway,
};
use std::io;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const KEY_ID: &str = "testKey";
pub const SECRET: &str = "testSecret";
pub const SHOP: &str = "https://shop.example";

pub fn config(accept_cvc_required: bool) -> PaymentHighwayConfig {
    PaymentHighwayConfig {
        api_key_id: KEY_ID.to_string(),
        api_key_secret: SECRET.to_string(),
        sph_account: "test".to_string(),
        sph_merchant: "test_merchantId".to_string(),
        accept_cvc_required,
        ..Default::default()
    }
}

pub fn storefront() -> StorefrontUrls {
    StorefrontUrls {
        base_url: SHOP.to_string(),
        ..Default::default()
    }
}

/// Redirect parameters signed the way the hosted form signs them
pub fn signed_params(pairs: &[(&str, &str)]) -> CallbackParams {
    let signature = SecureSigner::new(KEY_ID, SECRET).sign("GET", "", pairs.iter().copied(), "");
    pairs
        .iter()
        .copied()
        .collect::<CallbackParams>()
        .with("signature", signature)
}

pub fn card(cvc_required: CvcRequired) -> CardInfo {
    CardInfo {
        card_type: "Visa".to_string(),
        partial_pan: "0024".to_string(),
        expire_month: "11".to_string(),
        expire_year: "2030".to_string(),
        cvc_required,
    }
}

pub fn ok() -> VendorResponse {
    VendorResponse::success(VendorSuccess {
        message: "OK".to_string(),
        ..Default::default()
    })
}

pub fn ok_with_card(token: &str, cvc_required: CvcRequired) -> VendorResponse {
    VendorResponse::success(VendorSuccess {
        message: "OK".to_string(),
        card_token: Some(token.to_string()),
        card: Some(card(cvc_required)),
        ..Default::default()
    })
}

pub fn ok_with_id(transaction_id: &str) -> VendorResponse {
    VendorResponse::success(VendorSuccess {
        message: "OK".to_string(),
        transaction_id: Some(transaction_id.to_string()),
        ..Default::default()
    })
}

/// Vendor API answering from a script; an unscripted call is unreachable
#[derive(Default)]
pub struct FakeApi {
    pub calls: Mutex<Vec<String>>,
    pub init: Option<VendorResponse>,
    pub debit: Option<VendorResponse>,
    pub commit: Option<VendorResponse>,
    pub revert: Option<VendorResponse>,
    pub tokenize: Option<VendorResponse>,
}

impl FakeApi {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, call: String, scripted: &Option<VendorResponse>) -> GatewayResult<VendorResponse> {
        self.calls.lock().unwrap().push(call);
        scripted
            .clone()
            .ok_or_else(|| GatewayError::unreachable("connection refused"))
    }
}

#[async_trait]
impl PaymentApi for FakeApi {
    async fn init_transaction(&self) -> GatewayResult<VendorResponse> {
        self.answer("init".to_string(), &self.init)
    }

    async fn debit_transaction(
        &self,
        transaction_id: &str,
        request: &DebitRequest,
    ) -> GatewayResult<VendorResponse> {
        let call = format!(
            "debit {} {} {} {} {}",
            transaction_id, request.token.id, request.amount, request.currency, request.order
        );
        self.answer(call, &self.debit)
    }

    async fn commit_form_transaction(
        &self,
        transaction_id: &str,
        amount: i64,
        currency: &str,
    ) -> GatewayResult<VendorResponse> {
        self.answer(
            format!("commit {} {} {}", transaction_id, amount, currency),
            &self.commit,
        )
    }

    async fn revert_transaction(
        &self,
        transaction_id: &str,
        amount: Option<i64>,
    ) -> GatewayResult<VendorResponse> {
        self.answer(format!("revert {} {:?}", transaction_id, amount), &self.revert)
    }

    async fn tokenize(&self, tokenization_id: &str) -> GatewayResult<VendorResponse> {
        self.answer(format!("tokenize {}", tokenization_id), &self.tokenize)
    }
}

/// Card store whose writes always fail
pub struct BrokenTokenStore;

#[async_trait]
impl CardTokenRepository for BrokenTokenStore {
    async fn find_by_id(&self, _id: Uuid) -> Result<Option<StoredCardToken>, DatabaseError> {
        Ok(None)
    }

    async fn find_by_user_id(&self, _user_id: &str) -> Result<Vec<StoredCardToken>, DatabaseError> {
        Ok(Vec::new())
    }

    async fn insert(&self, _token: &StoredCardToken) -> Result<StoredCardToken, DatabaseError> {
        Err(DatabaseError::new(DatabaseErrorKind::ConnectionError {
            message: "connection reset".to_string(),
        }))
    }
}

pub struct Harness {
    pub gateway: PaymentHighwayGateway,
    pub api: Arc<FakeApi>,
    pub orders: InMemoryOrderRepository,
    pub tokens: InMemoryCardTokenRepository,
}

pub fn harness(api: FakeApi) -> Harness {
    harness_with(api, false)
}

pub fn harness_with(api: FakeApi, accept_cvc_required: bool) -> Harness {
    let api = Arc::new(api);
    let orders = InMemoryOrderRepository::new();
    let tokens = InMemoryCardTokenRepository::new();
    let gateway = gateway(
        api.clone(),
        orders.clone(),
        Arc::new(tokens.clone()),
        accept_cvc_required,
    );
    Harness {
        gateway,
        api,
        orders,
        tokens,
    }
}

pub fn gateway(
    api: Arc<FakeApi>,
    orders: InMemoryOrderRepository,
    tokens: Arc<dyn CardTokenRepository>,
    accept_cvc_required: bool,
) -> PaymentHighwayGateway {
    let stamp = RequestStamp::at(
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
        "f47ac10b-58cc-4372-a567-0e02b2c3d479",
    );
    PaymentHighwayGateway::with_stamp_source(
        config(accept_cvc_required),
        storefront(),
        api,
        Arc::new(orders),
        tokens,
        Arc::new(FixedStamp(stamp)),
    )
}

/// Captured formatted log output
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route this thread's log events into a buffer until the guard drops
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    (buffer, tracing::subscriber::set_default(subscriber))
}
