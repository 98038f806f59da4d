//! Return-callback routing
//!
//! The hosted form sends the customer back to a URL tagged with one of a
//! fixed set of flags. The dispatcher picks the flags present on the request
//! and runs the matching handler for each, in declaration order.

use crate::error::GatewayResult;
use crate::payments::context::WorkflowContext;
use crate::payments::traits::PaymentGateway;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    PaymentSuccess,
    AddCardSuccess,
    AddCardFailure,
}

impl CallbackKind {
    /// Declaration order, which is also dispatch order
    pub const ALL: [CallbackKind; 3] = [
        CallbackKind::PaymentSuccess,
        CallbackKind::AddCardSuccess,
        CallbackKind::AddCardFailure,
    ];

    /// Query parameter flag that selects this handler
    pub fn param_name(&self) -> &'static str {
        match self {
            CallbackKind::PaymentSuccess => "payment_success",
            CallbackKind::AddCardSuccess => "add_card_success",
            CallbackKind::AddCardFailure => "add_card_failure",
        }
    }

    pub fn from_param(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.param_name() == name)
    }
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.param_name())
    }
}

/// Query parameters of a return redirect
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams(BTreeMap<String, String>);

impl CallbackParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CallbackParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<HashMap<String, String>> for CallbackParams {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl fmt::Display for CallbackParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

/// Where a handled callback sends the customer next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackOutcome {
    pub kind: CallbackKind,
    pub redirect: String,
}

/// Routing table from callback flags to gateway handlers.
///
/// Built once at startup and shared by every request.
#[derive(Debug, Clone)]
pub struct CallbackDispatcher {
    recognized: Vec<CallbackKind>,
}

impl Default for CallbackDispatcher {
    fn default() -> Self {
        Self {
            recognized: CallbackKind::ALL.to_vec(),
        }
    }
}

impl CallbackDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recognized(&self) -> &[CallbackKind] {
        &self.recognized
    }

    /// Recognized flags present in `params`, in declaration order
    pub fn matching(&self, params: &CallbackParams) -> Vec<CallbackKind> {
        self.recognized
            .iter()
            .copied()
            .filter(|kind| params.contains(kind.param_name()))
            .collect()
    }

    /// Run every matching handler.
    ///
    /// A failing handler is logged and does not stop the ones after it.
    pub async fn dispatch<G>(
        &self,
        gateway: &G,
        params: &CallbackParams,
        ctx: &mut WorkflowContext,
    ) -> Vec<(CallbackKind, GatewayResult<CallbackOutcome>)>
    where
        G: PaymentGateway + ?Sized,
    {
        let kinds = self.matching(params);
        if kinds.len() > 1 {
            warn!("Request carries {} callback flags: {:?}", kinds.len(), kinds);
        }

        let mut results = Vec::with_capacity(kinds.len());
        for kind in kinds {
            debug!("Dispatching Payment Highway callback: {}", kind);
            let result = gateway.handle_callback(kind, params, ctx).await;
            if let Err(e) = &result {
                error!(callback = %kind, "Payment Highway callback failed: {}", e);
            }
            results.push((kind, result));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::payments::traits::RedirectRequest;
    use crate::payments::types::RedirectForm;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingGateway {
        calls: Mutex<Vec<CallbackKind>>,
        fail_on: Option<CallbackKind>,
    }

    #[async_trait]
    impl PaymentGateway for RecordingGateway {
        async fn build_redirect(
            &self,
            _request: RedirectRequest,
            _ctx: &mut WorkflowContext,
        ) -> GatewayResult<RedirectForm> {
            unreachable!("not used by the dispatcher")
        }

        async fn handle_callback(
            &self,
            kind: CallbackKind,
            _params: &CallbackParams,
            _ctx: &mut WorkflowContext,
        ) -> GatewayResult<CallbackOutcome> {
            self.calls.lock().unwrap().push(kind);
            if self.fail_on == Some(kind) {
                return Err(GatewayError::unreachable("test"));
            }
            Ok(CallbackOutcome {
                kind,
                redirect: format!("https://shop.example/{}", kind),
            })
        }

        async fn refund(&self, _order_id: &str, _amount: Option<Decimal>) -> GatewayResult<bool> {
            unreachable!("not used by the dispatcher")
        }
    }

    #[test]
    fn test_param_names() {
        assert_eq!(CallbackKind::PaymentSuccess.param_name(), "payment_success");
        assert_eq!(
            CallbackKind::from_param("add_card_failure"),
            Some(CallbackKind::AddCardFailure)
        );
        assert_eq!(CallbackKind::from_param("paymenthighway"), None);
    }

    #[test]
    fn test_matching_uses_declaration_order() {
        let params = CallbackParams::new()
            .with("add_card_failure", "")
            .with("sph-order", "42")
            .with("payment_success", "");
        assert_eq!(
            CallbackDispatcher::new().matching(&params),
            vec![CallbackKind::PaymentSuccess, CallbackKind::AddCardFailure]
        );
    }

    #[tokio::test]
    async fn test_dispatch_without_flags_does_nothing() {
        let gateway = RecordingGateway::default();
        let params = CallbackParams::new().with("page_id", "7");
        let mut ctx = WorkflowContext::guest();

        let results = CallbackDispatcher::new()
            .dispatch(&gateway, &params, &mut ctx)
            .await;
        assert!(results.is_empty());
        assert!(gateway.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_runs_every_match_even_after_failure() {
        let gateway = RecordingGateway {
            fail_on: Some(CallbackKind::AddCardSuccess),
            ..Default::default()
        };
        let params = CallbackParams::new()
            .with("add_card_failure", "")
            .with("add_card_success", "");
        let mut ctx = WorkflowContext::guest();

        let results = CallbackDispatcher::new()
            .dispatch(&gateway, &params, &mut ctx)
            .await;

        assert_eq!(
            *gateway.calls.lock().unwrap(),
            vec![CallbackKind::AddCardSuccess, CallbackKind::AddCardFailure]
        );
        assert!(results[0].1.is_err());
        assert_eq!(
            results[1].1.as_ref().unwrap().redirect,
            "https://shop.example/add_card_failure"
        );
    }
}
