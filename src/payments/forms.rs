//! Hosted form redirects
//!
//! Builds the signed parameter sets for the "add card" and "add card and
//! pay" forms. Pure construction: nothing is sent from here.

use crate::error::{GatewayError, GatewayResult};
use crate::payments::providers::payment_highway::PaymentHighwayConfig;
use crate::payments::signer::{SecureSigner, SIGNATURE_PARAM};
use crate::payments::stamp::StampSource;
use crate::payments::types::{RedirectForm, ReturnUrlSet};
use std::sync::Arc;

pub const ADD_CARD_URI: &str = "/form/view/add_card";
pub const ADD_AND_PAY_URI: &str = "/form/view/add_and_pay_with_card";

const FORM_METHOD: &str = "GET";

/// Append `parameter` to `base`, using `&` when a query string already exists
pub fn append_query_parameter(base: &str, parameter: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}", base, separator, parameter)
}

pub struct FormBuilder {
    signer: SecureSigner,
    account: String,
    merchant: String,
    service_url: String,
    language: String,
    stamps: Arc<dyn StampSource>,
}

impl FormBuilder {
    pub fn new(config: &PaymentHighwayConfig, stamps: Arc<dyn StampSource>) -> Self {
        Self {
            signer: config.signer(),
            account: config.sph_account.clone(),
            merchant: config.sph_merchant.clone(),
            service_url: config.service_url().to_string(),
            language: config.sph_locale.clone(),
            stamps,
        }
    }

    /// Form that stores the entered card and charges `amount` in one step.
    ///
    /// `amount` is already in minor units.
    pub fn build_add_card_and_payment_form(
        &self,
        amount: i64,
        currency: &str,
        order_ref: &str,
        description: &str,
        return_urls: &ReturnUrlSet,
    ) -> GatewayResult<RedirectForm> {
        if amount < 0 {
            return Err(GatewayError::invalid_input(format!(
                "amount must not be negative, got {}",
                amount
            )));
        }
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(GatewayError::invalid_input(format!(
                "currency must be a 3-letter ISO code, got '{}'",
                currency
            )));
        }

        let mut params = self.common_parameters(return_urls);
        params.push(("sph-amount".to_string(), amount.to_string()));
        params.push(("sph-currency".to_string(), currency.to_string()));
        params.push(("sph-order".to_string(), order_ref.to_string()));
        params.push(("description".to_string(), description.to_string()));

        Ok(self.signed(ADD_AND_PAY_URI, params))
    }

    /// Form that only stores a card on the customer's account
    pub fn build_add_card_form(
        &self,
        accept_cvc_required: bool,
        return_urls: &ReturnUrlSet,
    ) -> RedirectForm {
        let mut params = self.common_parameters(return_urls);
        params.push((
            "sph-accept-cvc-required".to_string(),
            accept_cvc_required.to_string(),
        ));

        self.signed(ADD_CARD_URI, params)
    }

    fn common_parameters(&self, return_urls: &ReturnUrlSet) -> Vec<(String, String)> {
        let stamp = self.stamps.stamp();
        vec![
            ("sph-account".to_string(), self.account.clone()),
            ("sph-merchant".to_string(), self.merchant.clone()),
            ("sph-timestamp".to_string(), stamp.timestamp),
            ("sph-request-id".to_string(), stamp.request_id),
            ("sph-success-url".to_string(), return_urls.success_url.clone()),
            ("sph-failure-url".to_string(), return_urls.failure_url.clone()),
            ("sph-cancel-url".to_string(), return_urls.cancel_url.clone()),
            ("language".to_string(), self.language.clone()),
        ]
    }

    fn signed(&self, uri: &str, mut params: Vec<(String, String)>) -> RedirectForm {
        let signature = self.signer.sign(
            FORM_METHOD,
            uri,
            params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            "",
        );
        params.push((SIGNATURE_PARAM.to_string(), signature));

        RedirectForm {
            action_url: format!("{}{}", self.service_url, uri),
            parameters: params,
        }
    }
}
