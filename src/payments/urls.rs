//! Storefront locations the hosted forms return to

use crate::error::{GatewayError, GatewayResult};
use crate::payments::dispatcher::CallbackKind;
use crate::payments::forms::append_query_parameter;
use crate::payments::types::{Order, ReturnUrlSet};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct StorefrontUrls {
    /// Absolute shop root, e.g. `https://shop.example`
    pub base_url: String,
    pub checkout_path: String,
    pub account_path: String,
    pub add_card_path: String,
}

impl Default for StorefrontUrls {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            checkout_path: "/checkout/".to_string(),
            account_path: "/my-account/".to_string(),
            add_card_path: "/my-account/add-payment-method/".to_string(),
        }
    }
}

impl StorefrontUrls {
    pub fn validate(&self) -> GatewayResult<()> {
        let parsed = url::Url::parse(&self.base_url).map_err(|e| {
            GatewayError::configuration(format!(
                "store base URL '{}' is invalid: {}",
                self.base_url, e
            ))
        })?;
        if parsed.query().is_some() {
            return Err(GatewayError::configuration(
                "store base URL must not carry a query string",
            ));
        }
        Ok(())
    }

    fn absolute(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn checkout_url(&self) -> String {
        self.absolute(&self.checkout_path)
    }

    pub fn account_url(&self) -> String {
        self.absolute(&self.account_path)
    }

    pub fn add_card_url(&self) -> String {
        self.absolute(&self.add_card_path)
    }

    /// "Thank you" page for an order, authorized by its order key
    pub fn order_received_url(&self, order: &Order) -> String {
        let received = format!(
            "{}order-received/{}/",
            ensure_trailing_slash(&self.checkout_url()),
            order.id
        );
        append_query_parameter(&received, &format!("key={}", order.order_key))
    }

    /// Success goes to the order-received page tagged with `flag`; failure
    /// and cancel both go back to checkout
    pub fn checkout_return_urls(
        &self,
        order: &Order,
        flag: CallbackKind,
    ) -> GatewayResult<ReturnUrlSet> {
        let success = append_query_parameter(&self.order_received_url(order), flag.param_name());
        let checkout = self.checkout_url();
        ReturnUrlSet::new(success, checkout.clone(), checkout)
    }

    /// Both outcomes of the add-card form land on the add-card page, tagged
    pub fn add_card_return_urls(&self) -> GatewayResult<ReturnUrlSet> {
        let page = self.add_card_url();
        let success = append_query_parameter(&page, CallbackKind::AddCardSuccess.param_name());
        let failure = append_query_parameter(&page, CallbackKind::AddCardFailure.param_name());
        ReturnUrlSet::new(success, failure.clone(), failure)
    }
}

fn ensure_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storefront() -> StorefrontUrls {
        StorefrontUrls {
            base_url: "https://shop.example/".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_order_received_url() {
        let mut order = Order::new("42", 1999, "EUR");
        order.order_key = "wc_order_abc".to_string();
        assert_eq!(
            storefront().order_received_url(&order),
            "https://shop.example/checkout/order-received/42/?key=wc_order_abc"
        );
    }

    #[test]
    fn test_checkout_return_urls_tag_success_only() {
        let mut order = Order::new("42", 1999, "EUR");
        order.order_key = "wc_order_abc".to_string();
        let urls = storefront()
            .checkout_return_urls(&order, CallbackKind::PaymentSuccess)
            .unwrap();
        assert_eq!(
            urls.success_url,
            "https://shop.example/checkout/order-received/42/?key=wc_order_abc&payment_success"
        );
        assert_eq!(urls.failure_url, "https://shop.example/checkout/");
        assert_eq!(urls.cancel_url, urls.failure_url);
    }

    #[test]
    fn test_add_card_return_urls() {
        let mut store = storefront();
        store.add_card_path = "/?page_id=12".to_string();
        let urls = store.add_card_return_urls().unwrap();
        assert_eq!(urls.success_url, "https://shop.example/?page_id=12&add_card_success");
        assert_eq!(urls.failure_url, "https://shop.example/?page_id=12&add_card_failure");
        assert_eq!(urls.cancel_url, urls.failure_url);
    }

    #[test]
    fn test_validate_rejects_relative_base() {
        let store = StorefrontUrls {
            base_url: "shop.example".to_string(),
            ..Default::default()
        };
        assert!(store.validate().is_err());
        assert!(storefront().validate().is_ok());
    }
}
