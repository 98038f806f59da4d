//! Payment Highway request signing
//!
//! Both the hosted form parameters and the REST calls are authenticated with
//! an `SPH1` signature: HMAC-SHA256 over the method, the URI, every `sph-`
//! prefixed key/value pair in key order, and the trimmed body.

use crate::error::{GatewayError, GatewayResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signature scheme tag prepended to every signature
pub const SIGNATURE_SCHEME: &str = "SPH1";

/// Name of the parameter carrying the signature on form redirects
pub const SIGNATURE_PARAM: &str = "signature";

const SPH_PREFIX: &str = "sph-";

#[derive(Clone)]
pub struct SecureSigner {
    key_id: String,
    secret: String,
}

impl std::fmt::Debug for SecureSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureSigner")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl SecureSigner {
    pub fn new(key_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            secret: secret.into(),
        }
    }

    /// Full `SPH1 <key id> <hex mac>` value
    pub fn sign<I, K, V>(&self, method: &str, uri: &str, key_values: I, body: &str) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        format!(
            "{} {} {}",
            SIGNATURE_SCHEME,
            self.key_id,
            self.create_signature(method, uri, key_values, body)
        )
    }

    /// Hex encoded HMAC-SHA256 of the canonical request text
    pub fn create_signature<I, K, V>(
        &self,
        method: &str,
        uri: &str,
        key_values: I,
        body: &str,
    ) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let text = format!(
            "{}\n{}\n{}\n{}",
            method,
            uri,
            key_value_string(key_values),
            body.trim()
        );

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(text.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Check the `signature` parameter of a hosted form redirect.
    ///
    /// The redirect is signed as a `GET` with an empty URI and body.
    pub fn validate_form_redirect<I, K, V>(&self, params: I) -> GatewayResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let pairs: Vec<(K, V)> = params.into_iter().collect();
        let received = pairs
            .iter()
            .find(|(key, _)| key.as_ref() == SIGNATURE_PARAM)
            .map(|(_, value)| value.as_ref().to_string())
            .ok_or(GatewayError::SignatureInvalid)?;

        let expected = self.sign(
            "GET",
            "",
            pairs.iter().map(|(k, v)| (k.as_ref(), v.as_ref())),
            "",
        );

        if constant_time_eq(expected.as_bytes(), received.trim().as_bytes()) {
            Ok(())
        } else {
            Err(GatewayError::SignatureInvalid)
        }
    }
}

/// `key:value` lines for every `sph-` key, lowercased and sorted
fn key_value_string<I, K, V>(key_values: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut lines: Vec<(String, String)> = key_values
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_lowercase(), v.as_ref().to_string()))
        .filter(|(k, _)| k.starts_with(SPH_PREFIX))
        .collect();
    lines.sort_by(|a, b| a.0.cmp(&b.0));

    lines
        .iter()
        .map(|(k, v)| format!("{}:{}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}
