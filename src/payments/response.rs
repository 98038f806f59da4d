//! Typed Payment Highway API responses
//!
//! Every REST answer carries `result.code`; 100 is the only success code.
//! The body is decoded once here and callers match on [`VendorResponse`].

use crate::error::{GatewayError, GatewayResult};
use crate::payments::types::CardInfo;
use serde::Deserialize;

/// The one result code that means the vendor accepted the request
pub const RESULT_OK: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResultStatus {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Payload of an accepted request; fields present depend on the call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VendorSuccess {
    pub message: String,
    /// Transaction id, returned by transaction init
    pub transaction_id: Option<String>,
    pub card_token: Option<String>,
    pub card: Option<CardInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VendorResponse {
    Success(VendorSuccess),
    Rejected { code: i64, message: String },
}

// Wire shape, kept private so nothing outside this module sees loose JSON
#[derive(Debug, Deserialize)]
struct RawResponse {
    result: ResultStatus,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    card_token: Option<String>,
    #[serde(default)]
    card: Option<CardInfo>,
}

impl VendorResponse {
    /// Decode a response body
    pub fn from_body(body: &str) -> GatewayResult<Self> {
        let raw: RawResponse = serde_json::from_str(body).map_err(|e| {
            GatewayError::malformed(format!("{} in body '{}'", e, truncate(body, 200)))
        })?;

        if raw.result.code == RESULT_OK {
            Ok(VendorResponse::Success(VendorSuccess {
                message: raw.result.message,
                transaction_id: raw.id,
                card_token: raw.card_token,
                card: raw.card,
            }))
        } else {
            Ok(VendorResponse::Rejected {
                code: raw.result.code,
                message: raw.result.message,
            })
        }
    }

    pub fn success(payload: VendorSuccess) -> Self {
        VendorResponse::Success(payload)
    }

    pub fn rejected(code: i64, message: impl Into<String>) -> Self {
        VendorResponse::Rejected {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            VendorResponse::Success(_) => RESULT_OK,
            VendorResponse::Rejected { code, .. } => *code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            VendorResponse::Success(payload) => &payload.message,
            VendorResponse::Rejected { message, .. } => message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, VendorResponse::Success(_))
    }

    /// Turn a rejection into [`GatewayError::VendorRejected`]
    pub fn into_result(self) -> GatewayResult<VendorSuccess> {
        match self {
            VendorResponse::Success(payload) => Ok(payload),
            VendorResponse::Rejected { code, message } => {
                Err(GatewayError::VendorRejected { code, message })
            }
        }
    }
}

fn truncate(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::types::CvcRequired;

    #[test]
    fn test_decode_init_success() {
        let response = VendorResponse::from_body(
            r#"{"id":"f23a9be0-15fe-43df-98ac-92f6a5731c3b","result":{"code":100,"message":"OK"}}"#,
        )
        .unwrap();
        match response {
            VendorResponse::Success(payload) => {
                assert_eq!(
                    payload.transaction_id.as_deref(),
                    Some("f23a9be0-15fe-43df-98ac-92f6a5731c3b")
                );
                assert!(payload.card.is_none());
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_tokenize_success() {
        let body = r#"{
            "card_token": "71435029-fbb6-4506-aa86-8529efb640b0",
            "card": {
                "type": "Visa",
                "partial_pan": "0024",
                "expire_year": "2023",
                "expire_month": "11",
                "cvc_required": "not_tested",
                "bin": "415301",
                "funding": "debit"
            },
            "result": {"code": 100, "message": "OK"}
        }"#;
        let payload = VendorResponse::from_body(body).unwrap().into_result().unwrap();
        assert_eq!(
            payload.card_token.as_deref(),
            Some("71435029-fbb6-4506-aa86-8529efb640b0")
        );
        assert_eq!(payload.card.unwrap().cvc_required, CvcRequired::NotTested);
    }

    #[test]
    fn test_decode_rejection() {
        let response =
            VendorResponse::from_body(r#"{"result":{"code":200,"message":"declined"}}"#).unwrap();
        assert_eq!(response, VendorResponse::rejected(200, "declined"));
        assert_eq!(response.code(), 200);

        let err = response.into_result().unwrap_err();
        assert!(matches!(err, GatewayError::VendorRejected { code: 200, .. }));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(
            VendorResponse::from_body("<html>Bad gateway</html>"),
            Err(GatewayError::MalformedResponse { .. })
        ));
        assert!(matches!(
            VendorResponse::from_body(r#"{"id":"tx"}"#),
            Err(GatewayError::MalformedResponse { .. })
        ));
    }
}
