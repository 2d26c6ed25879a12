use std::{collections::BTreeMap, fmt::Display};

use checkout_engine::checkout_objects::{CartLine, CheckoutRequest};
use serde::{Deserialize, Serialize};

/// The body of `POST /api/checkout`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequestBody {
    #[serde(default)]
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl From<CheckoutRequestBody> for CheckoutRequest {
    fn from(body: CheckoutRequestBody) -> Self {
        // An empty string from a form field means "not chosen"
        let non_blank = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        CheckoutRequest {
            lines: body.items,
            currency: non_blank(body.currency),
            success_url: non_blank(body.success_url),
            cancel_url: non_blank(body.cancel_url),
            metadata: body.metadata,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_currencies: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedCurrencies {
    pub base: String,
    pub currencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn checkout_body_uses_camel_case() {
        let json = r#"{
            "items": [{ "productRef": "scarf-1", "quantity": 2 }],
            "currency": "",
            "successUrl": "https://a.test/ok"
        }"#;
        let body: CheckoutRequestBody = serde_json::from_str(json).unwrap();
        let request = CheckoutRequest::from(body);
        assert_eq!(request.lines, vec![CartLine::new("scarf-1", 2)]);
        assert_eq!(request.currency, None);
        assert_eq!(request.success_url.as_deref(), Some("https://a.test/ok"));
        assert!(request.cancel_url.is_none());
    }

    #[test]
    fn error_body_omits_empty_fields() {
        let body = ErrorBody { error: "not_found".into(), message: None, supported_currencies: None };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"error":"not_found"}"#);
    }
}
