//! API models shared by the resource layer
//!
//! The networking service wraps single resources as `{"<resource>": {...}}`
//! and collections as `{"<resources>": [...]}`. Errors come back as
//! `{"NeutronError": {"type": ..., "message": ..., "detail": ...}}`, or with
//! a bare string in older releases.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Structured error body returned by the networking service
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "NeutronError")]
    pub neutron_error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Structured {
        #[serde(rename = "type", default)]
        error_type: Option<String>,
        message: String,
        #[serde(default)]
        detail: Option<String>,
    },
    Plain(String),
}

/// Extract a human-readable message from an error response body
///
/// Falls back to the trimmed body text, and `None` for an empty body.
pub fn error_message(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return Some(match parsed.neutron_error {
            ErrorDetail::Structured { message, .. } => message,
            ErrorDetail::Plain(message) => message,
        });
    }
    let trimmed = body.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Plural collection name for a resource (`packet_filter` -> `packet_filters`)
pub fn collection_name(resource: &str) -> String {
    if let Some(stem) = resource.strip_suffix("policy") {
        format!("{}policies", stem)
    } else {
        format!("{}s", resource)
    }
}

/// Wrap a resource body as `{"<resource>": body}`
pub fn wrap(resource: &str, body: Map<String, Value>) -> Value {
    let mut outer = Map::new();
    outer.insert(resource.to_string(), Value::Object(body));
    Value::Object(outer)
}
