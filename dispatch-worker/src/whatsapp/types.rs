//! Messaging request/response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Broadcast label attached to template sends when the caller gives none.
pub const DEFAULT_BROADCAST_NAME: &str = "wati_script_test";

/// A named value substituted into a template placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateParameter {
    pub name: String,
    pub value: String,
}

impl TemplateParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Media reference inside a template header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMedia {
    pub url: String,
}

/// Header value for templates with a media or text header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderValue {
    /// e.g. `IMAGE`, `VIDEO`, `DOCUMENT`
    #[serde(rename = "type")]
    pub kind: String,
    pub media: HeaderMedia,
}

impl HeaderValue {
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            kind: "IMAGE".to_string(),
            media: HeaderMedia { url: url.into() },
        }
    }
}

/// Body of a `sendTemplateMessage` call.
#[derive(Debug, Clone, Serialize)]
pub struct TemplatePayload<'a> {
    pub template_name: &'a str,
    pub broadcast_name: &'a str,
    #[serde(skip_serializing_if = "is_empty")]
    pub parameters: &'a [TemplateParameter],
    #[serde(rename = "headerValues", skip_serializing_if = "is_empty")]
    pub header_values: &'a [HeaderValue],
}

fn is_empty<T>(items: &&[T]) -> bool {
    items.is_empty()
}

/// Normalized outcome of one messaging API call.
///
/// `error` is set exactly when `success` is false. `status_code` is absent
/// when no HTTP response was received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl SendResult {
    pub fn ok(data: Value, status_code: u16) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status_code: Some(status_code),
        }
    }

    pub fn api_error(status_code: u16, body: &Value) -> Self {
        let body = match body {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            success: false,
            data: None,
            error: Some(format!("API Error {}: {}", status_code, body)),
            status_code: Some(status_code),
        }
    }

    pub fn unexpected(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(format!("Unexpected error: {}", error)),
            status_code: None,
        }
    }
}
