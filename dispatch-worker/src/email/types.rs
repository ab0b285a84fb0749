//! Email request, defaults, and result types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    DEFAULT_HTML_CONTENT, DEFAULT_SUBJECT, MISSING_API_KEY_ERROR, MISSING_RECIPIENT_ERROR,
};
use crate::config::Config;

/// A single transactional email. Unset fields fall back to [`EmailDefaults`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailRequest {
    pub recipient_email: Option<String>,
    pub recipient_name: Option<String>,
    pub subject: Option<String>,
    pub html_content: Option<String>,
    pub sender_name: Option<String>,
    pub sender_email: Option<String>,
    pub api_key: Option<String>,
}

impl EmailRequest {
    /// Request with just the three fields the task queue carries.
    pub fn new(
        recipient_email: impl Into<String>,
        subject: impl Into<String>,
        html_content: impl Into<String>,
    ) -> Self {
        Self {
            recipient_email: Some(recipient_email.into()),
            subject: Some(subject.into()),
            html_content: Some(html_content.into()),
            ..Default::default()
        }
    }
}

/// Configuration-side fallbacks for [`EmailRequest`].
#[derive(Debug, Clone)]
pub struct EmailDefaults {
    pub api_key: Option<String>,
    pub api_url: String,
    pub recipient_email: Option<String>,
    pub recipient_name: String,
    pub sender_name: String,
    pub sender_email: String,
}

impl EmailDefaults {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.sendinblue_api_key.clone(),
            api_url: config.brevo_api_url.clone(),
            recipient_email: config.default_recipient_email.clone(),
            recipient_name: config.default_recipient_name.clone(),
            sender_name: config.default_sender_name.clone(),
            sender_email: config.default_sender_email.clone(),
        }
    }

    /// Read the defaults from the current environment.
    pub fn from_env() -> Self {
        Self::from_config(&Config::from_env())
    }
}

/// An [`EmailRequest`] with every field resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEmail {
    pub api_key: String,
    pub recipient_email: String,
    pub recipient_name: String,
    pub subject: String,
    pub html_content: String,
    pub sender_name: String,
    pub sender_email: String,
}

impl ResolvedEmail {
    /// Fill the request from the defaults.
    ///
    /// Returns the user-facing error message when the API key or recipient
    /// cannot be resolved. The API key is checked first.
    pub fn resolve(request: EmailRequest, defaults: &EmailDefaults) -> Result<Self, &'static str> {
        let api_key = non_empty(request.api_key)
            .or_else(|| defaults.api_key.clone().and_then(|k| non_empty(Some(k))));
        let recipient_email = non_empty(request.recipient_email).or_else(|| {
            defaults
                .recipient_email
                .clone()
                .and_then(|r| non_empty(Some(r)))
        });

        let api_key = api_key.ok_or(MISSING_API_KEY_ERROR)?;
        let recipient_email = recipient_email.ok_or(MISSING_RECIPIENT_ERROR)?;

        Ok(Self {
            api_key,
            recipient_email,
            recipient_name: non_empty(request.recipient_name)
                .unwrap_or_else(|| defaults.recipient_name.clone()),
            subject: non_empty(request.subject).unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            html_content: non_empty(request.html_content)
                .unwrap_or_else(|| DEFAULT_HTML_CONTENT.to_string()),
            sender_name: non_empty(request.sender_name)
                .unwrap_or_else(|| defaults.sender_name.clone()),
            sender_email: non_empty(request.sender_email)
                .unwrap_or_else(|| defaults.sender_email.clone()),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Outcome of one transactional send.
///
/// `error` is set exactly when `success` is false; build values through
/// [`EmailSendResult::sent`] and [`EmailSendResult::failed`].
#[derive(Debug, Clone, Serialize)]
pub struct EmailSendResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    /// Raw vendor response body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl EmailSendResult {
    pub fn sent(recipient: String, message_id: Option<String>, response: Value) -> Self {
        Self {
            success: true,
            error: None,
            message_id,
            recipient: Some(recipient),
            response: Some(response),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            message_id: None,
            recipient: None,
            response: None,
        }
    }
}
