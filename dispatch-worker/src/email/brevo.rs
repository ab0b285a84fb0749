//! Brevo transactional send (`POST /smtp/email`).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use super::types::{EmailDefaults, EmailRequest, EmailSendResult, ResolvedEmail};

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct Contact<'a> {
    email: &'a str,
    name: &'a str,
}

/// Request body for Brevo's transactional email endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendSmtpEmail<'a> {
    sender: Contact<'a>,
    to: Vec<Contact<'a>>,
    subject: &'a str,
    html_content: &'a str,
}

impl<'a> From<&'a ResolvedEmail> for SendSmtpEmail<'a> {
    fn from(email: &'a ResolvedEmail) -> Self {
        Self {
            sender: Contact {
                email: &email.sender_email,
                name: &email.sender_name,
            },
            to: vec![Contact {
                email: &email.recipient_email,
                name: &email.recipient_name,
            }],
            subject: &email.subject,
            html_content: &email.html_content,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSmtpEmail {
    message_id: Option<String>,
}

/// Failure modes of the vendor call, before they are flattened into a result.
#[derive(Debug, thiserror::Error)]
enum SendError {
    #[error("API Error: ({status}) {body}")]
    Api { status: u16, body: String },
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Send a single transactional email.
///
/// Missing request fields are resolved against `defaults`. The API key and
/// recipient are required; without them no request is made. Errors are
/// logged and returned inside the result.
pub async fn send_single_email(
    client: &Client,
    defaults: &EmailDefaults,
    request: EmailRequest,
) -> EmailSendResult {
    let email = match ResolvedEmail::resolve(request, defaults) {
        Ok(email) => email,
        Err(message) => {
            error!(error = message, "email_config_invalid");
            return EmailSendResult::failed(message);
        }
    };

    info!(
        recipient = %email.recipient_email,
        sender = %email.sender_email,
        subject = %email.subject,
        html_length = email.html_content.len(),
        "email_send_starting"
    );

    match post_transactional(client, &defaults.api_url, &email).await {
        Ok(body) => {
            let message_id = serde_json::from_value::<CreateSmtpEmail>(body.clone())
                .ok()
                .and_then(|r| r.message_id);

            info!(
                recipient = %email.recipient_email,
                message_id = ?message_id,
                "email_send_succeeded"
            );

            EmailSendResult::sent(email.recipient_email, message_id, body)
        }
        Err(e) => {
            error!(
                recipient = %email.recipient_email,
                error = %e,
                "email_send_failed"
            );
            EmailSendResult::failed(e.to_string())
        }
    }
}

/// Build a client and read the defaults from the environment at call time.
pub async fn send_email_from_env(request: EmailRequest) -> EmailSendResult {
    let client = match Client::builder().build() {
        Ok(c) => c,
        Err(e) => return EmailSendResult::failed(format!("Unexpected error: {}", e)),
    };
    send_single_email(&client, &EmailDefaults::from_env(), request).await
}

async fn post_transactional(
    client: &Client,
    api_url: &str,
    email: &ResolvedEmail,
) -> Result<Value, SendError> {
    let url = format!("{}/smtp/email", api_url.trim_end_matches('/'));

    let response = client
        .post(&url)
        .header("api-key", &email.api_key)
        .header("accept", "application/json")
        .json(&SendSmtpEmail::from(email))
        .timeout(SEND_TIMEOUT)
        .send()
        .await
        .map_err(|e| SendError::Unexpected(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| SendError::Unexpected(e.to_string()))?;

    if !status.is_success() {
        return Err(SendError::Api {
            status: status.as_u16(),
            body: text,
        });
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&text).map_err(|e| SendError::Unexpected(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};

    use super::*;
    use crate::email::{MISSING_API_KEY_ERROR, MISSING_RECIPIENT_ERROR};
    use crate::test_support::spawn_server;

    fn defaults(api_url: &str) -> EmailDefaults {
        EmailDefaults {
            api_key: Some("test-key".to_string()),
            api_url: api_url.to_string(),
            recipient_email: Some("default@example.com".to_string()),
            recipient_name: String::new(),
            sender_name: "Sender Co".to_string(),
            sender_email: "sender@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_request() {
        let defaults = EmailDefaults {
            api_key: None,
            ..defaults("http://127.0.0.1:9")
        };

        let result = send_single_email(&Client::new(), &defaults, EmailRequest::default()).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(MISSING_API_KEY_ERROR));
        assert!(result.error.unwrap().contains("API key"));
    }

    #[tokio::test]
    async fn test_missing_recipient_fails_without_request() {
        let defaults = EmailDefaults {
            recipient_email: None,
            ..defaults("http://127.0.0.1:9")
        };

        let result = send_single_email(&Client::new(), &defaults, EmailRequest::default()).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(MISSING_RECIPIENT_ERROR));
        assert!(result.error.unwrap().contains("Recipient"));
    }

    #[tokio::test]
    async fn test_successful_send() {
        type Seen = Arc<Mutex<Option<(String, Value)>>>;
        let seen: Seen = Arc::new(Mutex::new(None));

        let app = Router::new()
            .route(
                "/smtp/email",
                post(
                    |State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>| async move {
                        let key = headers
                            .get("api-key")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        *seen.lock().unwrap() = Some((key, body));
                        (
                            StatusCode::CREATED,
                            Json(serde_json::json!({"messageId": "<abc@smtp-relay.mailin.fr>"})),
                        )
                    },
                ),
            )
            .with_state(seen.clone());
        let base = spawn_server(app).await;

        let result = send_single_email(
            &Client::new(),
            &defaults(&base),
            EmailRequest::new("to@example.com", "Hello", "<p>Hi</p>"),
        )
        .await;

        assert!(result.success);
        assert!(result.error.is_none());
        assert_eq!(result.message_id.as_deref(), Some("<abc@smtp-relay.mailin.fr>"));
        assert_eq!(result.recipient.as_deref(), Some("to@example.com"));
        assert!(result.response.is_some());

        let (key, body) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(key, "test-key");
        assert_eq!(body["to"][0]["email"], "to@example.com");
        assert_eq!(body["sender"]["name"], "Sender Co");
        assert_eq!(body["subject"], "Hello");
        assert_eq!(body["htmlContent"], "<p>Hi</p>");
    }

    #[tokio::test]
    async fn test_send_email_from_env_reads_key_at_call_time() {
        std::env::remove_var("SENDINBLUE_API_KEY");

        let result =
            send_email_from_env(EmailRequest::new("to@example.com", "Hello", "<p>Hi</p>")).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(MISSING_API_KEY_ERROR));

        let app = Router::new().route(
            "/smtp/email",
            post(|headers: HeaderMap| async move {
                let key = headers
                    .get("api-key")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                (StatusCode::CREATED, Json(serde_json::json!({"messageId": key})))
            }),
        );
        let base = spawn_server(app).await;
        std::env::set_var("SENDINBLUE_API_KEY", "env-key");
        std::env::set_var("BREVO_API_URL", &base);

        let result =
            send_email_from_env(EmailRequest::new("to@example.com", "Hello", "<p>Hi</p>")).await;

        std::env::remove_var("SENDINBLUE_API_KEY");
        std::env::remove_var("BREVO_API_URL");

        assert!(result.success, "{:?}", result);
        assert_eq!(result.message_id.as_deref(), Some("env-key"));
    }

    #[tokio::test]
    async fn test_api_error_is_returned_not_raised() {
        let app = Router::new().route(
            "/smtp/email",
            post(|| async { (StatusCode::UNAUTHORIZED, r#"{"code":"unauthorized"}"#) }),
        );
        let base = spawn_server(app).await;

        let result = send_single_email(&Client::new(), &defaults(&base), EmailRequest::default()).await;

        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.starts_with("API Error: (401)"));
        assert!(error.contains("unauthorized"));
    }

    #[tokio::test]
    async fn test_transport_error_is_unexpected() {
        // Nothing listens on the discard port
        let result = send_single_email(
            &Client::new(),
            &defaults("http://127.0.0.1:9"),
            EmailRequest::default(),
        )
        .await;

        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("Unexpected error:"));
    }
}
