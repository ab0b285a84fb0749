//! Queued email task.
//!
//! The worker runs the email sender for each task and narrows its result to
//! a [`TaskOutcome`], which holds only booleans, strings, and nulls so it
//! can be serialized back to the caller. The vendor response body is not
//! carried over.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::email::{send_single_email, EmailDefaults, EmailRequest, EmailSendResult};
use crate::queue::{EmailTaskArgs, TaskMessage};

/// Registered name of the email task.
pub const EMAIL_TASK_NAME: &str = "email_tasks.send_email_task";

/// Plain-scalar result of an email task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub success: bool,
    pub message: String,
    pub recipient: Option<String>,
    pub error: Option<String>,
}

impl TaskOutcome {
    pub fn from_send_result(result: &EmailSendResult) -> Self {
        if result.success {
            Self {
                success: true,
                message: "Email sent successfully".to_string(),
                recipient: result.recipient.clone(),
                error: None,
            }
        } else {
            Self {
                success: false,
                message: "Email failed".to_string(),
                recipient: result.recipient.clone(),
                error: Some(result.error.clone().unwrap_or_default()),
            }
        }
    }

    /// Outcome for a task the worker could not run at all.
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: "Email failed".to_string(),
            recipient: None,
            error: Some(error.into()),
        }
    }
}

/// Decode a delivered task body, rejecting unparseable bodies and unknown
/// task names.
pub fn decode_task(body: &[u8]) -> Result<TaskMessage, TaskOutcome> {
    let task: TaskMessage = serde_json::from_slice(body).map_err(|e| {
        error!(
            error = %e,
            body_preview = %String::from_utf8_lossy(&body[..body.len().min(500)]),
            "task_parse_failed"
        );
        TaskOutcome::rejected(format!("Invalid task message: {}", e))
    })?;

    if task.task != EMAIL_TASK_NAME {
        error!(task_id = %task.id, task = %task.task, "task_unknown");
        return Err(TaskOutcome::rejected(format!("Unknown task: {}", task.task)));
    }

    Ok(task)
}

/// Run one email task.
pub async fn run_email_task(
    client: &Client,
    defaults: &EmailDefaults,
    args: EmailTaskArgs,
) -> TaskOutcome {
    let EmailTaskArgs(recipient_email, subject, html_content) = args;

    let result = send_single_email(
        client,
        defaults,
        EmailRequest::new(recipient_email, subject, html_content),
    )
    .await;

    let outcome = TaskOutcome::from_send_result(&result);

    info!(
        success = outcome.success,
        recipient = ?outcome.recipient,
        error = ?outcome.error,
        "email_task_complete"
    );

    outcome
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::Value;

    use super::*;
    use crate::test_support::spawn_server;

    fn assert_plain_scalars(outcome: &TaskOutcome) {
        let json = serde_json::to_value(outcome).unwrap();
        let fields = json.as_object().unwrap();
        assert_eq!(fields.len(), 4);
        for (key, value) in fields {
            assert!(
                matches!(value, Value::Bool(_) | Value::String(_) | Value::Null),
                "{} is not a scalar: {}",
                key,
                value
            );
        }
    }

    fn defaults(api_url: &str) -> EmailDefaults {
        EmailDefaults {
            api_key: Some("key".to_string()),
            api_url: api_url.to_string(),
            recipient_email: None,
            recipient_name: String::new(),
            sender_name: "Sender".to_string(),
            sender_email: "sender@example.com".to_string(),
        }
    }

    #[test]
    fn test_outcome_from_success_drops_response() {
        let result = EmailSendResult::sent(
            "to@example.com".to_string(),
            Some("<id@relay>".to_string()),
            serde_json::json!({"messageId": "<id@relay>", "nested": {"a": [1, 2]}}),
        );

        let outcome = TaskOutcome::from_send_result(&result);

        assert!(outcome.success);
        assert_eq!(outcome.message, "Email sent successfully");
        assert_eq!(outcome.recipient.as_deref(), Some("to@example.com"));
        assert_eq!(outcome.error, None);
        assert_plain_scalars(&outcome);
    }

    #[test]
    fn test_outcome_from_failure() {
        let outcome = TaskOutcome::from_send_result(&EmailSendResult::failed("API Error: (400) bad"));

        assert!(!outcome.success);
        assert_eq!(outcome.message, "Email failed");
        assert_eq!(outcome.recipient, None);
        assert_eq!(outcome.error.as_deref(), Some("API Error: (400) bad"));
        assert_plain_scalars(&outcome);
    }

    #[test]
    fn test_rejected_outcome_is_scalar() {
        assert_plain_scalars(&TaskOutcome::rejected("unknown task"));
    }

    #[test]
    fn test_decode_task_accepts_email_task() {
        let body = serde_json::to_vec(&TaskMessage::email("to@example.com", "Hi", "<p>x</p>")).unwrap();

        let task = decode_task(&body).unwrap();

        assert_eq!(task.task, EMAIL_TASK_NAME);
        assert_eq!(task.args.0, "to@example.com");
    }

    #[test]
    fn test_decode_task_rejects_malformed_json() {
        let outcome = decode_task(b"{not json").unwrap_err();

        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap().starts_with("Invalid task message:"));
        assert_plain_scalars(&outcome);
    }

    #[test]
    fn test_decode_task_rejects_wrong_arity() {
        let body = serde_json::json!({
            "id": "t-1",
            "task": EMAIL_TASK_NAME,
            "args": ["to@example.com", "Subject"]
        });

        let outcome = decode_task(body.to_string().as_bytes()).unwrap_err();

        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap().starts_with("Invalid task message:"));
        assert_plain_scalars(&outcome);
    }

    #[test]
    fn test_decode_task_rejects_unknown_task() {
        let body = serde_json::json!({
            "id": "t-2",
            "task": "email_tasks.send_bulk",
            "args": ["to@example.com", "Subject", "<p>x</p>"]
        });

        let outcome = decode_task(body.to_string().as_bytes()).unwrap_err();

        assert!(!outcome.success);
        assert_eq!(outcome.message, "Email failed");
        assert_eq!(outcome.error.as_deref(), Some("Unknown task: email_tasks.send_bulk"));
        assert_plain_scalars(&outcome);
    }

    #[tokio::test]
    async fn test_run_email_task_success() {
        let app = Router::new().route(
            "/smtp/email",
            post(|| async {
                (
                    StatusCode::CREATED,
                    Json(serde_json::json!({"messageId": "<m1@relay>"})),
                )
            }),
        );
        let base = spawn_server(app).await;

        let outcome = run_email_task(
            &Client::new(),
            &defaults(&base),
            EmailTaskArgs(
                "to@example.com".to_string(),
                "Subject".to_string(),
                "<p>Body</p>".to_string(),
            ),
        )
        .await;

        assert!(outcome.success);
        assert_eq!(outcome.recipient.as_deref(), Some("to@example.com"));
        assert_plain_scalars(&outcome);
    }

    #[tokio::test]
    async fn test_run_email_task_vendor_failure() {
        let app = Router::new().route(
            "/smtp/email",
            post(|| async { (StatusCode::BAD_REQUEST, Json(serde_json::json!({"code": "invalid_parameter"}))) }),
        );
        let base = spawn_server(app).await;

        let outcome = run_email_task(
            &Client::new(),
            &defaults(&base),
            EmailTaskArgs(
                "to@example.com".to_string(),
                "Subject".to_string(),
                "<p>Body</p>".to_string(),
            ),
        )
        .await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("invalid_parameter"));
    }
}
