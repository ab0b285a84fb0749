//! Task message formats carried on the broker.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tasks::EMAIL_TASK_NAME;

/// Queue holding pending email tasks.
pub const EMAIL_TASK_QUEUE: &str = "email_tasks";

/// Positional arguments of the email task: recipient, subject, HTML content.
///
/// Serialized as a three-element JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTaskArgs(pub String, pub String, pub String);

/// A queued task invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMessage {
    /// Unique task identifier, also used as AMQP message and correlation id
    pub id: String,
    /// Registered task name
    pub task: String,
    pub args: EmailTaskArgs,
}

impl TaskMessage {
    /// Create an email task invocation with a fresh id.
    pub fn email(
        recipient_email: impl Into<String>,
        subject: impl Into<String>,
        html_content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            task: EMAIL_TASK_NAME.to_string(),
            args: EmailTaskArgs(recipient_email.into(), subject.into(), html_content.into()),
        }
    }
}
