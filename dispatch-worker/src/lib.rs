//! Dispatch - transactional email and WhatsApp messaging.
//!
//! This library provides shared modules for the Dispatch binaries:
//! - `dispatch-worker`: RabbitMQ worker running queued email tasks
//! - `send-email`: one-off transactional email
//! - `send-whatsapp`: template and session message demo
//! - `send-test-email`: enqueue an email task and wait for its result
//!
//! ## Architecture
//!
//! ```text
//! send-test-email → email_tasks queue → Worker → Brevo API
//!                 ← reply_to queue    ←
//! send-whatsapp   → WATI API
//! ```

pub mod config;
pub mod email;
pub mod error;
pub mod logging;
pub mod queue;
pub mod tasks;
pub mod whatsapp;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::Config;
pub use email::{send_single_email, EmailDefaults, EmailRequest, EmailSendResult};
pub use error::ConfigError;
pub use queue::{Publisher, TaskMessage, EMAIL_TASK_QUEUE};
pub use tasks::{TaskOutcome, EMAIL_TASK_NAME};
pub use whatsapp::{SendResult, WatiClient, WatiSettings};
