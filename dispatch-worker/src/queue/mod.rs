//! Queue module for RabbitMQ operations.
//!
//! This module provides:
//! - The task message format
//! - An async publisher for submitting tasks and awaiting their results
//!
//! ## Flow
//!
//! ```text
//! Publisher → email_tasks queue → Worker → reply_to queue → Publisher
//! ```

pub mod publisher;
pub mod types;

pub use publisher::{publish_reply, Publisher};
pub use types::{EmailTaskArgs, TaskMessage, EMAIL_TASK_QUEUE};
