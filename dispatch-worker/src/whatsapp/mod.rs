//! WhatsApp business messaging through the WATI REST API.
//!
//! Two sends are supported:
//! - template messages (`sendTemplateMessage`), which may open a conversation
//! - session messages (`sendSessionMessage`), free-form text inside an open one

pub mod client;
pub mod retry;
pub mod types;

pub use client::{normalize_phone_number, WatiClient, WatiSettings, REQUEST_TIMEOUT};
pub use retry::RetryPolicy;
pub use types::{
    HeaderMedia, HeaderValue, SendResult, TemplateParameter, DEFAULT_BROADCAST_NAME,
};
