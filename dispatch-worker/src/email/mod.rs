//! Transactional email dispatch through the Brevo (Sendinblue) REST API.
//!
//! Every field of an [`EmailRequest`] is optional. Missing fields are filled
//! from [`EmailDefaults`] at call time, so a bare request sends a default
//! message to the configured default recipient.
//!
//! Failures never propagate: they are logged and folded into an
//! [`EmailSendResult`] with `success == false`.

pub mod brevo;
pub mod types;

pub use brevo::{send_email_from_env, send_single_email};
pub use types::{EmailDefaults, EmailRequest, EmailSendResult, ResolvedEmail};

/// Base URL of the Brevo v3 API.
pub const DEFAULT_BREVO_API_URL: &str = "https://api.brevo.com/v3";

pub const DEFAULT_SENDER_NAME: &str = "Your Company";

pub const DEFAULT_SENDER_EMAIL: &str = "your.email@company.com";

pub const DEFAULT_SUBJECT: &str = "Default Subject - Email from Config";

pub const DEFAULT_HTML_CONTENT: &str = "<h2>Hello!</h2><p>This is a test email sent using configuration from config.env file!</p><p>Thank you for your attention!</p>";

pub const MISSING_API_KEY_ERROR: &str = "API key not found. Please check config.env file";

pub const MISSING_RECIPIENT_ERROR: &str =
    "Recipient email not found. Please provide recipient_email or set DEFAULT_RECIPIENT_EMAIL in config.env";
