//! Enqueue one email task and wait for the worker's result.
//!
//! Usage: `send-test-email [recipient]`

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use dispatch::{config, logging, Config, Publisher};

const TEST_SUBJECT: &str = "Test Email via the task queue!";

const TEST_HTML: &str = r#"
    <h2>Hello!</h2>
    <p>This is a test email sent in the background by the Dispatch worker and Brevo.</p>
    <p><strong>Nice job setting this up!</strong></p>
"#;

#[tokio::main]
async fn main() -> Result<()> {
    let config_file = config::load_config_file();
    let _guard = logging::init(None);
    config_file.log();
    let config = Config::from_env();

    let recipient = std::env::args()
        .nth(1)
        .or_else(|| config.default_recipient_email.clone())
        .context("No recipient given and DEFAULT_RECIPIENT_EMAIL is not set")?;
    let timeout = Duration::from_secs(config.task_result_timeout_secs);

    let publisher = Publisher::new(config.cloudamqp_url.clone());

    info!(recipient = %recipient, timeout_secs = timeout.as_secs(), "test_email_enqueueing");
    println!("Email task sent. Waiting for confirmation...");

    let result = publisher
        .call_email_task(&recipient, TEST_SUBJECT, TEST_HTML, timeout)
        .await;

    publisher.close().await;

    let outcome = result?;
    println!("Result: {}", serde_json::to_string(&outcome)?);

    Ok(())
}
