//! Dispatch Worker - async RabbitMQ consumer for queued email tasks.
//!
//! This worker takes `email_tasks.send_email_task` invocations from the
//! email_tasks queue, sends each email through Brevo, and replies with a
//! plain-scalar result when the caller asked for one.

mod consumer;

use anyhow::Result;

use dispatch::{logging, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config_file = dispatch::config::load_config_file();
    let _guard = logging::init(None);
    config_file.log();

    tracing::info!("worker_starting");

    let config = Config::from_env();
    tracing::info!(
        cloudamqp_url_set = !config.cloudamqp_url.is_empty(),
        concurrency = config.worker_concurrency,
        sendinblue_api_key_set = config.sendinblue_api_key.is_some(),
        default_sender = %config.default_sender_email,
        "config_loaded"
    );

    consumer::run(config).await?;

    Ok(())
}
