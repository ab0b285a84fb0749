//! WhatsApp demo: two template sends and one session message.
//!
//! Sends to `DEFAULT_PHONE_NUMBER` (or the first argument), pausing
//! `WATI_SEND_PAUSE_SECS` seconds (default 20) between sends.

use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use tokio::time::sleep;

use dispatch::config::{self, env_non_empty, mask_secret, or_not_set};
use dispatch::whatsapp::{HeaderValue, TemplateParameter, DEFAULT_BROADCAST_NAME};
use dispatch::{logging, Config, SendResult, WatiClient};

#[tokio::main]
async fn main() -> Result<()> {
    let config_file = config::load_config_file();
    let _guard = logging::init(Some(&config::wati_log_file()));
    config_file.log();
    let config = Config::from_env();

    print_wati_config(&config);

    let phone = std::env::args()
        .nth(1)
        .or_else(|| config.default_phone_number.clone())
        .unwrap_or_else(|| "+918128557443".to_string());
    let pause = Duration::from_secs(
        env_non_empty("WATI_SEND_PAUSE_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(20),
    );

    let client = match WatiClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            println!("Configuration Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("\nSending approved template message with header...");
    let result = client
        .send_template_message(
            &phone,
            "test_image_message",
            &[],
            &[HeaderValue::image(
                "https://via.placeholder.com/400x300.png?text=WATI+Header",
            )],
            DEFAULT_BROADCAST_NAME,
        )
        .await;
    print_result(&result);
    sleep(pause).await;

    println!("\nSending approved template message without header...");
    let otp = rand::thread_rng().gen_range(100_000..=999_999).to_string();
    let result = client
        .send_template_message(
            &phone,
            "test_text_otp",
            &[TemplateParameter::new("1", otp)],
            &[],
            DEFAULT_BROADCAST_NAME,
        )
        .await;
    print_result(&result);
    sleep(pause).await;

    println!("\nSending session message (non-template)...");
    let result = client
        .send_session_message(
            &phone,
            "Hello! This is a direct message using the WATI session API.",
        )
        .await;
    print_result(&result);

    Ok(())
}

fn print_result(result: &SendResult) {
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("{}", json),
        Err(_) => println!("{:?}", result),
    }
}

fn print_wati_config(config: &Config) {
    println!("=== WATI WhatsApp Configuration ===");
    println!("API Key: {}", mask_secret(config.wati_api_key.as_deref()));
    println!("Base URL: {}", or_not_set(config.wati_base_url.as_deref()));
    println!("Instance ID: {}", or_not_set(config.wati_instance_id.as_deref()));
    println!(
        "Default Phone: {}",
        or_not_set(config.default_phone_number.as_deref())
    );
    println!("Sender Name: {}", config.default_sender_name);
    println!("{}", "=".repeat(35));
}
