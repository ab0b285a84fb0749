//! Send one transactional email using the configured defaults.
//!
//! Usage: `send-email [recipient] [subject]`
//!
//! The HTML body is a short announcement; recipient and subject fall back to
//! `DEFAULT_RECIPIENT_EMAIL` and a fixed subject line.

use anyhow::Result;
use reqwest::Client;

use dispatch::config::{self, mask_secret, or_not_set};
use dispatch::{logging, send_single_email, Config, EmailDefaults, EmailRequest};

#[tokio::main]
async fn main() -> Result<()> {
    let config_file = config::load_config_file();
    let _guard = logging::init(None);
    config_file.log();
    let config = Config::from_env();

    print_email_config(&config);

    let mut args = std::env::args().skip(1);
    let request = EmailRequest {
        recipient_email: args.next(),
        subject: Some(
            args.next()
                .unwrap_or_else(|| "Special Announcement from Config!".to_string()),
        ),
        html_content: Some(
            "<h2>Hello!</h2><p>This email was sent using configuration loaded from config.env file!</p><p>All settings are now centralized and secure!</p>"
                .to_string(),
        ),
        ..Default::default()
    };

    let client = Client::builder().build()?;
    let result = send_single_email(&client, &EmailDefaults::from_config(&config), request).await;

    if result.success {
        println!("Email delivery initiated successfully!");
        println!("Sent to: {}", result.recipient.as_deref().unwrap_or_default());
        if let Some(id) = &result.message_id {
            println!("Message ID: {}", id);
        }
    } else {
        println!(
            "Failed to send email: {}",
            result.error.as_deref().unwrap_or_default()
        );
        std::process::exit(1);
    }

    Ok(())
}

fn print_email_config(config: &Config) {
    println!("=== Email Configuration ===");
    println!("API Key: {}", mask_secret(config.sendinblue_api_key.as_deref()));
    println!(
        "Default Sender: {} <{}>",
        config.default_sender_name, config.default_sender_email
    );
    println!(
        "Default Recipient: {} <{}>",
        config.default_recipient_name,
        or_not_set(config.default_recipient_email.as_deref())
    );
    println!("{}", "=".repeat(27));
}
