//! RabbitMQ consumer module using lapin.
//!
//! This module handles connecting to RabbitMQ, consuming task messages from
//! the email_tasks queue, and spawning an async task to run each one.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::StreamExt;
use lapin::{
    message::Delivery,
    options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel, Connection, ConnectionProperties,
};
use reqwest::Client;
use tokio::signal;
use tracing::{error, info, warn};

use dispatch::email::EmailDefaults;
use dispatch::queue::publish_reply;
use dispatch::tasks::{decode_task, run_email_task, TaskOutcome};
use dispatch::{Config, EMAIL_TASK_QUEUE};

/// Run the task worker.
///
/// This function:
/// 1. Connects to RabbitMQ using the configured URL
/// 2. Sets QoS prefetch to the configured concurrency
/// 3. Declares the task queue (idempotent operation)
/// 4. Starts consuming messages, spawning a task for each
/// 5. Handles graceful shutdown on SIGINT/SIGTERM
pub async fn run(config: Config) -> Result<()> {
    info!(url_length = config.cloudamqp_url.len(), "rabbitmq_connecting");

    let conn = Connection::connect(&config.cloudamqp_url, ConnectionProperties::default())
        .await
        .context("Failed to connect to RabbitMQ")?;

    info!("rabbitmq_connected");

    let channel = conn.create_channel().await.context("Failed to create channel")?;

    info!("rabbitmq_channel_created");

    let prefetch_count = config.worker_concurrency.min(u16::MAX as usize) as u16;
    channel
        .basic_qos(prefetch_count, BasicQosOptions::default())
        .await
        .context("Failed to set QoS")?;

    info!(prefetch_count = prefetch_count, "rabbitmq_qos_set");

    channel
        .queue_declare(
            EMAIL_TASK_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("Failed to declare queue")?;

    info!(queue = EMAIL_TASK_QUEUE, "rabbitmq_queue_declared");

    // One HTTP client shared by all tasks
    let client = Arc::new(Client::builder().build().context("Failed to create HTTP client")?);

    let mut consumer = channel
        .basic_consume(
            EMAIL_TASK_QUEUE,
            "dispatch-worker",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
        .context("Failed to start consumer")?;

    info!(queue = EMAIL_TASK_QUEUE, "rabbitmq_consumer_started");
    info!("worker_ready");

    let channel = Arc::new(channel);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("worker_stopping");
                break;
            }
            delivery = consumer.next() => {
                match delivery {
                    Some(Ok(delivery)) => {
                        let client = Arc::clone(&client);
                        let channel = Arc::clone(&channel);

                        tokio::spawn(async move {
                            handle_delivery(&channel, &client, delivery).await;
                        });
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "rabbitmq_delivery_error");
                    }
                    None => {
                        warn!("rabbitmq_consumer_closed");
                        break;
                    }
                }
            }
        }
    }

    info!("worker_shutdown_complete");
    Ok(())
}

/// Run one delivered task, reply if asked to, and settle the delivery.
async fn handle_delivery(channel: &Channel, client: &Client, delivery: Delivery) {
    let delivery_tag = delivery.delivery_tag;
    let message_id = delivery
        .properties
        .message_id()
        .as_ref()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let reply_to = delivery.properties.reply_to().as_ref().map(|s| s.to_string());
    let correlation_id = delivery
        .properties
        .correlation_id()
        .as_ref()
        .map(|s| s.to_string());

    info!(
        queue = EMAIL_TASK_QUEUE,
        message_id = %message_id,
        delivery_tag = delivery_tag,
        has_reply_to = reply_to.is_some(),
        "rabbitmq_task_received"
    );

    let task = match decode_task(&delivery.data) {
        Ok(task) => task,
        Err(outcome) => {
            warn!(message_id = %message_id, delivery_tag = delivery_tag, "rabbitmq_task_rejected");
            reply(channel, reply_to.as_deref(), correlation_id.as_deref(), &outcome).await;
            reject(channel, delivery_tag).await;
            return;
        }
    };

    // Defaults resolve at call time, per task
    let defaults = EmailDefaults::from_env();

    let outcome = run_email_task(client, &defaults, task.args).await;

    reply(channel, reply_to.as_deref(), correlation_id.as_deref(), &outcome).await;

    if let Err(e) = channel
        .basic_ack(delivery_tag, BasicAckOptions::default())
        .await
    {
        error!(delivery_tag = delivery_tag, error = %e, "rabbitmq_ack_failed");
    } else {
        info!(
            queue = EMAIL_TASK_QUEUE,
            task_id = %task.id,
            success = outcome.success,
            "rabbitmq_task_completed"
        );
    }
}

async fn reply(
    channel: &Channel,
    reply_to: Option<&str>,
    correlation_id: Option<&str>,
    outcome: &TaskOutcome,
) {
    let Some(reply_to) = reply_to else {
        return;
    };
    if let Err(e) = publish_reply(channel, reply_to, correlation_id, outcome).await {
        error!(reply_to = reply_to, error = %e, "rabbitmq_reply_failed");
    }
}

/// Nack without requeue; a malformed task will not parse on the next try either.
async fn reject(channel: &Channel, delivery_tag: u64) {
    if let Err(e) = channel
        .basic_nack(
            delivery_tag,
            BasicNackOptions {
                requeue: false,
                ..Default::default()
            },
        )
        .await
    {
        error!(delivery_tag = delivery_tag, error = %e, "rabbitmq_nack_failed");
    }
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
