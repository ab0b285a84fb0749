//! Async RabbitMQ publisher for submitting tasks.
//!
//! The publisher keeps one connection and channel, shared across tasks and
//! re-established when the channel drops.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use lapin::{
    options::{BasicCancelOptions, BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::types::{TaskMessage, EMAIL_TASK_QUEUE};
use crate::tasks::TaskOutcome;

/// Async RabbitMQ publisher with connection management.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    url: String,
    connection: RwLock<Option<Connection>>,
    channel: RwLock<Option<Channel>>,
}

impl Publisher {
    /// Create a new publisher with the given RabbitMQ URL. Connects lazily.
    pub fn new(url: String) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                url,
                connection: RwLock::new(None),
                channel: RwLock::new(None),
            }),
        }
    }

    /// Ensure we have a valid connection and channel.
    async fn ensure_connected(&self) -> Result<Channel> {
        {
            let channel = self.inner.channel.read().await;
            if let Some(ch) = channel.as_ref() {
                if ch.status().connected() {
                    return Ok(ch.clone());
                }
            }
        }

        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        // Double-check after acquiring write lock
        if let Some(ch) = channel.as_ref() {
            if ch.status().connected() {
                return Ok(ch.clone());
            }
        }

        info!("rabbitmq_publisher_connecting");

        let conn = Connection::connect(&self.inner.url, ConnectionProperties::default())
            .await
            .context("Failed to connect to RabbitMQ")?;

        info!("rabbitmq_publisher_connected");

        let ch = conn
            .create_channel()
            .await
            .context("Failed to create channel")?;

        ch.queue_declare(
            EMAIL_TASK_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("Failed to declare task queue")?;

        info!(queue = EMAIL_TASK_QUEUE, "rabbitmq_queue_declared");

        *connection = Some(conn);
        *channel = Some(ch.clone());

        Ok(ch)
    }

    /// Enqueue an email task without waiting for its result.
    ///
    /// Returns the task id.
    pub async fn submit_email_task(
        &self,
        recipient_email: &str,
        subject: &str,
        html_content: &str,
    ) -> Result<String> {
        let channel = self.ensure_connected().await?;
        let task = TaskMessage::email(recipient_email, subject, html_content);

        publish_task(&channel, &task, None).await?;

        Ok(task.id)
    }

    /// Enqueue an email task and wait up to `timeout` for the worker's reply.
    pub async fn call_email_task(
        &self,
        recipient_email: &str,
        subject: &str,
        html_content: &str,
        timeout: Duration,
    ) -> Result<TaskOutcome> {
        let channel = self.ensure_connected().await?;

        // Server-named queue, removed with its consumer
        let reply_queue = channel
            .queue_declare(
                "",
                QueueDeclareOptions {
                    exclusive: true,
                    auto_delete: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .context("Failed to declare reply queue")?;
        let reply_to = reply_queue.name().as_str().to_string();

        let mut replies = channel
            .basic_consume(
                &reply_to,
                "",
                BasicConsumeOptions {
                    no_ack: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .context("Failed to consume reply queue")?;

        let task = TaskMessage::email(recipient_email, subject, html_content);
        publish_task(&channel, &task, Some(&reply_to)).await?;

        let outcome = tokio::time::timeout(timeout, await_reply(&mut replies, &task.id)).await;

        if let Err(e) = channel
            .basic_cancel(replies.tag().as_str(), BasicCancelOptions::default())
            .await
        {
            warn!(error = %e, "rabbitmq_reply_cancel_failed");
        }

        let outcome = outcome
            .map_err(|_| anyhow!("Timed out after {:?} waiting for task {}", timeout, task.id))??;

        info!(
            task_id = %task.id,
            success = outcome.success,
            "rabbitmq_task_result_received"
        );

        Ok(outcome)
    }

    /// Close the connection gracefully.
    pub async fn close(&self) {
        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        if let Some(ch) = channel.take() {
            if let Err(e) = ch.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_channel_close_error");
            }
        }

        if let Some(conn) = connection.take() {
            if let Err(e) = conn.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_connection_close_error");
            }
        }

        info!("rabbitmq_publisher_closed");
    }
}

/// Wait for the reply whose correlation id matches `task_id`.
async fn await_reply(replies: &mut Consumer, task_id: &str) -> Result<TaskOutcome> {
    while let Some(delivery) = replies.next().await {
        let delivery = delivery.context("Reply delivery failed")?;
        let correlation_id = delivery
            .properties
            .correlation_id()
            .as_ref()
            .map(|s| s.to_string());

        if correlation_id.as_deref() != Some(task_id) {
            warn!(
                task_id = task_id,
                correlation_id = ?correlation_id,
                "rabbitmq_reply_unmatched"
            );
            continue;
        }

        return serde_json::from_slice(&delivery.data).context("Failed to parse task result");
    }

    Err(anyhow!("Reply consumer closed before a result arrived"))
}

/// Publish a task to the task queue as a persistent JSON message.
async fn publish_task(channel: &Channel, task: &TaskMessage, reply_to: Option<&str>) -> Result<()> {
    let body = serde_json::to_vec(task).context("Failed to serialize task")?;

    let mut properties = BasicProperties::default()
        .with_delivery_mode(2) // Persistent
        .with_content_type("application/json".into())
        .with_message_id(task.id.clone().into())
        .with_correlation_id(task.id.clone().into());
    if let Some(queue) = reply_to {
        properties = properties.with_reply_to(queue.into());
    }

    channel
        .basic_publish(
            "",
            EMAIL_TASK_QUEUE,
            BasicPublishOptions::default(),
            &body,
            properties,
        )
        .await
        .context("Failed to publish task")?
        .await
        .context("Failed to confirm publish")?;

    info!(
        queue = EMAIL_TASK_QUEUE,
        task_id = %task.id,
        task = %task.task,
        expects_reply = reply_to.is_some(),
        body_length = body.len(),
        "rabbitmq_task_published"
    );

    Ok(())
}

/// Send a task outcome back to the caller's reply queue.
pub async fn publish_reply(
    channel: &Channel,
    reply_to: &str,
    correlation_id: Option<&str>,
    outcome: &TaskOutcome,
) -> Result<()> {
    let body = serde_json::to_vec(outcome).context("Failed to serialize task result")?;

    let mut properties =
        BasicProperties::default().with_content_type("application/json".into());
    if let Some(id) = correlation_id {
        properties = properties.with_correlation_id(id.into());
    }

    channel
        .basic_publish("", reply_to, BasicPublishOptions::default(), &body, properties)
        .await
        .context("Failed to publish task result")?
        .await
        .context("Failed to confirm task result")?;

    info!(
        reply_to = reply_to,
        correlation_id = ?correlation_id,
        "rabbitmq_task_result_published"
    );

    Ok(())
}
