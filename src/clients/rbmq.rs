use std::sync::Arc;

use anyhow::{Error, Result, anyhow};
use futures_util::StreamExt;
use lapin::{
    Channel, Connection, ConnectionProperties, Consumer,
    options::{BasicAckOptions, BasicConsumeOptions, QueueDeclareOptions},
    types::FieldTable,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dead_letter::DeadLetterService;
use crate::models::notification::NotificationRequest;
use crate::queue::PriorityNotificationQueue;

const INGEST_SOURCE: &str = "rabbitmq-ingest";

/// Routing decision for one inbound payload, independent of the broker: a
/// well-formed request is enqueued; anything that does not deserialize is
/// dead-lettered with the raw payload and never reaches the queue.
pub async fn route_inbound_payload(
    payload: &[u8],
    topic: &str,
    queue: &PriorityNotificationQueue,
    dead_letters: &DeadLetterService,
) {
    match serde_json::from_slice::<NotificationRequest>(payload) {
        Ok(request) => {
            queue.enqueue(request);
        }
        Err(e) => {
            let raw_payload = String::from_utf8_lossy(payload);
            warn!(error = %e, "Malformed inbound payload, routing to dead letter");

            if let Err(publish_err) = dead_letters
                .publish(
                    topic,
                    &raw_payload,
                    &format!("Failed to deserialize notification request: {e}"),
                    INGEST_SOURCE,
                )
                .await
            {
                error!(error = %publish_err, "Failed to dead-letter malformed payload");
            }
        }
    }
}

/// Broker-facing ingestion adapter. Consumes raw events, turns them into
/// [`NotificationRequest`]s and feeds the priority queue; payloads that do
/// not deserialize go straight to the dead-letter store, never the queue.
pub struct RabbitMqClient {
    channel: Channel,
    notifications_queue_name: String,
}

impl RabbitMqClient {
    pub async fn connect(config: &Config) -> Result<Self, Error> {
        info!("Connecting to RabbitMQ");

        let connection = Connection::connect(&config.rabbitmq_url, ConnectionProperties::default())
            .await
            .map_err(|_| anyhow!("Failed to connect to RabbitMQ"))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|_| anyhow!("RabbitMQ channel creation failed"))?;

        channel
            .queue_declare(
                &config.notifications_queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|_| anyhow!("Failed to declare notifications queue"))?;

        info!(
            queue = %config.notifications_queue_name,
            "RabbitMQ connection established"
        );

        Ok(Self {
            channel,
            notifications_queue_name: config.notifications_queue_name.clone(),
        })
    }

    pub async fn create_consumer(&self) -> Result<Consumer, Error> {
        let consumer = self
            .channel
            .basic_consume(
                &self.notifications_queue_name,
                "notify_ingest",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|_| anyhow!("Failed to create consumer"))?;

        info!(queue = %self.notifications_queue_name, "Ingest consumer created");

        Ok(consumer)
    }

    /// Drains the broker until cancelled. Each delivery is acked whether it
    /// was enqueued or dead-lettered; a malformed payload is never requeued.
    pub async fn run_ingest_loop(
        &self,
        mut consumer: Consumer,
        queue: Arc<PriorityNotificationQueue>,
        dead_letters: DeadLetterService,
        token: CancellationToken,
    ) {
        info!("Ingestion loop started");

        loop {
            let delivery = tokio::select! {
                _ = token.cancelled() => break,
                delivery = consumer.next() => delivery,
            };

            let delivery = match delivery {
                Some(Ok(delivery)) => delivery,
                Some(Err(e)) => {
                    error!(error = %e, "Broker delivery error");
                    continue;
                }
                None => {
                    warn!("Broker consumer stream ended");
                    break;
                }
            };

            route_inbound_payload(
                &delivery.data,
                &self.notifications_queue_name,
                &queue,
                &dead_letters,
            )
            .await;

            if let Err(e) = self
                .channel
                .basic_ack(delivery.delivery_tag, BasicAckOptions::default())
                .await
            {
                error!(error = %e, "Failed to acknowledge delivery");
            }
        }

        info!("Ingestion loop stopped");
    }
}
