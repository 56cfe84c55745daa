use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::dead_letter::{DeadLetterError, DeadLetterStore};
use crate::models::dead_letter::DeadLetterMessage;

/// Postgres-backed dead-letter store.
pub struct PostgresDeadLetterStore {
    client: Client,
}

impl PostgresDeadLetterStore {
    pub async fn connect(database_url: &str) -> Result<Self, DeadLetterError> {
        info!("Connecting to PostgreSQL database");

        let (client, connection) = tokio_postgres::connect(database_url, NoTls)
            .await
            .map_err(|e| DeadLetterError::Store(anyhow!("Failed to connect to database: {e}")))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection terminated");
            }
        });

        client
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS dead_letters (
                    id UUID PRIMARY KEY,
                    original_topic TEXT NOT NULL,
                    payload TEXT NOT NULL,
                    error_reason TEXT NOT NULL,
                    received_from TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL,
                    is_processed BOOLEAN NOT NULL DEFAULT FALSE,
                    processed_at TIMESTAMPTZ
                )
                "#,
                &[],
            )
            .await
            .map_err(|e| DeadLetterError::Store(anyhow!("Failed to prepare schema: {e}")))?;

        info!("PostgreSQL connection established");

        Ok(Self { client })
    }

    fn message_from_row(row: &Row) -> DeadLetterMessage {
        DeadLetterMessage {
            id: row.get("id"),
            original_topic: row.get("original_topic"),
            payload: row.get("payload"),
            error_reason: row.get("error_reason"),
            received_from: row.get("received_from"),
            created_at: row.get("created_at"),
            is_processed: row.get("is_processed"),
            processed_at: row.get("processed_at"),
        }
    }
}

#[async_trait]
impl DeadLetterStore for PostgresDeadLetterStore {
    async fn insert(&self, message: DeadLetterMessage) -> Result<(), DeadLetterError> {
        self.client
            .execute(
                r#"
                INSERT INTO dead_letters (
                    id, original_topic, payload, error_reason,
                    received_from, created_at, is_processed, processed_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
                &[
                    &message.id,
                    &message.original_topic,
                    &message.payload,
                    &message.error_reason,
                    &message.received_from,
                    &message.created_at,
                    &message.is_processed,
                    &message.processed_at,
                ],
            )
            .await
            .map_err(|e| {
                error!(id = %message.id, error = %e, "Failed to insert dead letter");
                DeadLetterError::Store(anyhow!("Dead letter insert failed: {e}"))
            })?;

        debug!(id = %message.id, "Dead letter persisted");
        Ok(())
    }

    async fn all(&self) -> Result<Vec<DeadLetterMessage>, DeadLetterError> {
        let rows = self
            .client
            .query(
                "SELECT * FROM dead_letters ORDER BY created_at",
                &[],
            )
            .await
            .map_err(|e| DeadLetterError::Store(anyhow!("Dead letter query failed: {e}")))?;

        Ok(rows.iter().map(Self::message_from_row).collect())
    }

    async fn unprocessed(&self) -> Result<Vec<DeadLetterMessage>, DeadLetterError> {
        let rows = self
            .client
            .query(
                "SELECT * FROM dead_letters WHERE is_processed = FALSE ORDER BY created_at",
                &[],
            )
            .await
            .map_err(|e| DeadLetterError::Store(anyhow!("Dead letter query failed: {e}")))?;

        Ok(rows.iter().map(Self::message_from_row).collect())
    }

    async fn mark_processed(&self, id: Uuid) -> Result<DeadLetterMessage, DeadLetterError> {
        // COALESCE keeps the original timestamp when an operator re-acks;
        // the flag never reverts.
        let row = self
            .client
            .query_opt(
                r#"
                UPDATE dead_letters
                SET is_processed = TRUE,
                    processed_at = COALESCE(processed_at, $2)
                WHERE id = $1
                RETURNING *
                "#,
                &[&id, &Utc::now()],
            )
            .await
            .map_err(|e| DeadLetterError::Store(anyhow!("Dead letter update failed: {e}")))?;

        match row {
            Some(row) => Ok(Self::message_from_row(&row)),
            None => Err(DeadLetterError::NotFound(id)),
        }
    }
}
