//! PostgreSQL implementation of WebhookEventRepository.
//!
//! Idempotency is delegated to the unique index on `idempotency_key`:
//! `INSERT ... ON CONFLICT DO NOTHING RETURNING id` yields no row for a
//! redelivery, which the receiver reports as a duplicate, not an error.
//! All status changes are single-row updates gated on the current status.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::webhook::{EventStatus, NewWebhookEvent, WebhookError, WebhookEvent};
use crate::ports::{InsertOutcome, RetryDisposition, WebhookEventRepository};

/// PostgreSQL implementation of the WebhookEventRepository port.
pub struct PostgresWebhookEventRepository {
    pool: PgPool,
}

impl PostgresWebhookEventRepository {
    /// Creates a new repository backed by the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a webhook event.
#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    id: i64,
    idempotency_key: String,
    event_type: String,
    payload: serde_json::Value,
    status: String,
    attempts: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WebhookEventRow> for WebhookEvent {
    type Error = WebhookError;

    fn try_from(row: WebhookEventRow) -> Result<Self, Self::Error> {
        Ok(WebhookEvent {
            id: row.id,
            idempotency_key: row.idempotency_key,
            event_type: row.event_type,
            payload: row.payload,
            status: parse_status(&row.status)?,
            attempts: row.attempts,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse_status(s: &str) -> Result<EventStatus, WebhookError> {
    match s {
        "pending" => Ok(EventStatus::Pending),
        "processing" => Ok(EventStatus::Processing),
        "complete" => Ok(EventStatus::Complete),
        "failed" => Ok(EventStatus::Failed),
        _ => Err(WebhookError::Database(format!(
            "Invalid status value: {}",
            s
        ))),
    }
}

fn db_error(context: &str, e: sqlx::Error) -> WebhookError {
    WebhookError::Database(format!("{}: {}", context, e))
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn insert_if_absent(
        &self,
        event: NewWebhookEvent,
    ) -> Result<InsertOutcome, WebhookError> {
        let inserted_id: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO webhook_events (idempotency_key, event_type, payload, status, attempts)
            VALUES ($1, $2, $3, 'pending', 0)
            ON CONFLICT (idempotency_key) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&event.idempotency_key)
        .bind(&event.event_type)
        .bind(&event.payload)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to insert webhook event", e))?;

        Ok(match inserted_id {
            Some(event_id) => InsertOutcome::Inserted { event_id },
            None => InsertOutcome::Duplicate,
        })
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<WebhookEvent>, WebhookError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(
            r#"
            SELECT id, idempotency_key, event_type, payload, status, attempts,
                   created_at, updated_at
            FROM webhook_events
            WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find webhook event", e))?;

        row.map(WebhookEvent::try_from).transpose()
    }

    async fn fetch_pending(&self, limit: u32) -> Result<Vec<WebhookEvent>, WebhookError> {
        let rows: Vec<WebhookEventRow> = sqlx::query_as(
            r#"
            SELECT id, idempotency_key, event_type, payload, status, attempts,
                   created_at, updated_at
            FROM webhook_events
            WHERE status = 'pending'
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch pending webhook events", e))?;

        rows.into_iter().map(WebhookEvent::try_from).collect()
    }

    async fn reset_stuck(&self, stuck_before: DateTime<Utc>) -> Result<u64, WebhookError> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = 'pending', updated_at = NOW()
            WHERE status = 'processing' AND updated_at < $1
            "#,
        )
        .bind(stuck_before)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to reset stuck webhook events", e))?;

        Ok(result.rows_affected())
    }

    async fn mark_processing(&self, event_id: i64) -> Result<(), WebhookError> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = 'processing', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(event_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to mark webhook event processing", e))?;

        if result.rows_affected() == 0 {
            return Err(WebhookError::Database(format!(
                "Webhook event {} was not in 'pending' state",
                event_id
            )));
        }
        Ok(())
    }

    async fn mark_complete(&self, event_id: i64) -> Result<(), WebhookError> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = 'complete', updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(event_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to mark webhook event complete", e))?;

        if result.rows_affected() == 0 {
            return Err(WebhookError::Database(format!(
                "Webhook event {} was not in 'processing' state",
                event_id
            )));
        }
        Ok(())
    }

    async fn record_failure(
        &self,
        event_id: i64,
        max_attempts: i32,
    ) -> Result<RetryDisposition, WebhookError> {
        // Increment and decide the next status in one gated update, so a
        // crash can never observe an incremented counter with a stale status.
        let row: Option<(i32, String)> = sqlx::query_as(
            r#"
            UPDATE webhook_events
            SET attempts = attempts + 1,
                status = CASE WHEN attempts + 1 >= $2 THEN 'failed' ELSE 'pending' END,
                updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            RETURNING attempts, status
            "#,
        )
        .bind(event_id)
        .bind(max_attempts)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to record webhook event failure", e))?;

        let (attempts, status) = row.ok_or_else(|| {
            WebhookError::Database(format!(
                "Webhook event {} was not in 'processing' state",
                event_id
            ))
        })?;

        Ok(RetryDisposition {
            attempts,
            exhausted: status == "failed",
        })
    }
}
