//! Payment reconciliation outbox.
//!
//! When an online payment has been verified but the order write fails, the
//! paid payload is parked here keyed by the gateway order id. A background
//! worker replays it into an order until it sticks. Replays are idempotent:
//! the order id is derived from the checkout intent, so a double replay
//! converges on the same row.

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::checkout::{CheckoutService, PaidCheckout};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, QueryResult, Statement};
use serde_json::Value;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub enum OutboxStatus {
    Pending,
    Processing,
    Delivered,
    Failed,
}

impl OutboxStatus {
    fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Processing => "processing",
            OutboxStatus::Delivered => "delivered",
            OutboxStatus::Failed => "failed",
        }
    }
}

/// Worker tuning, lifted from `AppConfig`.
#[derive(Debug, Clone, Copy)]
pub struct OutboxWorkerConfig {
    pub poll_interval: Duration,
    pub batch_size: i64,
    pub max_attempts: i32,
}

impl Default for OutboxWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            batch_size: 50,
            max_attempts: 8,
        }
    }
}

/// Park a verified-but-unpersisted payment for replay.
///
/// Inserted with `ON CONFLICT DO NOTHING` on the gateway order id, so a
/// repeated failure of the same attempt does not produce duplicate rows.
pub async fn enqueue(
    db: &impl ConnectionTrait,
    gateway_order_id: &str,
    payload: &Value,
) -> Result<(), ServiceError> {
    if db.get_database_backend() != DbBackend::Postgres {
        warn!(
            %gateway_order_id,
            "reconciliation outbox unavailable on this backend; payment must be reconciled manually"
        );
        return Ok(());
    }

    let id = Uuid::new_v4();
    let sql = format!(
        r#"INSERT INTO payment_outbox
        (id, gateway_order_id, payload, status, attempts, available_at, created_at)
        VALUES ($1, $2, $3::jsonb, '{}', 0, NOW(), NOW())
        ON CONFLICT (gateway_order_id) DO NOTHING"#,
        OutboxStatus::Pending.as_str()
    );
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        sql.as_str(),
        vec![
            id.into(),
            gateway_order_id.into(),
            payload.clone().into(),
        ],
    );
    db.execute(stmt).await.map_err(ServiceError::db_error)?;
    info!(%gateway_order_id, outbox_id = %id, "enqueued payment for reconciliation");
    Ok(())
}

/// Background worker that replays parked payments into orders.
pub async fn start_worker(
    db: Arc<DatabaseConnection>,
    checkout: Arc<CheckoutService>,
    sender: EventSender,
    cfg: OutboxWorkerConfig,
) {
    if db.get_database_backend() != DbBackend::Postgres {
        info!(
            "reconciliation worker disabled for {:?} backend",
            db.get_database_backend()
        );
        return;
    }

    tokio::spawn(async move {
        loop {
            if let Err(e) = drain_once(&db, &checkout, &sender, cfg).await {
                error!("reconciliation worker error: {}", e);
            }
            sleep(cfg.poll_interval).await;
        }
    });
}

async fn drain_once(
    db: &DatabaseConnection,
    checkout: &CheckoutService,
    sender: &EventSender,
    cfg: OutboxWorkerConfig,
) -> Result<(), ServiceError> {
    const BASE_BACKOFF_SECS: u64 = 2;

    // Claim a batch (advisory lock-like behavior)
    let sql_claim = format!(
        r#"
        WITH cte AS (
            SELECT id FROM payment_outbox
            WHERE status = '{pending}' AND available_at <= NOW()
            ORDER BY created_at ASC
            FOR UPDATE SKIP LOCKED
            LIMIT $1
        )
        UPDATE payment_outbox o
        SET status = '{processing}', updated_at = NOW(), attempts = o.attempts + 1
        FROM cte
        WHERE o.id = cte.id
        RETURNING o.id, o.gateway_order_id, o.payload, o.attempts
    "#,
        pending = OutboxStatus::Pending.as_str(),
        processing = OutboxStatus::Processing.as_str(),
    );
    let stmt =
        Statement::from_sql_and_values(DbBackend::Postgres, sql_claim.as_str(), vec![cfg.batch_size.into()]);
    let rows: Vec<QueryResult> = db.query_all(stmt).await.map_err(ServiceError::db_error)?;

    for row in rows {
        let id: Uuid = row.try_get("", "id").unwrap_or_default();
        let gateway_order_id: String = row.try_get("", "gateway_order_id").unwrap_or_default();
        let payload: Value = row.try_get("", "payload").unwrap_or(Value::Null);
        let attempts: i32 = row.try_get("", "attempts").unwrap_or(1);

        let replayed = match serde_json::from_value::<PaidCheckout>(payload) {
            Ok(paid) => match checkout.replay_paid(&paid).await {
                Ok(_) => true,
                Err(e) => {
                    warn!(%gateway_order_id, attempt = attempts, "replay failed: {}", e);
                    false
                }
            },
            Err(e) => {
                // An unparseable payload will never succeed; park it immediately.
                error!(%gateway_order_id, "corrupt outbox payload: {}", e);
                park_failed(db, id, "corrupt payload").await?;
                continue;
            }
        };

        if replayed {
            let sql_done = format!(
                r#"UPDATE payment_outbox SET status = '{}', processed_at = NOW(), updated_at = NOW(), error_message = NULL WHERE id = $1"#,
                OutboxStatus::Delivered.as_str()
            );
            let stmt_done =
                Statement::from_sql_and_values(DbBackend::Postgres, sql_done.as_str(), vec![id.into()]);
            if let Err(e) = db.execute(stmt_done).await {
                warn!("failed updating outbox {}: {}", id, e);
            }
            if let Err(e) = sender
                .send(Event::ReconciliationReplayed {
                    gateway_order_id: gateway_order_id.clone(),
                })
                .await
            {
                debug!("event send failed: {}", e);
            }
        } else if attempts < cfg.max_attempts {
            let backoff = BASE_BACKOFF_SECS.saturating_pow(attempts as u32);
            let sql_retry = format!(
                r#"UPDATE payment_outbox SET status = '{}', available_at = NOW() + make_interval(secs := $2::int), updated_at = NOW(), error_message = 'replay failed' WHERE id = $1"#,
                OutboxStatus::Pending.as_str()
            );
            let stmt_retry = Statement::from_sql_and_values(
                DbBackend::Postgres,
                sql_retry.as_str(),
                vec![id.into(), (backoff as i64).into()],
            );
            if let Err(e) = db.execute(stmt_retry).await {
                warn!("failed scheduling retry for outbox {}: {}", id, e);
            }
        } else {
            park_failed(db, id, "max attempts exceeded").await?;
        }
    }
    Ok(())
}

async fn park_failed(db: &DatabaseConnection, id: Uuid, reason: &str) -> Result<(), ServiceError> {
    let sql_fail = format!(
        r#"UPDATE payment_outbox SET status = '{}', updated_at = NOW(), error_message = $2 WHERE id = $1"#,
        OutboxStatus::Failed.as_str()
    );
    let stmt_fail = Statement::from_sql_and_values(
        DbBackend::Postgres,
        sql_fail.as_str(),
        vec![id.into(), reason.into()],
    );
    if let Err(e) = db.execute(stmt_fail).await {
        warn!("failed marking outbox {} failed: {}", id, e);
    }
    Ok(())
}
