use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{models::Notification, utils::sql};

/// Result of a coordinator call: the entity's new state plus the outbound
/// messages the transition produced.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub notifications: Vec<Notification>,
}

impl<T> Outcome<T> {
    pub fn new(value: T, notifications: Vec<Notification>) -> Self {
        Self {
            value,
            notifications,
        }
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the log. Used when no outbox is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        log::info!(
            "Notification for {}: {}",
            notification.recipient_id,
            notification.content
        );
        Ok(())
    }
}

/// Appends notifications to the `notifications` table for the delivery
/// subsystem to pick up.
#[derive(Clone)]
pub struct OutboxNotificationSink {
    pool: PgPool,
}

impl OutboxNotificationSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSink for OutboxNotificationSink {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        sqlx::query(&sql(
            "INSERT INTO notifications (id, recipient_id, content, created_at) VALUES (?, ?, ?, ?)",
        ))
        .bind(Uuid::new_v4())
        .bind(notification.recipient_id)
        .bind(&notification.content)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Fire-and-forget dispatcher in front of a sink.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Delivers every notification; failures are logged and never propagate.
    pub async fn dispatch(&self, notifications: &[Notification]) {
        for notification in notifications {
            if let Err(err) = self.sink.deliver(notification).await {
                log::warn!(
                    "Failed to deliver notification to {}: {}",
                    notification.recipient_id,
                    err
                );
            }
        }
    }

    /// Dispatches the outcome's notifications and returns its value.
    pub async fn deliver<T>(&self, outcome: Outcome<T>) -> T {
        self.dispatch(&outcome.notifications).await;
        outcome.value
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(Arc::new(LogNotificationSink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    struct FlakySink {
        delivered: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl NotificationSink for FlakySink {
        async fn deliver(&self, notification: &Notification) -> Result<()> {
            if notification.content.contains("fail") {
                anyhow::bail!("transport down");
            }
            self.delivered.lock().await.push(notification.recipient_id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_continues_past_failures() {
        let sink = Arc::new(FlakySink {
            delivered: Mutex::new(Vec::new()),
        });
        let notifier = Notifier::new(sink.clone());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let value = notifier
            .deliver(Outcome::new(
                7,
                vec![Notification::new(a, "fail"), Notification::new(b, "ok")],
            ))
            .await;

        assert_eq!(value, 7);
        assert_eq!(*sink.delivered.lock().await, vec![b]);
    }
}
