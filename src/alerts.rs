//! Alert recording and live broadcast (§3 `Alert`, §6 `/api/v1/alerts_notification`).
//!
//! Alerts are persisted through [`crate::db::PersistenceStore`] and, for `critical` ones, also
//! pushed onto a `tokio::sync::broadcast` channel so the dashboard's SSE endpoint can observe
//! them live without polling. Grounded in the teacher's `AgentEvent` broadcast pattern
//! (`cloudllm::event`), which uses the same "typed enum over a channel" shape for UI updates.

use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::db::{Alert, AlertSeverity, PersistenceStore};
use crate::error::GatewayError;

const BROADCAST_CAPACITY: usize = 256;

/// Records alerts to the persistence store and fans critical ones out to live subscribers.
pub struct AlertSink {
    store: Arc<dyn PersistenceStore>,
    tx: broadcast::Sender<Alert>,
}

impl AlertSink {
    pub fn new(store: Arc<dyn PersistenceStore>) -> Self {
        let (tx, _rx) = broadcast::channel(BROADCAST_CAPACITY);
        Self { store, tx }
    }

    /// Subscribe to the live critical-alert feed, e.g. from the `/api/v1/alerts_notification`
    /// SSE handler.
    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.tx.subscribe()
    }

    /// Record a pipeline alert. Persists unconditionally; broadcasts only `critical` ones, since
    /// `info` alerts are for the archival dashboard listing, not live notification.
    pub async fn record(
        &self,
        prompt_id: String,
        trigger_type: impl Into<String>,
        trigger_category: AlertSeverity,
        trigger_string: Option<String>,
        code_snippet: Option<String>,
    ) -> Result<Alert, GatewayError> {
        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            prompt_id,
            trigger_type: trigger_type.into(),
            trigger_category,
            trigger_string,
            code_snippet,
            timestamp: chrono::Utc::now(),
        };
        self.store.insert_alert(alert.clone()).await?;
        if matches!(alert.trigger_category, AlertSeverity::Critical) {
            // No subscribers is the common case outside an active dashboard session; that's not
            // an error.
            let _ = self.tx.send(alert.clone());
        }
        Ok(alert)
    }

    pub async fn list(&self) -> Result<Vec<Alert>, GatewayError> {
        self.store.list_alerts().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;

    #[tokio::test]
    async fn critical_alerts_are_persisted_and_broadcast() {
        let sink = AlertSink::new(Arc::new(InMemoryStore::new()));
        let mut rx = sink.subscribe();

        sink.record("p1".to_string(), "secrets", AlertSeverity::Critical, Some("sk-xxx".to_string()), None)
            .await
            .unwrap();

        let received = rx.try_recv().expect("critical alert should be broadcast");
        assert_eq!(received.trigger_type, "secrets");
        assert_eq!(sink.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn info_alerts_are_persisted_but_not_broadcast() {
        let sink = AlertSink::new(Arc::new(InMemoryStore::new()));
        let mut rx = sink.subscribe();

        sink.record("p1".to_string(), "pii", AlertSeverity::Info, None, None)
            .await
            .unwrap();

        assert!(rx.try_recv().is_err());
        assert_eq!(sink.list().await.unwrap().len(), 1);
    }
}
