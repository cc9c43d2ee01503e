//! Best-effort outbound notifications
//!
//! The engine emits small envelopes on game creation and admission
//! rejection. Delivery is advisory: a failed notification is logged and
//! never affects queue state or an in-flight processing run.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use uuid::Uuid;

/// Priority hint for downstream delivery
pub const PRIORITY_NORMAL: u8 = 5;
pub const PRIORITY_HIGH: u8 = 8;

/// One outbound notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    pub correlation_id: Uuid,
    /// Event name such as `game.created` or `admission.rejected`
    pub event: String,
    /// Player id, queue id, or channel the event concerns
    pub destination: String,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl NotificationEnvelope {
    pub fn new(
        event: impl Into<String>,
        destination: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            event: event.into(),
            destination: destination.into(),
            timestamp: crate::utils::current_timestamp(),
            payload,
        }
    }

    /// Serialize for the wire
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Trait for the outbound notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, envelope: NotificationEnvelope, priority: u8) -> Result<()>;
}

/// Recording notifier for tests and the simulator
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: RwLock<Vec<(NotificationEnvelope, u8)>>,
    fail: RwLock<bool>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent notify fail, for degradation tests
    pub fn set_fail(&self, fail: bool) {
        if let Ok(mut flag) = self.fail.write() {
            *flag = fail;
        }
    }

    /// Everything notified so far, in order
    pub fn sent(&self) -> Vec<(NotificationEnvelope, u8)> {
        self.sent
            .read()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.sent.read().map(|sent| sent.len()).unwrap_or(0)
    }

    /// Events with the given name, in order
    pub fn events_named(&self, event: &str) -> Vec<NotificationEnvelope> {
        self.sent()
            .into_iter()
            .filter(|(envelope, _)| envelope.event == event)
            .map(|(envelope, _)| envelope)
            .collect()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, envelope: NotificationEnvelope, priority: u8) -> Result<()> {
        if self.fail.read().map(|flag| *flag).unwrap_or(false) {
            return Err(crate::error::MatchmakingError::InternalError {
                message: "Mock notifier set to fail".to_string(),
            }
            .into());
        }
        if let Ok(mut sent) = self.sent.write() {
            sent.push((envelope, priority));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_notifier_records_in_order() {
        let notifier = MockNotifier::new();

        notifier
            .notify(
                NotificationEnvelope::new("game.created", "queue1", json!({"game_id": 1})),
                PRIORITY_HIGH,
            )
            .await
            .unwrap();
        notifier
            .notify(
                NotificationEnvelope::new("admission.rejected", "p1", json!({})),
                PRIORITY_NORMAL,
            )
            .await
            .unwrap();

        assert_eq!(notifier.count(), 2);
        assert_eq!(notifier.events_named("game.created").len(), 1);
        assert_eq!(notifier.sent()[0].1, PRIORITY_HIGH);
    }

    #[tokio::test]
    async fn test_mock_notifier_failure_mode() {
        let notifier = MockNotifier::new();
        notifier.set_fail(true);

        let result = notifier
            .notify(
                NotificationEnvelope::new("game.created", "queue1", json!({})),
                PRIORITY_NORMAL,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(notifier.count(), 0);
    }

    #[test]
    fn test_envelope_round_trips() {
        let envelope =
            NotificationEnvelope::new("game.created", "queue1", json!({"game_id": 7}));
        let bytes = envelope.to_bytes().unwrap();
        let parsed: NotificationEnvelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.event, "game.created");
        assert_eq!(parsed.correlation_id, envelope.correlation_id);
        assert_eq!(parsed.payload["game_id"], 7);
    }
}
