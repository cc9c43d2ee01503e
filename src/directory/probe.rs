//! Bounded online-status probes
//!
//! A probe asks the game server whether a display name is currently online.
//! Probes are always raced against a timeout; a timeout or transport error
//! resolves to "offline", never to a hang, and is not retried within the
//! same admission attempt.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::RwLock;
use std::time::Duration;
use tracing::warn;

/// Trait for the external online-status probe
#[async_trait]
pub trait OnlineProbe: Send + Sync {
    /// Whether the given display name is currently online
    async fn is_online(&self, display_name: &str) -> Result<bool>;
}

/// Probe with a hard bound; failure and timeout both resolve to offline
pub async fn probe_online(probe: &dyn OnlineProbe, display_name: &str, bound: Duration) -> bool {
    match tokio::time::timeout(bound, probe.is_online(display_name)).await {
        Ok(Ok(online)) => online,
        Ok(Err(e)) => {
            warn!("Online probe for {} failed: {}", display_name, e);
            false
        }
        Err(_) => {
            warn!(
                "Online probe for {} timed out after {:?}",
                display_name, bound
            );
            false
        }
    }
}

/// Set-backed probe for tests and the simulator
#[derive(Debug, Default)]
pub struct StaticOnlineProbe {
    online: RwLock<HashSet<String>>,
}

impl StaticOnlineProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe that reports every name online
    pub fn everyone_online(names: &[&str]) -> Self {
        let probe = Self::new();
        for name in names {
            probe.set_online(name, true);
        }
        probe
    }

    pub fn set_online(&self, display_name: &str, online: bool) {
        if let Ok(mut set) = self.online.write() {
            if online {
                set.insert(display_name.to_string());
            } else {
                set.remove(display_name);
            }
        }
    }
}

#[async_trait]
impl OnlineProbe for StaticOnlineProbe {
    async fn is_online(&self, display_name: &str) -> Result<bool> {
        let online = self
            .online
            .read()
            .map_err(|_| crate::error::MatchmakingError::InternalError {
                message: "Failed to acquire probe lock".to_string(),
            })?;
        Ok(online.contains(display_name))
    }
}
