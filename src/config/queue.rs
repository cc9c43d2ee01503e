//! Per-queue configuration and the queue registry
//!
//! A `QueueConfig` is validated once at the system boundary and then treated
//! as immutable for the duration of a processing cycle. The registry serves
//! configs by queue id; the static implementation backs tests and the
//! simulator, a deployment would wire its own.

use crate::error::{MatchmakingError, Result};
use crate::types::{Entitlement, QueueId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Validated configuration record for one queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub queue_id: QueueId,
    /// Total players per game; always even and positive
    pub capacity: usize,
    pub min_elo: i32,
    pub max_elo: i32,
    pub ranked: bool,
    /// Entitlements that waive the elo range check for this queue
    pub bypass: HashSet<Entitlement>,
    pub active: bool,
}

impl QueueConfig {
    /// Create and validate a config in one step
    pub fn new(queue_id: impl Into<QueueId>, capacity: usize, min_elo: i32, max_elo: i32) -> Result<Self> {
        let config = Self {
            queue_id: queue_id.into(),
            capacity,
            min_elo,
            max_elo,
            ranked: true,
            bypass: HashSet::new(),
            active: true,
        };
        config.validate()?;
        Ok(config)
    }

    /// Players per team
    pub fn team_size(&self) -> usize {
        self.capacity / 2
    }

    /// Whether `elo` is inside the queue's inclusive range
    pub fn elo_in_range(&self, elo: i32) -> bool {
        elo >= self.min_elo && elo <= self.max_elo
    }

    /// Whether any of the candidate's entitlements waives the elo gate
    pub fn has_bypass(&self, entitlements: &HashSet<Entitlement>) -> bool {
        !self.bypass.is_disjoint(entitlements)
    }

    /// Validate the record at the system boundary
    pub fn validate(&self) -> Result<()> {
        if self.queue_id.is_empty() {
            return Err(MatchmakingError::InvalidQueueConfig {
                message: "Queue id cannot be empty".to_string(),
            }
            .into());
        }
        if self.capacity == 0 {
            return Err(MatchmakingError::InvalidQueueConfig {
                message: "Queue capacity must be greater than 0".to_string(),
            }
            .into());
        }
        if self.capacity % 2 != 0 {
            return Err(MatchmakingError::InvalidQueueConfig {
                message: format!("Queue capacity must be even, got {}", self.capacity),
            }
            .into());
        }
        if self.min_elo > self.max_elo {
            return Err(MatchmakingError::InvalidQueueConfig {
                message: format!(
                    "Elo range must be ordered, got {}..{}",
                    self.min_elo, self.max_elo
                ),
            }
            .into());
        }
        Ok(())
    }
}

/// Trait for serving queue configurations by id
pub trait QueueRegistry: Send + Sync {
    /// Get the configuration for a queue, if it exists
    fn get_queue(&self, queue_id: &str) -> Result<Option<QueueConfig>>;

    /// Ids of all registered queues
    fn queue_ids(&self) -> Vec<QueueId>;
}

/// In-process registry backed by a map, validating on insert
#[derive(Debug, Default)]
pub struct StaticQueueRegistry {
    queues: RwLock<HashMap<QueueId, QueueConfig>>,
}

impl StaticQueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a queue configuration
    pub fn upsert(&self, config: QueueConfig) -> Result<()> {
        config.validate()?;
        let mut queues = self
            .queues
            .write()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire registry lock".to_string(),
            })?;
        queues.insert(config.queue_id.clone(), config);
        Ok(())
    }

    /// Remove a queue configuration
    pub fn remove(&self, queue_id: &str) -> Result<()> {
        let mut queues = self
            .queues
            .write()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire registry lock".to_string(),
            })?;
        queues.remove(queue_id);
        Ok(())
    }
}

impl QueueRegistry for StaticQueueRegistry {
    fn get_queue(&self, queue_id: &str) -> Result<Option<QueueConfig>> {
        let queues = self
            .queues
            .read()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire registry lock".to_string(),
            })?;
        Ok(queues.get(queue_id).cloned())
    }

    fn queue_ids(&self) -> Vec<QueueId> {
        self.queues
            .read()
            .map(|queues| queues.keys().cloned().collect())
            .unwrap_or_default()
    }
}
