//! Player directory lookups
//!
//! The directory is the source of truth for elo, ban/freeze flags, party
//! membership pointers and entitlements. Candidates are fetched per
//! admission attempt and never cached here.

use crate::error::Result;
use crate::types::{PlayerCandidate, PlayerId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for the external player directory
#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    /// Batch lookup by id set. Unknown ids are simply absent from the result.
    async fn lookup(&self, ids: &[PlayerId]) -> Result<Vec<PlayerCandidate>>;

    /// Lookup a single player
    async fn lookup_one(&self, id: &str) -> Result<Option<PlayerCandidate>> {
        let found = self.lookup(&[id.to_string()]).await?;
        Ok(found.into_iter().next())
    }
}

/// Map-backed player directory for tests and the simulator
#[derive(Debug, Default)]
pub struct InMemoryPlayerDirectory {
    players: RwLock<HashMap<PlayerId, PlayerCandidate>>,
}

impl InMemoryPlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a player record
    pub fn upsert(&self, candidate: PlayerCandidate) {
        if let Ok(mut players) = self.players.write() {
            players.insert(candidate.id.clone(), candidate);
        }
    }

    /// Mutate a stored record in place (for tests flipping flags mid-flow)
    pub fn update<F>(&self, id: &str, mutate: F)
    where
        F: FnOnce(&mut PlayerCandidate),
    {
        if let Ok(mut players) = self.players.write() {
            if let Some(candidate) = players.get_mut(id) {
                mutate(candidate);
            }
        }
    }
}

#[async_trait]
impl PlayerDirectory for InMemoryPlayerDirectory {
    async fn lookup(&self, ids: &[PlayerId]) -> Result<Vec<PlayerCandidate>> {
        let players = self
            .players
            .read()
            .map_err(|_| crate::error::MatchmakingError::InternalError {
                message: "Failed to acquire player directory lock".to_string(),
            })?;
        Ok(ids
            .iter()
            .filter_map(|id| players.get(id).cloned())
            .collect())
    }
}
