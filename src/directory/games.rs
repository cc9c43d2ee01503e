//! Active-game directory lookups
//!
//! Used by the eligibility gate to reject candidates who are already part of
//! a pending or running game.

use crate::error::Result;
use crate::types::{GameId, PlayerId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for the external active-game directory
#[async_trait]
pub trait ActiveGameDirectory: Send + Sync {
    /// If any of the given ids is in a non-terminal game, return that game id
    async fn find_active_game(&self, ids: &[PlayerId]) -> Result<Option<GameId>>;
}

/// Map-backed active-game directory for tests and the simulator
#[derive(Debug, Default)]
pub struct InMemoryActiveGameDirectory {
    // player id -> non-terminal game id
    active: RwLock<HashMap<PlayerId, GameId>>,
}

impl InMemoryActiveGameDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_in_game(&self, player_id: impl Into<PlayerId>, game_id: GameId) {
        if let Ok(mut active) = self.active.write() {
            active.insert(player_id.into(), game_id);
        }
    }

    pub fn mark_finished(&self, player_id: &str) {
        if let Ok(mut active) = self.active.write() {
            active.remove(player_id);
        }
    }
}

#[async_trait]
impl ActiveGameDirectory for InMemoryActiveGameDirectory {
    async fn find_active_game(&self, ids: &[PlayerId]) -> Result<Option<GameId>> {
        let active = self
            .active
            .read()
            .map_err(|_| crate::error::MatchmakingError::InternalError {
                message: "Failed to acquire active game lock".to_string(),
            })?;
        Ok(ids.iter().find_map(|id| active.get(id).copied()))
    }
}
