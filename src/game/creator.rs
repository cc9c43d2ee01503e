//! Game creation orchestration boundary
//!
//! The engine hands a finalized assignment and map over this trait and
//! treats the returned numeric game id as opaque. The recording
//! implementation backs tests and the simulator.

use crate::config::QueueConfig;
use crate::error::Result;
use crate::types::{GameId, PlayerId, TeamAssignment};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::info;

/// Trait for the downstream game creation orchestrator
#[async_trait]
pub trait GameCreator: Send + Sync {
    /// Create a game from a finalized assignment; returns the assigned id
    async fn create_game(
        &self,
        config: &QueueConfig,
        assignment: &TeamAssignment,
        map: &str,
    ) -> Result<GameId>;
}

/// A game the recording creator accepted
#[derive(Debug, Clone)]
pub struct CreatedGame {
    pub game_id: GameId,
    pub queue_id: String,
    pub map: String,
    pub team1: Vec<PlayerId>,
    pub team2: Vec<PlayerId>,
    pub created_at: DateTime<Utc>,
}

/// In-memory creator assigning monotonic game ids, for tests and the
/// simulator
#[derive(Debug, Default)]
pub struct RecordingGameCreator {
    next_id: AtomicU64,
    created: RwLock<Vec<CreatedGame>>,
}

impl RecordingGameCreator {
    pub fn new() -> Self {
        Self::default()
    }

    /// All games created so far, in creation order
    pub fn created(&self) -> Vec<CreatedGame> {
        self.created
            .read()
            .map(|games| games.clone())
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.created.read().map(|games| games.len()).unwrap_or(0)
    }
}

#[async_trait]
impl GameCreator for RecordingGameCreator {
    async fn create_game(
        &self,
        config: &QueueConfig,
        assignment: &TeamAssignment,
        map: &str,
    ) -> Result<GameId> {
        let game_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let game = CreatedGame {
            game_id,
            queue_id: config.queue_id.clone(),
            map: map.to_string(),
            team1: assignment.team1.clone(),
            team2: assignment.team2.clone(),
            created_at: crate::utils::current_timestamp(),
        };
        info!(
            "Created game #{} on {} for queue {} ({}v{})",
            game_id,
            map,
            config.queue_id,
            assignment.team1.len(),
            assignment.team2.len()
        );
        if let Ok(mut created) = self.created.write() {
            created.push(game);
        }
        Ok(game_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlayerCandidate;

    #[tokio::test]
    async fn test_monotonic_game_ids() {
        let creator = RecordingGameCreator::new();
        let config = QueueConfig::new("queue1", 4, 0, 1000).unwrap();
        let pool: Vec<PlayerCandidate> = (0..4)
            .map(|i| PlayerCandidate::solo(format!("p{}", i), format!("Name{}", i), 100))
            .collect();
        let assignment = crate::game::select_balanced_teams(&pool, &[], 4).unwrap();

        let first = creator.create_game(&config, &assignment, "Aquarius").await.unwrap();
        let second = creator.create_game(&config, &assignment, "Aquarius").await.unwrap();
        assert_eq!(second, first + 1);
        assert_eq!(creator.count(), 2);

        let games = creator.created();
        assert_eq!(games[0].queue_id, "queue1");
        assert_eq!(games[0].map, "Aquarius");
        assert_eq!(games[0].team1.len(), 2);
    }
}
