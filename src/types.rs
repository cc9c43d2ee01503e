//! Common types used throughout the matchmaking engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Unique identifier for players
pub type PlayerId = String;

/// Unique identifier for queues
pub type QueueId = String;

/// Unique identifier for parties
pub type PartyId = String;

/// Unique identifier for games, assigned by the game creation orchestrator
pub type GameId = u64;

/// Entitlements a player can hold, granted outside this engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entitlement {
    /// Waives the elo range check for queues that list it
    QueueBypass,
    PartyOfTwo,
    PartyOfThree,
    PartyOfFour,
}

impl Entitlement {
    /// Party size granted by this entitlement, if any
    pub fn party_size(&self) -> Option<usize> {
        match self {
            Entitlement::QueueBypass => None,
            Entitlement::PartyOfTwo => Some(2),
            Entitlement::PartyOfThree => Some(3),
            Entitlement::PartyOfFour => Some(4),
        }
    }
}

/// Per-queue processing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingState {
    /// Queue is accumulating candidates
    Idle,
    /// Queue became full; a debounced run is pending
    Scheduled,
    /// A team-formation run is in flight
    Processing,
}

impl Default for ProcessingState {
    fn default() -> Self {
        ProcessingState::Idle
    }
}

impl std::fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingState::Idle => write!(f, "idle"),
            ProcessingState::Scheduled => write!(f, "scheduled"),
            ProcessingState::Processing => write!(f, "processing"),
        }
    }
}

/// Candidate information fetched from the player directory per admission
/// attempt. Not cached by this engine beyond the attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerCandidate {
    pub id: PlayerId,
    /// In-game display name; a registered player always has one
    pub display_name: Option<String>,
    pub elo: i32,
    pub banned: bool,
    pub frozen: bool,
    pub party_id: Option<PartyId>,
    pub entitlements: HashSet<Entitlement>,
}

impl PlayerCandidate {
    /// Plain solo candidate with sensible defaults, mostly for wiring tests
    /// and the simulator
    pub fn solo(id: impl Into<PlayerId>, display_name: impl Into<String>, elo: i32) -> Self {
        Self {
            id: id.into(),
            display_name: Some(display_name.into()),
            elo,
            banned: false,
            frozen: false,
            party_id: None,
            entitlements: HashSet::new(),
        }
    }
}

/// A pre-formed group of players admitted, removed, and seated as one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyGroup {
    pub party_id: PartyId,
    /// Ordered member ids
    pub members: Vec<PlayerId>,
}

/// A unit handed to the membership tracker after the eligibility gate
#[derive(Debug, Clone)]
pub enum AdmitUnit {
    Solo(PlayerId),
    Party(PartyGroup),
}

impl AdmitUnit {
    /// Member ids covered by this unit, in order
    pub fn member_ids(&self) -> Vec<PlayerId> {
        match self {
            AdmitUnit::Solo(id) => vec![id.clone()],
            AdmitUnit::Party(group) => group.members.clone(),
        }
    }
}

/// Key used to remove tracked membership
#[derive(Debug, Clone)]
pub enum RemovalKey {
    Player(PlayerId),
    Party(PartyId),
}

/// Finalized two-team partition of an eligible pool. Never mutated after
/// being handed to the game creation orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamAssignment {
    pub team1: Vec<PlayerId>,
    pub team2: Vec<PlayerId>,
    pub used_players: HashSet<PlayerId>,
    pub team1_avg_elo: i32,
    pub team2_avg_elo: i32,
    /// Absolute difference between the two team averages
    pub elo_difference: i32,
}

/// Read-only view of a queue for external status reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub queue_id: QueueId,
    pub player_count: usize,
    pub party_count: usize,
    pub processing_state: ProcessingState,
    pub last_update: DateTime<Utc>,
}

/// Outcome of an admission attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmitOutcome {
    pub accepted: bool,
    pub reason: Option<String>,
}

impl AdmitOutcome {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}
