//! War Room - Queue state and team-balancing engine for competitive team games
//!
//! This crate tracks queued candidates per named queue, validates eligibility
//! against external directories, debounces full queues into single processing
//! runs, and converts queued pools into balanced two-team game assignments.

pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod game;
pub mod notify;
pub mod queue;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use config::{EngineSettings, QueueConfig, QueueRegistry, StaticQueueRegistry};
pub use engine::{Matchmaker, MatchmakerStats};
pub use game::balancer::select_balanced_teams;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
