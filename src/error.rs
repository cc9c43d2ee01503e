//! Error types for the matchmaking engine
//!
//! This module defines all error types using anyhow for consistent error
//! handling throughout the crate. Eligibility rejections are not errors;
//! they are returned as structured reasons (see `queue::eligibility`).

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Invalid player id: {id}")]
    InvalidPlayerId { id: String },

    #[error("Invalid queue configuration: {message}")]
    InvalidQueueConfig { message: String },

    #[error("Queue not found: {queue_id}")]
    QueueNotFound { queue_id: String },

    #[error("Directory lookup failed ({directory}): {message}")]
    DirectoryUnavailable { directory: String, message: String },

    #[error("Game creation failed: {message}")]
    GameCreationFailed { message: String },

    #[error("Internal engine error: {message}")]
    InternalError { message: String },
}
