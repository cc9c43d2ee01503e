//! Configuration records and the queue registry
//!
//! `app` holds engine-wide tunables loaded from the environment; `queue`
//! holds the validated per-queue configuration record and the registry
//! that serves it.

pub mod app;
pub mod queue;

pub use app::{validate_settings, EngineSettings};
pub use queue::{QueueConfig, QueueRegistry, StaticQueueRegistry};
