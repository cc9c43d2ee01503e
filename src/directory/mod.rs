//! External directory collaborators
//!
//! Every lookup this engine depends on lives behind an async trait with an
//! in-memory implementation next to it, so the core can be exercised without
//! any live backend.

pub mod games;
pub mod parties;
pub mod players;
pub mod probe;

pub use games::{ActiveGameDirectory, InMemoryActiveGameDirectory};
pub use parties::{CachedPartyDirectory, InMemoryPartyDirectory, PartyDirectory};
pub use players::{InMemoryPlayerDirectory, PlayerDirectory};
pub use probe::{probe_online, OnlineProbe, StaticOnlineProbe};
