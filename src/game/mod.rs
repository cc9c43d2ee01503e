//! Game formation: team balancing, map selection, and creation

pub mod balancer;
pub mod creator;
pub mod maps;

pub use balancer::{select_balanced_teams, BalanceFailure};
pub use creator::{GameCreator, RecordingGameCreator};
pub use maps::{InMemoryMapDirectory, MapDirectory, MapInfo, MapSelector};
