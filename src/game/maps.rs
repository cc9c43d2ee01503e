//! Tiered map selection
//!
//! Picks a map for a game of a given capacity: reserved maps of that size
//! first, then unlocked maps of that size, then any unlocked map, then the
//! configured default. Uniform random inside a tier; a directory failure
//! degrades to the default rather than blocking game creation.

use crate::error::Result;
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// One playable map as served by the map directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapInfo {
    pub name: String,
    /// Total players the map is built for
    pub capacity: usize,
    pub unlocked: bool,
    /// Reserved maps are held back for games of exactly their capacity
    pub reserved: bool,
}

/// Trait for the external map directory
#[async_trait]
pub trait MapDirectory: Send + Sync {
    async fn list_maps(&self) -> Result<Vec<MapInfo>>;
}

/// Map selection over a directory, with a fallback map of last resort
pub struct MapSelector {
    directory: Arc<dyn MapDirectory>,
    default_map: String,
}

impl MapSelector {
    pub fn new(directory: Arc<dyn MapDirectory>, default_map: impl Into<String>) -> Self {
        Self {
            directory,
            default_map: default_map.into(),
        }
    }

    /// Pick a map name for a game of `capacity` players
    pub async fn select(&self, capacity: usize) -> String {
        let maps = match self.directory.list_maps().await {
            Ok(maps) => maps,
            Err(e) => {
                warn!(
                    "Map directory unavailable, falling back to {}: {}",
                    self.default_map, e
                );
                return self.default_map.clone();
            }
        };

        let reserved_sized: Vec<&MapInfo> = maps
            .iter()
            .filter(|m| m.reserved && m.capacity == capacity)
            .collect();
        let unlocked_sized: Vec<&MapInfo> = maps
            .iter()
            .filter(|m| m.unlocked && !m.reserved && m.capacity == capacity)
            .collect();
        let any_unlocked: Vec<&MapInfo> = maps.iter().filter(|m| m.unlocked).collect();

        let tier = if !reserved_sized.is_empty() {
            reserved_sized
        } else if !unlocked_sized.is_empty() {
            unlocked_sized
        } else {
            any_unlocked
        };

        match tier.choose(&mut rand::rng()) {
            Some(map) => {
                debug!("Selected map {} for capacity {}", map.name, capacity);
                map.name.clone()
            }
            None => {
                debug!(
                    "No map available for capacity {}, using {}",
                    capacity, self.default_map
                );
                self.default_map.clone()
            }
        }
    }
}

/// Map-backed directory for tests and the simulator
#[derive(Debug, Default)]
pub struct InMemoryMapDirectory {
    maps: RwLock<Vec<MapInfo>>,
}

impl InMemoryMapDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, name: &str, capacity: usize, unlocked: bool, reserved: bool) {
        if let Ok(mut maps) = self.maps.write() {
            maps.push(MapInfo {
                name: name.to_string(),
                capacity,
                unlocked,
                reserved,
            });
        }
    }
}

#[async_trait]
impl MapDirectory for InMemoryMapDirectory {
    async fn list_maps(&self) -> Result<Vec<MapInfo>> {
        let maps = self
            .maps
            .read()
            .map_err(|_| crate::error::MatchmakingError::InternalError {
                message: "Failed to acquire map directory lock".to_string(),
            })?;
        Ok(maps.clone())
    }
}
