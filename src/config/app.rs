//! Engine-wide settings
//!
//! This module defines the tunables of the matchmaking engine, including
//! environment variable loading and validation.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Tunables for scheduling, probing and processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Debounce delay between a queue filling and the processing run, in ms
    pub debounce_delay_ms: u64,
    /// Pause between consecutive games of one processing run, in ms
    pub inter_game_pause_ms: u64,
    /// Online-status probe bound during admission, in seconds
    pub probe_timeout_seconds: u64,
    /// Online-status probe bound during pool re-validation, in seconds
    pub revalidate_probe_timeout_seconds: u64,
    /// Hard cap on games created by a single processing run
    pub max_games_per_run: usize,
    /// Party membership reads may be up to this stale, in seconds
    pub party_cache_ttl_seconds: u64,
    /// Party size allowed without any party-size entitlement
    pub common_party_size: usize,
    /// Map used when every selection tier is empty or unavailable
    pub default_map: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            debounce_delay_ms: 1000,
            inter_game_pause_ms: 1000,
            probe_timeout_seconds: 5,
            revalidate_probe_timeout_seconds: 3,
            max_games_per_run: 10,
            party_cache_ttl_seconds: 30,
            common_party_size: 1,
            default_map: "Aquarius".to_string(),
        }
    }
}

impl EngineSettings {
    /// Load settings from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();

        if let Ok(delay) = env::var("DEBOUNCE_DELAY_MS") {
            settings.debounce_delay_ms = delay
                .parse()
                .map_err(|_| anyhow!("Invalid DEBOUNCE_DELAY_MS value: {}", delay))?;
        }
        if let Ok(pause) = env::var("INTER_GAME_PAUSE_MS") {
            settings.inter_game_pause_ms = pause
                .parse()
                .map_err(|_| anyhow!("Invalid INTER_GAME_PAUSE_MS value: {}", pause))?;
        }
        if let Ok(timeout) = env::var("PROBE_TIMEOUT_SECONDS") {
            settings.probe_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid PROBE_TIMEOUT_SECONDS value: {}", timeout))?;
        }
        if let Ok(timeout) = env::var("REVALIDATE_PROBE_TIMEOUT_SECONDS") {
            settings.revalidate_probe_timeout_seconds = timeout.parse().map_err(|_| {
                anyhow!("Invalid REVALIDATE_PROBE_TIMEOUT_SECONDS value: {}", timeout)
            })?;
        }
        if let Ok(max_games) = env::var("MAX_GAMES_PER_RUN") {
            settings.max_games_per_run = max_games
                .parse()
                .map_err(|_| anyhow!("Invalid MAX_GAMES_PER_RUN value: {}", max_games))?;
        }
        if let Ok(ttl) = env::var("PARTY_CACHE_TTL_SECONDS") {
            settings.party_cache_ttl_seconds = ttl
                .parse()
                .map_err(|_| anyhow!("Invalid PARTY_CACHE_TTL_SECONDS value: {}", ttl))?;
        }
        if let Ok(size) = env::var("COMMON_PARTY_SIZE") {
            settings.common_party_size = size
                .parse()
                .map_err(|_| anyhow!("Invalid COMMON_PARTY_SIZE value: {}", size))?;
        }
        if let Ok(map) = env::var("DEFAULT_MAP") {
            settings.default_map = map;
        }

        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Debounce delay as a Duration
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }

    /// Inter-game pause as a Duration
    pub fn inter_game_pause(&self) -> Duration {
        Duration::from_millis(self.inter_game_pause_ms)
    }

    /// Admission probe bound as a Duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    /// Re-validation probe bound as a Duration
    pub fn revalidate_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.revalidate_probe_timeout_seconds)
    }

    /// Party cache TTL as a Duration
    pub fn party_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.party_cache_ttl_seconds)
    }
}

/// Validate settings values
pub fn validate_settings(settings: &EngineSettings) -> Result<()> {
    if settings.probe_timeout_seconds == 0 {
        return Err(anyhow!("Probe timeout must be greater than 0"));
    }
    if settings.revalidate_probe_timeout_seconds == 0 {
        return Err(anyhow!("Re-validation probe timeout must be greater than 0"));
    }
    if settings.max_games_per_run == 0 {
        return Err(anyhow!("Max games per run must be greater than 0"));
    }
    if settings.common_party_size == 0 {
        return Err(anyhow!("Common party size must be greater than 0"));
    }
    if settings.default_map.is_empty() {
        return Err(anyhow!("Default map cannot be empty"));
    }
    Ok(())
}
