//! Party directory lookups with a staleness-tolerant cache
//!
//! Party membership reads are allowed to be up to the configured TTL stale
//! (30 seconds by default). A player admitted on outdated grouping inside
//! that window is tolerated by design, not silently corrected.

use crate::error::Result;
use crate::types::{PartyId, PlayerId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

/// Trait for the external party directory
#[async_trait]
pub trait PartyDirectory: Send + Sync {
    /// Ordered member ids for a party, or None if the party does not exist
    async fn party_members(&self, party_id: &str) -> Result<Option<Vec<PlayerId>>>;
}

/// TTL cache over any party directory
pub struct CachedPartyDirectory<D: PartyDirectory> {
    inner: D,
    ttl: Duration,
    cache: Mutex<HashMap<PartyId, (Vec<PlayerId>, Instant)>>,
}

impl<D: PartyDirectory> CachedPartyDirectory<D> {
    pub fn new(inner: D, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Drop expired entries; cheap enough to call opportunistically
    pub fn evict_expired(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.retain(|_, (_, fetched_at)| fetched_at.elapsed() <= self.ttl);
        }
    }
}

#[async_trait]
impl<D: PartyDirectory> PartyDirectory for CachedPartyDirectory<D> {
    async fn party_members(&self, party_id: &str) -> Result<Option<Vec<PlayerId>>> {
        if let Ok(cache) = self.cache.lock() {
            if let Some((members, fetched_at)) = cache.get(party_id) {
                if fetched_at.elapsed() <= self.ttl {
                    debug!("Party {} served from cache", party_id);
                    return Ok(Some(members.clone()));
                }
            }
        }

        let members = self.inner.party_members(party_id).await?;
        if let Some(members) = &members {
            if let Ok(mut cache) = self.cache.lock() {
                cache.insert(party_id.to_string(), (members.clone(), Instant::now()));
            }
        }
        Ok(members)
    }
}

#[async_trait]
impl PartyDirectory for Arc<dyn PartyDirectory> {
    async fn party_members(&self, party_id: &str) -> Result<Option<Vec<PlayerId>>> {
        self.as_ref().party_members(party_id).await
    }
}

/// Map-backed party directory for tests and the simulator
#[derive(Debug, Default)]
pub struct InMemoryPartyDirectory {
    parties: RwLock<HashMap<PartyId, Vec<PlayerId>>>,
}

impl InMemoryPartyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, party_id: impl Into<PartyId>, members: Vec<PlayerId>) {
        if let Ok(mut parties) = self.parties.write() {
            parties.insert(party_id.into(), members);
        }
    }

    pub fn remove(&self, party_id: &str) {
        if let Ok(mut parties) = self.parties.write() {
            parties.remove(party_id);
        }
    }
}

#[async_trait]
impl PartyDirectory for InMemoryPartyDirectory {
    async fn party_members(&self, party_id: &str) -> Result<Option<Vec<PlayerId>>> {
        let parties = self
            .parties
            .read()
            .map_err(|_| crate::error::MatchmakingError::InternalError {
                message: "Failed to acquire party directory lock".to_string(),
            })?;
        Ok(parties.get(party_id).cloned())
    }
}
