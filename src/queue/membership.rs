//! In-process membership tracking per queue
//!
//! The tracker is the authoritative in-process record of who is queued,
//! advisory relative to the external ground truth (actual channel
//! occupancy). Missed removal events are compensated by periodic
//! reconciliation rather than by requiring perfect event delivery.

use crate::error::{MatchmakingError, Result};
use crate::types::{
    AdmitUnit, PlayerId, ProcessingState, QueueId, QueueSnapshot, RemovalKey,
};
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tracing::{debug, info, warn};

/// Mutable per-queue state, owned exclusively by the tracker
#[derive(Debug, Clone)]
struct QueueState {
    /// Ordered set of queued player ids, no duplicates
    players: Vec<PlayerId>,
    /// Party id -> ordered member ids; members always all present or all absent
    parties: HashMap<String, Vec<PlayerId>>,
    processing: ProcessingState,
    last_update: DateTime<Utc>,
}

impl QueueState {
    fn new() -> Self {
        Self {
            players: Vec::new(),
            parties: HashMap::new(),
            processing: ProcessingState::Idle,
            last_update: current_timestamp(),
        }
    }

    fn touch(&mut self) {
        self.last_update = current_timestamp();
    }
}

/// Keyed store of queue membership, one state per queue id
#[derive(Debug, Default)]
pub struct MembershipTracker {
    states: RwLock<HashMap<QueueId, QueueState>>,
}

impl MembershipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, queue_id: &str, f: impl FnOnce(&QueueState) -> T) -> Result<Option<T>> {
        let states = self
            .states
            .read()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire membership lock".to_string(),
            })?;
        Ok(states.get(queue_id).map(f))
    }

    fn with_state_mut<T>(
        &self,
        queue_id: &str,
        create: bool,
        f: impl FnOnce(&mut QueueState) -> T,
    ) -> Result<Option<T>> {
        let mut states = self
            .states
            .write()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire membership lock".to_string(),
            })?;
        if create {
            let state = states
                .entry(queue_id.to_string())
                .or_insert_with(QueueState::new);
            Ok(Some(f(state)))
        } else {
            Ok(states.get_mut(queue_id).map(f))
        }
    }

    /// Add a solo player or an entire party atomically. Returns false with
    /// no state change if any member is already tracked in this queue.
    pub fn admit(&self, queue_id: &str, unit: &AdmitUnit) -> Result<bool> {
        let members = unit.member_ids();
        let admitted = self
            .with_state_mut(queue_id, true, |state| {
                if members.iter().any(|id| state.players.contains(id)) {
                    return false;
                }
                if let AdmitUnit::Party(group) = unit {
                    state
                        .parties
                        .insert(group.party_id.clone(), group.members.clone());
                }
                state.players.extend(members.iter().cloned());
                state.touch();
                true
            })?
            .unwrap_or(false);

        if admitted {
            debug!(
                "Admitted {} player(s) to queue {}",
                members.len(),
                queue_id
            );
        }
        Ok(admitted)
    }

    /// Remove a player or an entire party atomically; no-op if absent.
    /// Removing a player who belongs to a tracked party removes the whole
    /// party. Returns the ids actually removed.
    pub fn remove(&self, queue_id: &str, key: &RemovalKey) -> Result<Vec<PlayerId>> {
        let removed = self
            .with_state_mut(queue_id, false, |state| {
                let party_id = match key {
                    RemovalKey::Party(id) => Some(id.clone()),
                    RemovalKey::Player(id) => state
                        .parties
                        .iter()
                        .find(|(_, members)| members.contains(id))
                        .map(|(party_id, _)| party_id.clone()),
                };

                let targets: Vec<PlayerId> = match (&party_id, key) {
                    (Some(party_id), _) => {
                        state.parties.remove(party_id).unwrap_or_default()
                    }
                    (None, RemovalKey::Player(id)) => vec![id.clone()],
                    (None, RemovalKey::Party(_)) => Vec::new(),
                };

                let before = state.players.len();
                state.players.retain(|p| !targets.contains(p));
                let removed: Vec<PlayerId> = targets
                    .into_iter()
                    .take(before - state.players.len())
                    .collect();
                if !removed.is_empty() {
                    state.touch();
                }
                removed
            })?
            .unwrap_or_default();

        if !removed.is_empty() {
            debug!(
                "Removed {} player(s) from queue {}",
                removed.len(),
                queue_id
            );
        }
        Ok(removed)
    }

    /// Drop every tracked player and party no longer present in the external
    /// ground truth. Returns the dropped ids; each drop is logged.
    pub fn reconcile(
        &self,
        queue_id: &str,
        externally_present: &HashSet<PlayerId>,
    ) -> Result<Vec<PlayerId>> {
        let dropped = self
            .with_state_mut(queue_id, false, |state| {
                // A party with any member missing is dropped whole
                let stale_parties: Vec<String> = state
                    .parties
                    .iter()
                    .filter(|(_, members)| {
                        members.iter().any(|m| !externally_present.contains(m))
                    })
                    .map(|(party_id, _)| party_id.clone())
                    .collect();

                let mut doomed: HashSet<PlayerId> = HashSet::new();
                for party_id in &stale_parties {
                    if let Some(members) = state.parties.remove(party_id) {
                        warn!(
                            "Reconcile: party {} no longer fully present in queue {}, dropping {} member(s)",
                            party_id,
                            queue_id,
                            members.len()
                        );
                        doomed.extend(members);
                    }
                }
                for player in &state.players {
                    if !externally_present.contains(player) && !doomed.contains(player) {
                        warn!(
                            "Reconcile: player {} no longer present in queue {}, dropping",
                            player, queue_id
                        );
                        doomed.insert(player.clone());
                    }
                }

                let dropped: Vec<PlayerId> = state
                    .players
                    .iter()
                    .filter(|p| doomed.contains(*p))
                    .cloned()
                    .collect();
                state.players.retain(|p| !doomed.contains(p));
                if !dropped.is_empty() {
                    state.touch();
                }
                dropped
            })?
            .unwrap_or_default();

        if !dropped.is_empty() {
            info!(
                "Reconciled queue {}: dropped {} player(s)",
                queue_id,
                dropped.len()
            );
        }
        Ok(dropped)
    }

    /// Release consumed players after a successful game commit
    pub fn release(&self, queue_id: &str, consumed: &HashSet<PlayerId>) -> Result<()> {
        self.with_state_mut(queue_id, false, |state| {
            state.players.retain(|p| !consumed.contains(p));
            state
                .parties
                .retain(|_, members| members.iter().all(|m| !consumed.contains(m)));
            state.touch();
        })?;
        Ok(())
    }

    /// Tracked player ids in admission order
    pub fn tracked_players(&self, queue_id: &str) -> Result<Vec<PlayerId>> {
        Ok(self
            .with_state(queue_id, |state| state.players.clone())?
            .unwrap_or_default())
    }

    /// Tracked party groupings
    pub fn tracked_parties(&self, queue_id: &str) -> Result<HashMap<String, Vec<PlayerId>>> {
        Ok(self
            .with_state(queue_id, |state| state.parties.clone())?
            .unwrap_or_default())
    }

    /// Current tracked player count
    pub fn player_count(&self, queue_id: &str) -> usize {
        self.with_state(queue_id, |state| state.players.len())
            .ok()
            .flatten()
            .unwrap_or(0)
    }

    /// Whether every one of the given ids is currently tracked
    pub fn all_tracked(&self, queue_id: &str, ids: &[PlayerId]) -> bool {
        self.with_state(queue_id, |state| {
            ids.iter().all(|id| state.players.contains(id))
        })
        .ok()
        .flatten()
        .unwrap_or(false)
    }

    /// Read-only snapshot for external status reporting (last-writer-wins)
    pub fn snapshot(&self, queue_id: &str) -> Option<QueueSnapshot> {
        self.with_state(queue_id, |state| QueueSnapshot {
            queue_id: queue_id.to_string(),
            player_count: state.players.len(),
            party_count: state.parties.len(),
            processing_state: state.processing,
            last_update: state.last_update,
        })
        .ok()
        .flatten()
    }

    /// Current processing state, Idle for unknown queues
    pub fn processing_state(&self, queue_id: &str) -> ProcessingState {
        self.with_state(queue_id, |state| state.processing)
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    /// Idle/Scheduled -> Scheduled. Returns false while Processing.
    pub fn mark_scheduled(&self, queue_id: &str) -> bool {
        self.with_state_mut(queue_id, true, |state| match state.processing {
            ProcessingState::Idle | ProcessingState::Scheduled => {
                state.processing = ProcessingState::Scheduled;
                true
            }
            ProcessingState::Processing => false,
        })
        .ok()
        .flatten()
        .unwrap_or(false)
    }

    /// Scheduled -> Idle, used when a pending run is cancelled
    pub fn clear_scheduled(&self, queue_id: &str) {
        let _ = self.with_state_mut(queue_id, false, |state| {
            if state.processing == ProcessingState::Scheduled {
                state.processing = ProcessingState::Idle;
            }
        });
    }

    /// Enter the processing guard. Returns false if a run is already in
    /// flight for this queue.
    pub fn begin_processing(&self, queue_id: &str) -> bool {
        self.with_state_mut(queue_id, true, |state| match state.processing {
            ProcessingState::Processing => false,
            _ => {
                state.processing = ProcessingState::Processing;
                true
            }
        })
        .ok()
        .flatten()
        .unwrap_or(false)
    }

    /// Leave the processing guard unconditionally
    pub fn end_processing(&self, queue_id: &str) {
        let _ = self.with_state_mut(queue_id, false, |state| {
            state.processing = ProcessingState::Idle;
        });
    }
}
