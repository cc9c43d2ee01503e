//! Top-level matchmaking orchestration
//!
//! The `Matchmaker` owns the membership tracker and processing scheduler and
//! wires them to the external directories, the balancer, the map selector,
//! the game creator, and the notifier. Admission runs the eligibility gate,
//! a full queue arms the debounced processing run, and a run converts the
//! pool into one or more games back to back.

use crate::config::{EngineSettings, QueueConfig, QueueRegistry};
use crate::directory::{
    ActiveGameDirectory, CachedPartyDirectory, OnlineProbe, PartyDirectory, PlayerDirectory,
};
use crate::error::{MatchmakingError, Result};
use crate::game::{select_balanced_teams, GameCreator, MapDirectory, MapSelector};
use crate::notify::{NotificationEnvelope, Notifier, PRIORITY_HIGH, PRIORITY_NORMAL};
use crate::queue::{EligibilityGate, GateDecision, MembershipTracker, ProcessingScheduler};
use crate::types::{
    AdmitOutcome, PartyGroup, PlayerCandidate, PlayerId, QueueSnapshot, RemovalKey,
};
use crate::utils::is_valid_id;
use serde::Serialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, Weak};
use tracing::{debug, error, info, warn};

/// Counters surfaced for status reporting
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchmakerStats {
    pub candidates_admitted: u64,
    pub candidates_rejected: u64,
    pub games_created: u64,
    pub runs_completed: u64,
    pub reconcile_drops: u64,
}

/// Releases the per-queue processing guard when a run ends, however it ends
struct RunGuard<'a> {
    tracker: &'a MembershipTracker,
    queue_id: &'a str,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.tracker.end_processing(self.queue_id);
    }
}

/// The matchmaking engine
pub struct Matchmaker {
    self_ref: Weak<Matchmaker>,
    tracker: MembershipTracker,
    scheduler: Arc<ProcessingScheduler>,
    registry: Arc<dyn QueueRegistry>,
    gate: EligibilityGate,
    map_selector: MapSelector,
    creator: Arc<dyn GameCreator>,
    notifier: Arc<dyn Notifier>,
    settings: EngineSettings,
    stats: RwLock<MatchmakerStats>,
}

impl Matchmaker {
    /// Wire a new engine. Party lookups are wrapped in the staleness-
    /// tolerant cache here.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<dyn QueueRegistry>,
        players: Arc<dyn PlayerDirectory>,
        parties: Arc<dyn PartyDirectory>,
        probe: Arc<dyn OnlineProbe>,
        active_games: Arc<dyn ActiveGameDirectory>,
        maps: Arc<dyn MapDirectory>,
        creator: Arc<dyn GameCreator>,
        notifier: Arc<dyn Notifier>,
        settings: EngineSettings,
    ) -> Arc<Self> {
        let cached_parties: Arc<dyn PartyDirectory> = Arc::new(CachedPartyDirectory::new(
            parties,
            settings.party_cache_ttl(),
        ));
        let gate = EligibilityGate::new(
            players,
            cached_parties,
            probe,
            active_games,
            settings.clone(),
        );
        let map_selector = MapSelector::new(maps, settings.default_map.clone());

        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            tracker: MembershipTracker::new(),
            scheduler: Arc::new(ProcessingScheduler::new()),
            registry,
            gate,
            map_selector,
            creator,
            notifier,
            settings,
            stats: RwLock::new(MatchmakerStats::default()),
        })
    }

    /// Admit one player (and their party, if any) into a queue.
    ///
    /// A malformed id or unknown queue is an error; every eligibility
    /// failure is a rejected outcome with a human-readable reason. Filling
    /// the queue arms the debounced processing run.
    pub async fn admit_candidate(&self, queue_id: &str, player_id: &str) -> Result<AdmitOutcome> {
        if !is_valid_id(player_id) {
            return Err(MatchmakingError::InvalidPlayerId {
                id: player_id.to_string(),
            }
            .into());
        }
        let config = self.queue_config(queue_id)?;

        let decision = self.gate.evaluate(&config, player_id).await?;
        let (unit, member_count) = match decision {
            GateDecision::Reject(reason) => {
                info!(
                    "Rejected {} from queue {}: {}",
                    player_id, queue_id, reason
                );
                self.bump(|s| s.candidates_rejected += 1);
                self.notify_best_effort(
                    NotificationEnvelope::new(
                        "admission.rejected",
                        player_id,
                        json!({ "queue_id": queue_id, "reason": reason.to_string() }),
                    ),
                    PRIORITY_NORMAL,
                )
                .await;
                return Ok(AdmitOutcome::rejected(reason.to_string()));
            }
            GateDecision::Admit { unit, candidates } => (unit, candidates.len()),
        };

        if !self.tracker.admit(queue_id, &unit)? {
            self.bump(|s| s.candidates_rejected += 1);
            return Ok(AdmitOutcome::rejected("already queued"));
        }
        self.bump(|s| s.candidates_admitted += member_count as u64);

        let count = self.tracker.player_count(queue_id);
        info!(
            "Admitted {} ({} member unit) to queue {} ({}/{})",
            player_id, member_count, queue_id, count, config.capacity
        );
        if count >= config.capacity {
            self.schedule_run(queue_id);
        }
        Ok(AdmitOutcome::accepted())
    }

    /// Remove a player or party from a queue by id. A player id belonging
    /// to a tracked party removes the whole party. Dropping below capacity
    /// cancels a pending processing run.
    pub async fn remove_candidate(&self, queue_id: &str, id: &str) -> Result<Vec<PlayerId>> {
        let mut removed = self
            .tracker
            .remove(queue_id, &RemovalKey::Player(id.to_string()))?;
        if removed.is_empty() {
            removed = self
                .tracker
                .remove(queue_id, &RemovalKey::Party(id.to_string()))?;
        }
        if removed.is_empty() {
            return Ok(removed);
        }

        if let Ok(Some(config)) = self.registry.get_queue(queue_id) {
            if self.tracker.player_count(queue_id) < config.capacity
                && self.scheduler.cancel(queue_id)
            {
                self.tracker.clear_scheduled(queue_id);
                info!(
                    "Cancelled pending run for queue {}: dropped below capacity",
                    queue_id
                );
            }
        }
        Ok(removed)
    }

    /// Read-only view of a queue, None if it was never touched
    pub fn queue_snapshot(&self, queue_id: &str) -> Option<QueueSnapshot> {
        self.tracker.snapshot(queue_id)
    }

    /// Sweep tracked membership against the external ground truth, dropping
    /// players and parties no longer present. May arm a run (still full) or
    /// cancel one (no longer full).
    pub async fn reconcile_queue(
        &self,
        queue_id: &str,
        externally_present: &HashSet<PlayerId>,
    ) -> Result<Vec<PlayerId>> {
        let dropped = self.tracker.reconcile(queue_id, externally_present)?;
        self.bump(|s| s.reconcile_drops += dropped.len() as u64);

        if let Ok(Some(config)) = self.registry.get_queue(queue_id) {
            let count = self.tracker.player_count(queue_id);
            if count >= config.capacity {
                self.schedule_run(queue_id);
            } else if self.scheduler.cancel(queue_id) {
                self.tracker.clear_scheduled(queue_id);
            }
        }
        Ok(dropped)
    }

    /// Run team formation over a caller-supplied pool, bypassing the
    /// tracker and the scheduler guard. Returns the number of games
    /// created.
    pub async fn force_process_queue(
        &self,
        players: &[PlayerCandidate],
        config: &QueueConfig,
        max_games: usize,
    ) -> usize {
        let mut remaining: Vec<PlayerCandidate> = players.to_vec();
        let mut games = 0usize;

        while games < max_games && remaining.len() >= config.capacity {
            let groups = party_groups_of(&remaining);
            let assignment = match select_balanced_teams(&remaining, &groups, config.capacity) {
                Ok(assignment) => assignment,
                Err(failure) => {
                    debug!("Forced run on queue {} stopped: {}", config.queue_id, failure);
                    break;
                }
            };
            let map = self.map_selector.select(config.capacity).await;
            match self.creator.create_game(config, &assignment, &map).await {
                Ok(game_id) => {
                    self.bump(|s| s.games_created += 1);
                    games += 1;
                    remaining.retain(|c| !assignment.used_players.contains(&c.id));
                    self.announce_game(&config.queue_id, game_id, &map, &assignment)
                        .await;
                }
                Err(e) => {
                    error!("Game creation failed on forced run: {}", e);
                    break;
                }
            }
            if games < max_games && remaining.len() >= config.capacity {
                tokio::time::sleep(self.settings.inter_game_pause()).await;
            }
        }
        games
    }

    /// Engine counters
    pub fn get_stats(&self) -> MatchmakerStats {
        self.stats
            .read()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }

    fn queue_config(&self, queue_id: &str) -> Result<QueueConfig> {
        match self.registry.get_queue(queue_id)? {
            Some(config) => Ok(config),
            None => Err(MatchmakingError::QueueNotFound {
                queue_id: queue_id.to_string(),
            }
            .into()),
        }
    }

    /// Arm the debounced run for a queue. Re-arms while one is pending,
    /// does nothing while a run is in flight.
    fn schedule_run(&self, queue_id: &str) {
        if !self.tracker.mark_scheduled(queue_id) {
            debug!(
                "Queue {} is processing, not scheduling another run",
                queue_id
            );
            return;
        }
        let engine = match self.self_ref.upgrade() {
            Some(engine) => engine,
            None => return,
        };
        let key = queue_id.to_string();
        debug!(
            "Scheduling processing run for queue {} in {:?}",
            queue_id,
            self.settings.debounce_delay()
        );
        self.scheduler
            .schedule(queue_id, self.settings.debounce_delay(), move || async move {
                engine.run_processing(&key).await;
            });
    }

    /// Entry point of the debounced run; enforces the single-run guard
    async fn run_processing(&self, queue_id: &str) {
        if !self.tracker.begin_processing(queue_id) {
            debug!("Run for queue {} skipped: already in flight", queue_id);
            return;
        }
        let _guard = RunGuard {
            tracker: &self.tracker,
            queue_id,
        };

        let games = self.process_queue(queue_id).await;
        self.bump(|s| s.runs_completed += 1);
        info!(
            "Processing run for queue {} finished with {} game(s)",
            queue_id, games
        );
        drop(_guard);

        // Admissions during the run may have refilled the queue
        if let Ok(Some(config)) = self.registry.get_queue(queue_id) {
            if self.tracker.player_count(queue_id) >= config.capacity {
                self.schedule_run(queue_id);
            }
        }
    }

    /// Convert the tracked pool into games until the queue drains below
    /// capacity, something fails, or the per-run cap is hit. Every failure
    /// is absorbed; the run reports how many games it did create.
    async fn process_queue(&self, queue_id: &str) -> usize {
        let config = match self.registry.get_queue(queue_id) {
            Ok(Some(config)) => config,
            Ok(None) => {
                warn!("Queue {} vanished from the registry, skipping run", queue_id);
                return 0;
            }
            Err(e) => {
                error!("Registry lookup failed for queue {}: {}", queue_id, e);
                return 0;
            }
        };
        if !config.active {
            return 0;
        }

        let mut games = 0usize;
        while games < self.settings.max_games_per_run {
            let tracked = match self.tracker.tracked_players(queue_id) {
                Ok(tracked) => tracked,
                Err(e) => {
                    error!("Membership read failed for queue {}: {}", queue_id, e);
                    break;
                }
            };
            if tracked.len() < config.capacity {
                break;
            }

            let pool = match self.revalidated_pool(&config, queue_id, &tracked).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("Pool re-validation failed for queue {}: {}", queue_id, e);
                    break;
                }
            };
            if pool.len() < config.capacity {
                debug!(
                    "Queue {} dropped to {} eligible players, ending run",
                    queue_id,
                    pool.len()
                );
                break;
            }

            let groups = match self.tracked_groups(queue_id, &pool) {
                Ok(groups) => groups,
                Err(e) => {
                    error!("Party read failed for queue {}: {}", queue_id, e);
                    break;
                }
            };
            let assignment = match select_balanced_teams(&pool, &groups, config.capacity) {
                Ok(assignment) => assignment,
                Err(failure) => {
                    debug!("Balancing for queue {} stopped: {}", queue_id, failure);
                    break;
                }
            };
            let map = self.map_selector.select(config.capacity).await;

            // Selected players must still be tracked at the commit point;
            // a concurrent removal aborts this game and keeps earlier ones
            let selected: Vec<PlayerId> = assignment.used_players.iter().cloned().collect();
            if !self.tracker.all_tracked(queue_id, &selected) {
                warn!(
                    "Queue {} changed under the run, aborting this game",
                    queue_id
                );
                break;
            }

            match self.creator.create_game(&config, &assignment, &map).await {
                Ok(game_id) => {
                    if let Err(e) = self.tracker.release(queue_id, &assignment.used_players) {
                        error!("Release failed for queue {}: {}", queue_id, e);
                    }
                    self.bump(|s| s.games_created += 1);
                    games += 1;
                    self.announce_game(queue_id, game_id, &map, &assignment).await;
                }
                Err(e) => {
                    error!("Game creation failed for queue {}: {}", queue_id, e);
                    break;
                }
            }

            if games < self.settings.max_games_per_run
                && self.tracker.player_count(queue_id) >= config.capacity
            {
                tokio::time::sleep(self.settings.inter_game_pause()).await;
            }
        }
        games
    }

    /// Re-validate the tracked pool and drop ineligible members from the
    /// tracker (party-atomically), returning candidates that survived
    async fn revalidated_pool(
        &self,
        config: &QueueConfig,
        queue_id: &str,
        tracked: &[PlayerId],
    ) -> Result<Vec<PlayerCandidate>> {
        let eligible = self.gate.revalidate(config, tracked).await?;
        let eligible_ids: HashSet<&str> = eligible.iter().map(|c| c.id.as_str()).collect();

        for id in tracked {
            if !eligible_ids.contains(id.as_str()) {
                self.tracker
                    .remove(queue_id, &RemovalKey::Player(id.clone()))?;
            }
        }

        // Ineligible party members take their whole party out, so filter
        // the survivors down to what is still tracked
        let still_tracked: HashSet<PlayerId> =
            self.tracker.tracked_players(queue_id)?.into_iter().collect();
        Ok(eligible
            .into_iter()
            .filter(|c| still_tracked.contains(&c.id))
            .collect())
    }

    /// Tracked party groups restricted to the pool, in pool encounter order
    fn tracked_groups(&self, queue_id: &str, pool: &[PlayerCandidate]) -> Result<Vec<PartyGroup>> {
        let parties = self.tracker.tracked_parties(queue_id)?;
        let member_to_party: HashMap<&str, &str> = parties
            .iter()
            .flat_map(|(party_id, members)| {
                members.iter().map(move |m| (m.as_str(), party_id.as_str()))
            })
            .collect();
        let pool_ids: HashSet<&str> = pool.iter().map(|c| c.id.as_str()).collect();

        let mut seen: HashSet<&str> = HashSet::new();
        let mut groups = Vec::new();
        for candidate in pool {
            if let Some(&party_id) = member_to_party.get(candidate.id.as_str()) {
                if seen.insert(party_id) {
                    let members: Vec<PlayerId> = parties[party_id]
                        .iter()
                        .filter(|m| pool_ids.contains(m.as_str()))
                        .cloned()
                        .collect();
                    if members.len() > 1 {
                        groups.push(PartyGroup {
                            party_id: party_id.to_string(),
                            members,
                        });
                    }
                }
            }
        }
        Ok(groups)
    }

    async fn announce_game(
        &self,
        queue_id: &str,
        game_id: u64,
        map: &str,
        assignment: &crate::types::TeamAssignment,
    ) {
        self.notify_best_effort(
            NotificationEnvelope::new(
                "game.created",
                queue_id,
                json!({
                    "game_id": game_id,
                    "map": map,
                    "team1": assignment.team1,
                    "team2": assignment.team2,
                    "team1_avg_elo": assignment.team1_avg_elo,
                    "team2_avg_elo": assignment.team2_avg_elo,
                }),
            ),
            PRIORITY_HIGH,
        )
        .await;
    }

    async fn notify_best_effort(&self, envelope: NotificationEnvelope, priority: u8) {
        if let Err(e) = self.notifier.notify(envelope, priority).await {
            warn!("Notification delivery failed: {}", e);
        }
    }

    fn bump(&self, update: impl FnOnce(&mut MatchmakerStats)) {
        if let Ok(mut stats) = self.stats.write() {
            update(&mut stats);
        }
    }
}

/// Party groups present in a candidate slice, keyed off each candidate's
/// party pointer, in encounter order
fn party_groups_of(pool: &[PlayerCandidate]) -> Vec<PartyGroup> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut groups = Vec::new();
    for candidate in pool {
        if let Some(party_id) = &candidate.party_id {
            if seen.insert(party_id.as_str()) {
                let members: Vec<PlayerId> = pool
                    .iter()
                    .filter(|c| c.party_id.as_deref() == Some(party_id.as_str()))
                    .map(|c| c.id.clone())
                    .collect();
                if members.len() > 1 {
                    groups.push(PartyGroup {
                        party_id: party_id.clone(),
                        members,
                    });
                }
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticQueueRegistry;
    use crate::directory::{
        InMemoryActiveGameDirectory, InMemoryPartyDirectory, InMemoryPlayerDirectory,
        StaticOnlineProbe,
    };
    use crate::game::{InMemoryMapDirectory, RecordingGameCreator};
    use crate::notify::MockNotifier;
    use crate::types::Entitlement;
    use std::time::Duration;

    struct Harness {
        engine: Arc<Matchmaker>,
        registry: Arc<StaticQueueRegistry>,
        players: Arc<InMemoryPlayerDirectory>,
        parties: Arc<InMemoryPartyDirectory>,
        probe: Arc<StaticOnlineProbe>,
        creator: Arc<RecordingGameCreator>,
        notifier: Arc<MockNotifier>,
    }

    fn harness() -> Harness {
        let registry = Arc::new(StaticQueueRegistry::new());
        let players = Arc::new(InMemoryPlayerDirectory::new());
        let parties = Arc::new(InMemoryPartyDirectory::new());
        let probe = Arc::new(StaticOnlineProbe::new());
        let active_games = Arc::new(InMemoryActiveGameDirectory::new());
        let maps = Arc::new(InMemoryMapDirectory::new());
        let creator = Arc::new(RecordingGameCreator::new());
        let notifier = Arc::new(MockNotifier::new());

        let engine = Matchmaker::new(
            registry.clone(),
            players.clone(),
            parties.clone(),
            probe.clone(),
            active_games,
            maps,
            creator.clone(),
            notifier.clone(),
            EngineSettings::default(),
        );
        Harness {
            engine,
            registry,
            players,
            parties,
            probe,
            creator,
            notifier,
        }
    }

    fn add_queue(h: &Harness, queue_id: &str, capacity: usize) {
        h.registry
            .upsert(QueueConfig::new(queue_id, capacity, 0, 1000).unwrap())
            .unwrap();
    }

    fn add_online_player(h: &Harness, id: &str, elo: i32) {
        h.players
            .upsert(PlayerCandidate::solo(id, format!("Name{}", id), elo));
        h.probe.set_online(&format!("Name{}", id), true);
    }

    async fn fill_queue(h: &Harness, queue_id: &str, count: usize) {
        for i in 0..count {
            let id = format!("p{}", i);
            add_online_player(h, &id, 100 + i as i32);
            let outcome = h.engine.admit_candidate(queue_id, &id).await.unwrap();
            assert!(outcome.accepted, "{:?}", outcome.reason);
        }
    }

    #[tokio::test]
    async fn test_admit_and_snapshot() {
        let h = harness();
        add_queue(&h, "q1", 8);
        add_online_player(&h, "p1", 250);

        let outcome = h.engine.admit_candidate("q1", "p1").await.unwrap();
        assert!(outcome.accepted);

        let snapshot = h.engine.queue_snapshot("q1").unwrap();
        assert_eq!(snapshot.player_count, 1);
        assert_eq!(h.engine.get_stats().candidates_admitted, 1);
    }

    #[tokio::test]
    async fn test_malformed_id_and_unknown_queue_are_errors() {
        let h = harness();
        add_queue(&h, "q1", 8);

        assert!(h.engine.admit_candidate("q1", "bad id!").await.is_err());
        assert!(h.engine.admit_candidate("missing", "p1").await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_admission_rejected() {
        let h = harness();
        add_queue(&h, "q1", 8);
        add_online_player(&h, "p1", 250);

        assert!(h.engine.admit_candidate("q1", "p1").await.unwrap().accepted);
        let dup = h.engine.admit_candidate("q1", "p1").await.unwrap();
        assert!(!dup.accepted);
        assert_eq!(h.engine.queue_snapshot("q1").unwrap().player_count, 1);
    }

    #[tokio::test]
    async fn test_rejection_notifies_the_player() {
        let h = harness();
        add_queue(&h, "q1", 8);
        add_online_player(&h, "p1", 250);
        h.players.update("p1", |c| c.banned = true);

        let outcome = h.engine.admit_candidate("q1", "p1").await.unwrap();
        assert!(!outcome.accepted);

        let rejections = h.notifier.events_named("admission.rejected");
        assert_eq!(rejections.len(), 1);
        assert_eq!(rejections[0].destination, "p1");
        assert_eq!(h.engine.get_stats().candidates_rejected, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_creates_game_after_debounce() {
        let h = harness();
        add_queue(&h, "q1", 4);
        fill_queue(&h, "q1", 4).await;

        assert_eq!(h.creator.count(), 0);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(h.creator.count(), 1);
        assert_eq!(h.engine.queue_snapshot("q1").unwrap().player_count, 0);
        assert_eq!(h.notifier.events_named("game.created").len(), 1);

        let stats = h.engine.get_stats();
        assert_eq!(stats.games_created, 1);
        assert_eq!(stats.runs_completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_removal_below_capacity_cancels_pending_run() {
        let h = harness();
        add_queue(&h, "q1", 4);
        fill_queue(&h, "q1", 4).await;

        let removed = h.engine.remove_candidate("q1", "p0").await.unwrap();
        assert_eq!(removed, vec!["p0".to_string()]);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(h.creator.count(), 0);
        assert_eq!(h.engine.get_stats().runs_completed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multi_game_run_drains_a_deep_queue() {
        let h = harness();
        add_queue(&h, "q1", 4);
        fill_queue(&h, "q1", 8).await;

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(h.creator.count(), 2);
        assert_eq!(h.engine.queue_snapshot("q1").unwrap().player_count, 0);
        // One debounced run covered both games
        assert_eq!(h.engine.get_stats().runs_completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_party_seated_together_end_to_end() {
        let h = harness();
        add_queue(&h, "q1", 4);
        for id in ["p1", "p2"] {
            add_online_player(&h, id, 500);
            h.players.update(id, |c| {
                c.party_id = Some("party1".to_string());
                c.entitlements.insert(Entitlement::PartyOfTwo);
            });
        }
        h.parties
            .upsert("party1", vec!["p1".to_string(), "p2".to_string()]);
        add_online_player(&h, "p3", 100);
        add_online_player(&h, "p4", 200);

        assert!(h.engine.admit_candidate("q1", "p1").await.unwrap().accepted);
        assert_eq!(h.engine.queue_snapshot("q1").unwrap().player_count, 2);
        assert!(h.engine.admit_candidate("q1", "p3").await.unwrap().accepted);
        assert!(h.engine.admit_candidate("q1", "p4").await.unwrap().accepted);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(h.creator.count(), 1);

        let game = &h.creator.created()[0];
        let on_team1 = game.team1.contains(&"p1".to_string());
        assert_eq!(game.team1.contains(&"p2".to_string()), on_team1);
        assert_eq!(game.team2.contains(&"p2".to_string()), !on_team1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_revalidation_drops_offline_player_and_aborts() {
        let h = harness();
        add_queue(&h, "q1", 4);
        fill_queue(&h, "q1", 4).await;

        // p2 logs off inside the debounce window
        h.probe.set_online("Namep2", false);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(h.creator.count(), 0);
        assert_eq!(h.engine.queue_snapshot("q1").unwrap().player_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconcile_drops_and_cancels() {
        let h = harness();
        add_queue(&h, "q1", 4);
        fill_queue(&h, "q1", 4).await;

        // Ground truth says p3 already left
        let present: HashSet<PlayerId> =
            ["p0", "p1", "p2"].iter().map(|s| s.to_string()).collect();
        let dropped = h.engine.reconcile_queue("q1", &present).await.unwrap();
        assert_eq!(dropped, vec!["p3".to_string()]);
        assert_eq!(h.engine.get_stats().reconcile_drops, 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(h.creator.count(), 0);
    }

    #[tokio::test]
    async fn test_force_process_queue_bypasses_tracker() {
        let h = harness();
        let config = QueueConfig::new("adhoc", 4, 0, 1000).unwrap();
        let pool: Vec<PlayerCandidate> = (0..8)
            .map(|i| PlayerCandidate::solo(format!("p{}", i), format!("Name{}", i), 100 * i))
            .collect();

        let games = h.engine.force_process_queue(&pool, &config, 10).await;
        assert_eq!(games, 2);
        assert_eq!(h.creator.count(), 2);
        assert!(h.engine.queue_snapshot("adhoc").is_none());
    }

    #[tokio::test]
    async fn test_force_process_respects_game_cap() {
        let h = harness();
        let config = QueueConfig::new("adhoc", 4, 0, 1000).unwrap();
        let pool: Vec<PlayerCandidate> = (0..12)
            .map(|i| PlayerCandidate::solo(format!("p{}", i), format!("Name{}", i), 100))
            .collect();

        let games = h.engine.force_process_queue(&pool, &config, 1).await;
        assert_eq!(games, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifier_failure_does_not_block_games() {
        let h = harness();
        add_queue(&h, "q1", 4);
        h.notifier.set_fail(true);
        fill_queue(&h, "q1", 4).await;

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(h.creator.count(), 1);
        assert_eq!(h.engine.queue_snapshot("q1").unwrap().player_count, 0);
    }
}
