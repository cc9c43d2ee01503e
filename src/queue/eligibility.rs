//! Admission eligibility gate
//!
//! Every admission attempt runs the full check sequence against fresh
//! directory data: queue active, registration, restriction flags, elo range
//! (or bypass), bounded online probes, party sizing from entitlements, and
//! the active-game check. A party is admitted or rejected as one unit; a
//! single failing member rejects the whole party.

use crate::config::{EngineSettings, QueueConfig};
use crate::directory::{
    probe_online, ActiveGameDirectory, OnlineProbe, PartyDirectory, PlayerDirectory,
};
use crate::error::Result;
use crate::types::{AdmitUnit, GameId, PartyGroup, PlayerCandidate, PlayerId};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Why an admission attempt was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    QueueInactive,
    NotRegistered { id: PlayerId },
    Restricted { id: PlayerId },
    EloOutOfRange { id: PlayerId, elo: i32, min: i32, max: i32 },
    Offline { display_name: String },
    PartyTooLarge { size: usize, max: usize },
    InActiveGame { game_id: GameId },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::QueueInactive => write!(f, "queue is not accepting players"),
            RejectReason::NotRegistered { id } => write!(f, "player {} is not registered", id),
            RejectReason::Restricted { id } => {
                write!(f, "player {} is restricted from queueing", id)
            }
            RejectReason::EloOutOfRange { id, elo, min, max } => write!(
                f,
                "player {} elo {} is outside the {}..{} range",
                id, elo, min, max
            ),
            RejectReason::Offline { display_name } => {
                write!(f, "{} is not online", display_name)
            }
            RejectReason::PartyTooLarge { size, max } => {
                write!(f, "party of {} exceeds the allowed size of {}", size, max)
            }
            RejectReason::InActiveGame { game_id } => {
                write!(f, "already part of active game #{}", game_id)
            }
        }
    }
}

/// Outcome of running the gate for one candidate
#[derive(Debug)]
pub enum GateDecision {
    /// Admit this unit; candidate records are passed along for logging
    Admit {
        unit: AdmitUnit,
        candidates: Vec<PlayerCandidate>,
    },
    Reject(RejectReason),
}

/// The admission gate, wired with the external directories
pub struct EligibilityGate {
    players: Arc<dyn PlayerDirectory>,
    parties: Arc<dyn PartyDirectory>,
    probe: Arc<dyn OnlineProbe>,
    active_games: Arc<dyn ActiveGameDirectory>,
    settings: EngineSettings,
}

impl EligibilityGate {
    pub fn new(
        players: Arc<dyn PlayerDirectory>,
        parties: Arc<dyn PartyDirectory>,
        probe: Arc<dyn OnlineProbe>,
        active_games: Arc<dyn ActiveGameDirectory>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            players,
            parties,
            probe,
            active_games,
            settings,
        }
    }

    /// Run the full admission sequence for one joining player. Party members
    /// are resolved and checked here, so the returned unit covers everyone
    /// who would be tracked.
    pub async fn evaluate(&self, config: &QueueConfig, player_id: &str) -> Result<GateDecision> {
        if !config.active {
            return Ok(GateDecision::Reject(RejectReason::QueueInactive));
        }

        let candidate = match self.players.lookup_one(player_id).await? {
            Some(candidate) => candidate,
            None => {
                return Ok(GateDecision::Reject(RejectReason::NotRegistered {
                    id: player_id.to_string(),
                }))
            }
        };
        if let Some(reason) = self.check_member(config, &candidate) {
            return Ok(GateDecision::Reject(reason));
        }

        // Resolve the unit; every later check runs over all members
        let (unit, member_ids) = match &candidate.party_id {
            Some(party_id) => match self.parties.party_members(party_id).await? {
                Some(members) => (
                    AdmitUnit::Party(PartyGroup {
                        party_id: party_id.clone(),
                        members: members.clone(),
                    }),
                    members,
                ),
                // Stale party pointer; the player joins alone
                None => (
                    AdmitUnit::Solo(player_id.to_string()),
                    vec![player_id.to_string()],
                ),
            },
            None => (
                AdmitUnit::Solo(player_id.to_string()),
                vec![player_id.to_string()],
            ),
        };

        let candidates = self.players.lookup(&member_ids).await?;
        if candidates.len() != member_ids.len() {
            let missing = member_ids
                .iter()
                .find(|id| !candidates.iter().any(|c| &&c.id == id))
                .cloned()
                .unwrap_or_else(|| player_id.to_string());
            return Ok(GateDecision::Reject(RejectReason::NotRegistered {
                id: missing,
            }));
        }

        for member in &candidates {
            let display_name = match &member.display_name {
                Some(name) => name.clone(),
                None => {
                    return Ok(GateDecision::Reject(RejectReason::NotRegistered {
                        id: member.id.clone(),
                    }))
                }
            };
            if !probe_online(
                self.probe.as_ref(),
                &display_name,
                self.settings.probe_timeout(),
            )
            .await
            {
                return Ok(GateDecision::Reject(RejectReason::Offline { display_name }));
            }
        }

        if member_ids.len() > 1 {
            let allowed = self.allowed_party_size(&candidates);
            if member_ids.len() > allowed {
                return Ok(GateDecision::Reject(RejectReason::PartyTooLarge {
                    size: member_ids.len(),
                    max: allowed,
                }));
            }
        }

        for member in &candidates {
            if let Some(reason) = self.check_member(config, member) {
                return Ok(GateDecision::Reject(reason));
            }
        }

        if let Some(game_id) = self.active_games.find_active_game(&member_ids).await? {
            return Ok(GateDecision::Reject(RejectReason::InActiveGame { game_id }));
        }

        debug!(
            "Gate admitted {} ({} member unit) to queue {}",
            player_id,
            member_ids.len(),
            config.queue_id
        );
        Ok(GateDecision::Admit { unit, candidates })
    }

    /// Re-check a tracked pool right before team formation. Returns the
    /// still-eligible candidates; every drop is logged. Probes use the
    /// shorter re-validation bound.
    pub async fn revalidate(
        &self,
        config: &QueueConfig,
        ids: &[PlayerId],
    ) -> Result<Vec<PlayerCandidate>> {
        let candidates = self.players.lookup(ids).await?;
        let mut eligible = Vec::with_capacity(candidates.len());

        for id in ids {
            let candidate = match candidates.iter().find(|c| &c.id == id) {
                Some(candidate) => candidate.clone(),
                None => {
                    warn!("Re-validation: {} vanished from the player directory", id);
                    continue;
                }
            };
            if let Some(reason) = self.check_member(config, &candidate) {
                warn!("Re-validation dropped {}: {}", id, reason);
                continue;
            }
            let display_name = match &candidate.display_name {
                Some(name) => name.clone(),
                None => {
                    warn!("Re-validation: {} has no display name", id);
                    continue;
                }
            };
            if !probe_online(
                self.probe.as_ref(),
                &display_name,
                self.settings.revalidate_probe_timeout(),
            )
            .await
            {
                warn!("Re-validation dropped {}: {} is offline", id, display_name);
                continue;
            }
            eligible.push(candidate);
        }
        Ok(eligible)
    }

    /// Largest party size any member's entitlements allow, never below the
    /// size permitted to everyone
    fn allowed_party_size(&self, candidates: &[PlayerCandidate]) -> usize {
        candidates
            .iter()
            .flat_map(|c| c.entitlements.iter())
            .filter_map(|e| e.party_size())
            .max()
            .unwrap_or(0)
            .max(self.settings.common_party_size)
    }

    /// Per-member restriction and elo checks shared by admission and
    /// re-validation
    fn check_member(&self, config: &QueueConfig, member: &PlayerCandidate) -> Option<RejectReason> {
        if member.display_name.is_none() {
            return Some(RejectReason::NotRegistered {
                id: member.id.clone(),
            });
        }
        if member.banned || member.frozen {
            return Some(RejectReason::Restricted {
                id: member.id.clone(),
            });
        }
        if !config.has_bypass(&member.entitlements) && !config.elo_in_range(member.elo) {
            return Some(RejectReason::EloOutOfRange {
                id: member.id.clone(),
                elo: member.elo,
                min: config.min_elo,
                max: config.max_elo,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{
        InMemoryActiveGameDirectory, InMemoryPartyDirectory, InMemoryPlayerDirectory,
        StaticOnlineProbe,
    };
    use crate::types::Entitlement;

    struct Fixture {
        players: Arc<InMemoryPlayerDirectory>,
        parties: Arc<InMemoryPartyDirectory>,
        probe: Arc<StaticOnlineProbe>,
        active_games: Arc<InMemoryActiveGameDirectory>,
        gate: EligibilityGate,
    }

    fn fixture() -> Fixture {
        let players = Arc::new(InMemoryPlayerDirectory::new());
        let parties = Arc::new(InMemoryPartyDirectory::new());
        let probe = Arc::new(StaticOnlineProbe::new());
        let active_games = Arc::new(InMemoryActiveGameDirectory::new());
        let gate = EligibilityGate::new(
            players.clone(),
            parties.clone(),
            probe.clone(),
            active_games.clone(),
            EngineSettings::default(),
        );
        Fixture {
            players,
            parties,
            probe,
            active_games,
            gate,
        }
    }

    fn add_online_player(fx: &Fixture, id: &str, elo: i32) {
        fx.players
            .upsert(PlayerCandidate::solo(id, format!("Name{}", id), elo));
        fx.probe.set_online(&format!("Name{}", id), true);
    }

    fn config() -> QueueConfig {
        QueueConfig::new("queue1", 8, 100, 500).unwrap()
    }

    fn reject(decision: GateDecision) -> RejectReason {
        match decision {
            GateDecision::Reject(reason) => reason,
            GateDecision::Admit { .. } => panic!("expected rejection"),
        }
    }

    #[tokio::test]
    async fn test_admits_eligible_solo() {
        let fx = fixture();
        add_online_player(&fx, "p1", 250);

        match fx.gate.evaluate(&config(), "p1").await.unwrap() {
            GateDecision::Admit { unit, candidates } => {
                assert!(matches!(unit, AdmitUnit::Solo(_)));
                assert_eq!(candidates.len(), 1);
            }
            GateDecision::Reject(reason) => panic!("rejected: {}", reason),
        }
    }

    #[tokio::test]
    async fn test_rejects_inactive_queue() {
        let fx = fixture();
        add_online_player(&fx, "p1", 250);
        let mut cfg = config();
        cfg.active = false;

        let reason = reject(fx.gate.evaluate(&cfg, "p1").await.unwrap());
        assert_eq!(reason, RejectReason::QueueInactive);
    }

    #[tokio::test]
    async fn test_rejects_unregistered_and_restricted() {
        let fx = fixture();
        let cfg = config();

        let reason = reject(fx.gate.evaluate(&cfg, "ghost").await.unwrap());
        assert!(matches!(reason, RejectReason::NotRegistered { .. }));

        add_online_player(&fx, "p1", 250);
        fx.players.update("p1", |c| c.banned = true);
        let reason = reject(fx.gate.evaluate(&cfg, "p1").await.unwrap());
        assert!(matches!(reason, RejectReason::Restricted { .. }));

        fx.players.update("p1", |c| {
            c.banned = false;
            c.frozen = true;
        });
        let reason = reject(fx.gate.evaluate(&cfg, "p1").await.unwrap());
        assert!(matches!(reason, RejectReason::Restricted { .. }));
    }

    #[tokio::test]
    async fn test_elo_range_and_bypass() {
        let fx = fixture();
        add_online_player(&fx, "p1", 50);
        let mut cfg = config();

        let reason = reject(fx.gate.evaluate(&cfg, "p1").await.unwrap());
        assert!(matches!(reason, RejectReason::EloOutOfRange { elo: 50, .. }));

        // The bypass entitlement waives the range check
        cfg.bypass.insert(Entitlement::QueueBypass);
        fx.players
            .update("p1", |c| drop(c.entitlements.insert(Entitlement::QueueBypass)));
        assert!(matches!(
            fx.gate.evaluate(&cfg, "p1").await.unwrap(),
            GateDecision::Admit { .. }
        ));
    }

    #[tokio::test]
    async fn test_rejects_offline_player() {
        let fx = fixture();
        fx.players.upsert(PlayerCandidate::solo("p1", "Namep1", 250));

        let reason = reject(fx.gate.evaluate(&config(), "p1").await.unwrap());
        assert!(matches!(reason, RejectReason::Offline { .. }));
    }

    #[tokio::test]
    async fn test_rejects_player_in_active_game() {
        let fx = fixture();
        add_online_player(&fx, "p1", 250);
        fx.active_games.mark_in_game("p1", 7);

        let reason = reject(fx.gate.evaluate(&config(), "p1").await.unwrap());
        assert_eq!(reason, RejectReason::InActiveGame { game_id: 7 });
    }

    #[tokio::test]
    async fn test_party_admitted_as_unit() {
        let fx = fixture();
        add_online_player(&fx, "p1", 250);
        add_online_player(&fx, "p2", 300);
        fx.players.update("p1", |c| {
            c.party_id = Some("party1".to_string());
            c.entitlements.insert(Entitlement::PartyOfTwo);
        });
        fx.players
            .update("p2", |c| c.party_id = Some("party1".to_string()));
        fx.parties
            .upsert("party1", vec!["p1".to_string(), "p2".to_string()]);

        match fx.gate.evaluate(&config(), "p1").await.unwrap() {
            GateDecision::Admit { unit, candidates } => {
                assert_eq!(unit.member_ids().len(), 2);
                assert_eq!(candidates.len(), 2);
            }
            GateDecision::Reject(reason) => panic!("rejected: {}", reason),
        }
    }

    #[tokio::test]
    async fn test_party_rejected_when_member_fails() {
        let fx = fixture();
        add_online_player(&fx, "p1", 250);
        add_online_player(&fx, "p2", 9999); // out of range
        fx.players.update("p1", |c| {
            c.party_id = Some("party1".to_string());
            c.entitlements.insert(Entitlement::PartyOfTwo);
        });
        fx.parties
            .upsert("party1", vec!["p1".to_string(), "p2".to_string()]);

        let reason = reject(fx.gate.evaluate(&config(), "p1").await.unwrap());
        assert!(matches!(reason, RejectReason::EloOutOfRange { .. }));
    }

    #[tokio::test]
    async fn test_party_size_gated_by_entitlements() {
        let fx = fixture();
        for id in ["p1", "p2", "p3"] {
            add_online_player(&fx, id, 250);
            fx.players
                .update(id, |c| c.party_id = Some("party1".to_string()));
        }
        fx.parties.upsert(
            "party1",
            vec!["p1".to_string(), "p2".to_string(), "p3".to_string()],
        );

        // Nobody holds a size entitlement; three is over the common size
        let reason = reject(fx.gate.evaluate(&config(), "p1").await.unwrap());
        assert_eq!(reason, RejectReason::PartyTooLarge { size: 3, max: 1 });

        // One member holding PartyOfThree covers the whole party
        fx.players
            .update("p2", |c| drop(c.entitlements.insert(Entitlement::PartyOfThree)));
        assert!(matches!(
            fx.gate.evaluate(&config(), "p1").await.unwrap(),
            GateDecision::Admit { .. }
        ));
    }

    #[tokio::test]
    async fn test_revalidate_drops_changed_players() {
        let fx = fixture();
        add_online_player(&fx, "p1", 250);
        add_online_player(&fx, "p2", 250);
        add_online_player(&fx, "p3", 250);

        // p2 got banned and p3 went offline after joining
        fx.players.update("p2", |c| c.banned = true);
        fx.probe.set_online("Namep3", false);

        let ids: Vec<PlayerId> = ["p1", "p2", "p3"].iter().map(|s| s.to_string()).collect();
        let eligible = fx.gate.revalidate(&config(), &ids).await.unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, "p1");
    }
}
