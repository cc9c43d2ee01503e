//! Deterministic two-team balancer
//!
//! Pure function over an eligible pool: no randomness, no clocks, no I/O.
//! Parties are seated first (largest first, never split), then solos in
//! descending elo order. The same pool, parties, and capacity always yield
//! the same assignment.

use crate::types::{PartyGroup, PlayerCandidate, PlayerId, TeamAssignment};
use crate::utils::rounded_mean;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, warn};

/// Why no assignment could be produced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalanceFailure {
    #[error("Only {available} of {capacity} required players could be seated")]
    InsufficientPlayers { available: usize, capacity: usize },

    #[error("Capacity {capacity} is not a positive even number")]
    InvalidCapacity { capacity: usize },
}

/// Partition `pool` into two teams of `capacity / 2`.
///
/// Parties are taken in descending size (ties keep their given order) and
/// placed whole: a party that both teams have room for goes to the smaller
/// team, team1 on a tie. Parties larger than a team, or left without room,
/// are skipped and their members stay out of the game. Remaining players
/// are seated solo in descending elo order under the same smaller-team
/// rule. Fewer than `capacity` seated players is a failure and consumes
/// nobody.
pub fn select_balanced_teams(
    pool: &[PlayerCandidate],
    parties: &[PartyGroup],
    capacity: usize,
) -> Result<TeamAssignment, BalanceFailure> {
    if capacity == 0 || capacity % 2 != 0 {
        return Err(BalanceFailure::InvalidCapacity { capacity });
    }
    let team_size = capacity / 2;
    if pool.len() < capacity {
        return Err(BalanceFailure::InsufficientPlayers {
            available: pool.len(),
            capacity,
        });
    }

    let elo_of: HashMap<&str, i32> = pool.iter().map(|c| (c.id.as_str(), c.elo)).collect();
    let in_pool: HashSet<&str> = pool.iter().map(|c| c.id.as_str()).collect();

    let mut team1: Vec<PlayerId> = Vec::with_capacity(team_size);
    let mut team2: Vec<PlayerId> = Vec::with_capacity(team_size);
    // Every id belonging to a considered party, placed or not; skipped
    // parties stay together outside the game rather than being split into
    // solos
    let mut party_bound: HashSet<PlayerId> = HashSet::new();

    let mut ordered_parties: Vec<&PartyGroup> = parties
        .iter()
        .filter(|group| group.members.iter().all(|m| in_pool.contains(m.as_str())))
        .collect();
    ordered_parties.sort_by(|a, b| b.members.len().cmp(&a.members.len()));

    for group in ordered_parties {
        let size = group.members.len();
        party_bound.extend(group.members.iter().cloned());

        if size > team_size {
            warn!(
                "Party {} of {} cannot fit a team of {}, skipping",
                group.party_id, size, team_size
            );
            continue;
        }
        let fits1 = team_size - team1.len() >= size;
        let fits2 = team_size - team2.len() >= size;
        match (fits1, fits2) {
            (true, true) => {
                if team1.len() <= team2.len() {
                    team1.extend(group.members.iter().cloned());
                } else {
                    team2.extend(group.members.iter().cloned());
                }
            }
            (true, false) => team1.extend(group.members.iter().cloned()),
            (false, true) => team2.extend(group.members.iter().cloned()),
            (false, false) => {
                warn!(
                    "No team has room for party {} of {}, skipping",
                    group.party_id, size
                );
            }
        }
    }

    let placed: HashSet<&str> = team1
        .iter()
        .chain(team2.iter())
        .map(|id| id.as_str())
        .collect();
    let mut solos: Vec<&PlayerCandidate> = pool
        .iter()
        .filter(|c| !placed.contains(c.id.as_str()) && !party_bound.contains(&c.id))
        .collect();
    solos.sort_by(|a, b| b.elo.cmp(&a.elo));

    for candidate in solos {
        if team1.len() == team_size && team2.len() == team_size {
            break;
        }
        if team1.len() < team_size && team1.len() <= team2.len() {
            team1.push(candidate.id.clone());
        } else if team2.len() < team_size {
            team2.push(candidate.id.clone());
        } else {
            team1.push(candidate.id.clone());
        }
    }

    if team1.len() != team_size || team2.len() != team_size {
        return Err(BalanceFailure::InsufficientPlayers {
            available: team1.len() + team2.len(),
            capacity,
        });
    }

    let team1_elos: Vec<i32> = team1
        .iter()
        .map(|id| elo_of.get(id.as_str()).copied().unwrap_or(0))
        .collect();
    let team2_elos: Vec<i32> = team2
        .iter()
        .map(|id| elo_of.get(id.as_str()).copied().unwrap_or(0))
        .collect();
    let team1_avg_elo = rounded_mean(&team1_elos);
    let team2_avg_elo = rounded_mean(&team2_elos);

    let used_players: HashSet<PlayerId> = team1.iter().chain(team2.iter()).cloned().collect();
    debug!(
        "Balanced {} players into {} vs {} (avg elo {} vs {})",
        used_players.len(),
        team1.len(),
        team2.len(),
        team1_avg_elo,
        team2_avg_elo
    );

    Ok(TeamAssignment {
        team1,
        team2,
        used_players,
        team1_avg_elo,
        team2_avg_elo,
        elo_difference: (team1_avg_elo - team2_avg_elo).abs(),
    })
}
