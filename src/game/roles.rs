//! Role dealing and starting-player selection for round start.
//!
//! Pure functions over the player map; the async orchestration lives in
//! [`super::GameEngine`]. Randomness comes in through the caller so tests
//! can seed it.

use std::collections::HashMap;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::room::model::{Player, PlayerRole};

/// The ids picked during role assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    /// The one impostor for this round.
    pub impostor_id: String,
    /// Detective, when enabled and a player was left to pick.
    pub detective_id: Option<String>,
    /// Joker, when enabled and a player was left to pick.
    pub joker_id: Option<String>,
}

/// Deals roles to every player and resets their per-round fields.
///
/// Pick order is impostor, then detective, then joker; each pick draws
/// uniformly from the players not yet picked. `exclude_impostor_id` is
/// removed from the impostor pool only when the pool stays non-empty
/// without it, so the same player is never impostor twice in a row when
/// that is avoidable. Unpicked players become civilians.
///
/// The caller guarantees at least [`crate::room::model::MIN_PLAYERS`]
/// players.
pub fn assign_roles<R: Rng>(
    rng: &mut R,
    players: &mut HashMap<String, Player>,
    exclude_impostor_id: Option<&str>,
    detective_enabled: bool,
    joker_enabled: bool,
) -> RoleAssignment {
    // Sorted for a deterministic pool order under a seeded rng.
    let mut pool: Vec<String> = players.keys().cloned().collect();
    pool.sort();

    let mut impostor_pool: Vec<&String> = match exclude_impostor_id {
        Some(excluded) if pool.len() > 1 => pool.iter().filter(|id| *id != excluded).collect(),
        _ => pool.iter().collect(),
    };
    if impostor_pool.is_empty() {
        impostor_pool = pool.iter().collect();
    }

    let impostor_id = (*impostor_pool
        .choose(rng)
        .expect("impostor pool is never empty"))
    .clone();

    let mut remaining: Vec<&String> = pool.iter().filter(|id| **id != impostor_id).collect();

    let detective_id = if detective_enabled && !remaining.is_empty() {
        let picked = (*remaining.choose(rng).expect("checked non-empty")).clone();
        remaining.retain(|id| **id != picked);
        Some(picked)
    } else {
        None
    };

    let joker_id = if joker_enabled && !remaining.is_empty() {
        let picked = (*remaining.choose(rng).expect("checked non-empty")).clone();
        remaining.retain(|id| **id != picked);
        Some(picked)
    } else {
        None
    };

    for (id, player) in players.iter_mut() {
        player.role = Some(if *id == impostor_id {
            PlayerRole::Impostor
        } else if detective_id.as_deref() == Some(id.as_str()) {
            PlayerRole::Detective
        } else if joker_id.as_deref() == Some(id.as_str()) {
            PlayerRole::Joker
        } else {
            PlayerRole::Civilian
        });
        player.vote = None;
        player.wants_to_vote = false;
        player.is_ready = false;
    }

    RoleAssignment {
        impostor_id,
        detective_id,
        joker_id,
    }
}

/// Picks the player who opens the discussion.
///
/// Draws uniformly from players other than `exclude`, falling back to all
/// players when that set is empty.
pub fn pick_starting_player<R: Rng>(
    rng: &mut R,
    players: &HashMap<String, Player>,
    exclude: Option<&str>,
) -> String {
    let mut ids: Vec<&String> = players.keys().collect();
    ids.sort();

    let eligible: Vec<&&String> = ids
        .iter()
        .filter(|id| Some(id.as_str()) != exclude)
        .collect();

    if eligible.is_empty() {
        (*ids.choose(rng).expect("room is never empty")).clone()
    } else {
        (**eligible.choose(rng).expect("checked non-empty")).clone()
    }
}

// ============================================================================
// Tests
// ============================================================================
