//! Game state machine.
//!
//! Every phase transition is an explicit method on [`GameEngine`] taking
//! the current [`Room`] and returning the next one; nothing else mutates
//! `Room::phase`. Each mutating operation persists through the Room Store
//! as its final step. The engine computes state only — broadcasting and
//! timer scheduling belong to the handlers and the scheduler.

pub mod roles;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::catalog::{WordCatalog, pick_word};
use crate::error::GameError;
use crate::room::model::{GameResult, GameState, MIN_PLAYERS, Room, RoomPhase};
use crate::room::store::RoomStore;

use roles::{assign_roles, pick_starting_player};

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, GameError>;

/// Orchestrates phase transitions against the Room Store and the word
/// catalog.
///
/// Holds its collaborators behind trait objects; constructed once at
/// startup and shared across handlers and the scheduler.
pub struct GameEngine {
    store: Arc<dyn RoomStore>,
    catalog: Arc<dyn WordCatalog>,
    sample_size: usize,
}

impl GameEngine {
    /// Creates an engine over the given store and catalog.
    #[must_use]
    pub fn new(store: Arc<dyn RoomStore>, catalog: Arc<dyn WordCatalog>, sample_size: usize) -> Self {
        Self {
            store,
            catalog,
            sample_size,
        }
    }

    /// Starts a round: deals roles, selects the word, enters `RoleReveal`.
    ///
    /// The word is drawn as a small candidate batch with the previous
    /// round's word excluded case-insensitively (falling back to the first
    /// candidate if every one matches). The impostor pool excludes the
    /// previous starting player when avoidable; detective and joker, if
    /// enabled, are picked after the impostor from the players left over.
    ///
    /// # Errors
    ///
    /// [`GameError::NotEnoughPlayers`] below the 3-player minimum,
    /// [`GameError::NoWordAvailable`] when the catalog has nothing for the
    /// room's categories, plus store/catalog failures.
    pub async fn start_game(&self, mut room: Room, language: &str) -> Result<Room> {
        let have = room.player_count();
        if have < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers { have });
        }

        let candidates = self
            .catalog
            .sample(&room.settings.category_ids, language, self.sample_size)
            .await?;
        let word = pick_word(&candidates, room.last_word.as_deref())
            .ok_or(GameError::NoWordAvailable)?
            .word_value
            .clone();

        // ThreadRng must not live across an await point; keep it scoped.
        let (assignment, starting_player_id) = {
            let mut rng = rand::thread_rng();
            let assignment = assign_roles(
                &mut rng,
                &mut room.players,
                room.last_starting_player_id.as_deref(),
                room.settings.detective_enabled,
                room.settings.joker_enabled,
            );
            let starting = pick_starting_player(
                &mut rng,
                &room.players,
                room.last_starting_player_id.as_deref(),
            );
            (assignment, starting)
        };

        for player in room.players.values_mut() {
            if player.id == assignment.impostor_id {
                player.word = None;
            } else {
                player.word = Some(word.clone());
            }
        }

        room.phase = RoomPhase::RoleReveal;
        room.round_number += 1;
        room.last_word = Some(word.clone());
        room.last_starting_player_id = Some(starting_player_id.clone());
        room.game_state = Some(GameState::new(
            word,
            assignment.impostor_id.clone(),
            assignment.detective_id,
            assignment.joker_id,
            starting_player_id,
        ));

        self.store.save(&room).await?;
        info!(
            room_id = %room.id,
            round = room.round_number,
            impostor = %assignment.impostor_id,
            "round started"
        );
        Ok(room)
    }

    /// Moves `RoleReveal → Playing` and resets the phase clock.
    ///
    /// The scheduler guards that the room is still in `RoleReveal`; no
    /// further precondition is checked here.
    ///
    /// # Errors
    ///
    /// Store failures only.
    pub async fn transition_to_playing(&self, mut room: Room) -> Result<Room> {
        room.phase = RoomPhase::Playing;
        if let Some(state) = room.game_state.as_mut() {
            state.phase_start_time = Utc::now();
        }
        self.store.save(&room).await?;
        info!(room_id = %room.id, "discussion started");
        Ok(room)
    }

    /// Moves `Playing → Voting` when discussion time runs out.
    ///
    /// The timeout counterpart of the majority path in
    /// [`Self::request_voting`]; the scheduler guards that the room is
    /// still in `Playing`.
    ///
    /// # Errors
    ///
    /// Store failures only.
    pub async fn transition_to_voting(&self, mut room: Room) -> Result<Room> {
        room.phase = RoomPhase::Voting;
        if let Some(state) = room.game_state.as_mut() {
            state.phase_start_time = Utc::now();
        }
        self.store.save(&room).await?;
        info!(room_id = %room.id, "voting started by timeout");
        Ok(room)
    }

    /// Records that a player wants to vote; starts voting on majority.
    ///
    /// The majority threshold is `floor(n / 2) + 1`. Returns the updated
    /// room and whether the voting phase started.
    ///
    /// # Errors
    ///
    /// [`GameError::WrongPhase`] outside `Playing`,
    /// [`GameError::PlayerNotFound`] for an unknown player, plus store
    /// failures. The room is unchanged on error.
    pub async fn request_voting(&self, mut room: Room, player_id: &str) -> Result<(Room, bool)> {
        if room.phase != RoomPhase::Playing {
            return Err(GameError::WrongPhase {
                expected: RoomPhase::Playing,
                actual: room.phase,
            });
        }
        let Some(player) = room.players.get_mut(player_id) else {
            return Err(GameError::PlayerNotFound);
        };
        player.wants_to_vote = true;

        let total = room.player_count();
        let wanting = room.players.values().filter(|p| p.wants_to_vote).count();
        let threshold = total / 2 + 1;
        let started = wanting >= threshold;

        if started {
            room.phase = RoomPhase::Voting;
            if let Some(state) = room.game_state.as_mut() {
                state.phase_start_time = Utc::now();
            }
            info!(room_id = %room.id, wanting, threshold, "voting started by majority");
        }

        self.store.save(&room).await?;
        Ok((room, started))
    }

    /// Records one vote. Returns the updated room and whether every player
    /// has now voted.
    ///
    /// `votes_submitted` is recomputed from the player records rather than
    /// incremented, so a revote never double-counts.
    ///
    /// # Errors
    ///
    /// [`GameError::WrongPhase`] outside `Voting`,
    /// [`GameError::PlayerNotFound`] when either id is unknown,
    /// [`GameError::SelfVote`] for a self-vote, plus store failures. The
    /// room is unchanged on error.
    pub async fn submit_vote(
        &self,
        mut room: Room,
        voter_id: &str,
        voted_for_id: &str,
    ) -> Result<(Room, bool)> {
        if room.phase != RoomPhase::Voting {
            return Err(GameError::WrongPhase {
                expected: RoomPhase::Voting,
                actual: room.phase,
            });
        }
        if !room.players.contains_key(voter_id) || !room.players.contains_key(voted_for_id) {
            return Err(GameError::PlayerNotFound);
        }
        if voter_id == voted_for_id {
            return Err(GameError::SelfVote);
        }

        if let Some(voter) = room.players.get_mut(voter_id) {
            voter.vote = Some(voted_for_id.to_string());
        }

        let submitted = room.players.values().filter(|p| p.vote.is_some()).count();
        if let Some(state) = room.game_state.as_mut() {
            state.votes_submitted = submitted;
        }

        self.store.save(&room).await?;
        let all_voted = submitted >= room.player_count();
        Ok((room, all_voted))
    }

    /// Tallies votes, decides the round, and enters `Results`.
    ///
    /// No-op (room returned unchanged, nothing persisted) unless the room
    /// is in `Voting` — callers race against each other here and the first
    /// one through wins. With zero votes the impostor wins by default and
    /// `most_voted_id` stays `None`; ties at the maximum tally break by
    /// ascending case-insensitive username.
    ///
    /// # Errors
    ///
    /// Store failures only.
    pub async fn calculate_results(&self, mut room: Room) -> Result<Room> {
        if room.phase != RoomPhase::Voting {
            return Ok(room);
        }

        let mut tally: HashMap<&str, usize> = HashMap::new();
        for player in room.players.values() {
            if let Some(target) = player.vote.as_deref() {
                // Votes for players that already left are dropped.
                if room.players.contains_key(target) {
                    *tally.entry(target).or_insert(0) += 1;
                }
            }
        }

        let (most_voted_id, result) = if tally.is_empty() {
            (None, GameResult::ImpostorWins)
        } else {
            let max_votes = *tally.values().max().expect("tally is non-empty");
            let mut tied: Vec<&str> = tally
                .iter()
                .filter(|(_, count)| **count == max_votes)
                .map(|(id, _)| *id)
                .collect();
            tied.sort_by(|a, b| {
                let ua = room.players[*a].username.to_lowercase();
                let ub = room.players[*b].username.to_lowercase();
                ua.cmp(&ub).then_with(|| a.cmp(b))
            });
            let most_voted = tied[0].to_string();

            let impostor_caught = room
                .game_state
                .as_ref()
                .is_some_and(|state| state.impostor_id == most_voted);
            let result = if impostor_caught {
                GameResult::CiviliansWin
            } else {
                GameResult::ImpostorWins
            };
            (Some(most_voted), result)
        };

        if let Some(state) = room.game_state.as_mut() {
            state.most_voted_id = most_voted_id;
            state.result = Some(result);
            state.phase_start_time = Utc::now();
        } else {
            warn!(room_id = %room.id, "voting phase without game state");
        }
        room.phase = RoomPhase::Results;

        self.store.save(&room).await?;
        info!(room_id = %room.id, ?result, "round decided");
        Ok(room)
    }

    /// Clears all round state and returns the room to the lobby.
    ///
    /// # Errors
    ///
    /// Store failures only.
    pub async fn return_to_lobby(&self, mut room: Room) -> Result<Room> {
        for player in room.players.values_mut() {
            player.reset_round_state();
        }
        room.game_state = None;
        room.phase = RoomPhase::Waiting;

        self.store.save(&room).await?;
        info!(room_id = %room.id, "returned to lobby");
        Ok(room)
    }
}

// ============================================================================
// Tests
// ============================================================================
