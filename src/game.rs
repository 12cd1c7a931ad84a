//! The mutable per-match aggregate: players, boards, phase, and timers.
//!
//! A [`GameRecord`] is created in `Lobby` (or directly in `Countdown` for
//! bot matches), mutated exclusively by the game service's commands, and
//! becomes terminal at `Finished`. Finished records are retained for
//! history, never deleted.

use crate::board::Board;
use crate::grid::Coord;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a game.
pub type GameId = String;

/// Unique identifier for a player.
pub type PlayerId = String;

/// Lifecycle phase of a game.
///
/// `Lobby → Countdown → Placement → Battle → Finished`; `Finished` is
/// terminal. Commands are dispatched against this enum, so an illegal
/// `(phase, command)` pair is rejected before any state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Waiting for players to join and ready up.
    Lobby,
    /// Fixed pre-placement countdown is running.
    Countdown,
    /// Players are placing fleets.
    Placement,
    /// Turns alternate until a fleet is destroyed or a player forfeits.
    Battle,
    /// Terminal: a winner (or abandonment) has been recorded.
    Finished,
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GameStatus::Lobby => "lobby",
            GameStatus::Countdown => "countdown",
            GameStatus::Placement => "placement",
            GameStatus::Battle => "battle",
            GameStatus::Finished => "finished",
        };
        write!(f, "{}", name)
    }
}

/// Whether the opponent is another human or the built-in bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Human vs. human.
    Pvp,
    /// Human vs. bot.
    Pve,
}

/// Why a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinReason {
    /// The loser's fleet was fully destroyed.
    Elimination,
    /// The loser forfeited voluntarily.
    Forfeit,
    /// The loser exceeded the turn-timeout limit.
    TimeoutForfeit,
}

/// A participant in a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Player id.
    pub id: PlayerId,
    /// Whether the player readied up in the lobby.
    pub ready: bool,
    /// Whether the player explicitly committed a fleet.
    pub placement_committed: bool,
    /// Consecutive expired turns.
    pub timeout_count: u32,
    /// When the player joined.
    pub joined_at: DateTime<Utc>,
    /// Last command this player issued.
    pub last_seen_at: DateTime<Utc>,
    /// Whether this seat is held by the built-in bot.
    pub is_bot: bool,
}

impl PlayerState {
    /// Creates a human player joining now.
    pub fn human(id: PlayerId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            ready: false,
            placement_committed: false,
            timeout_count: 0,
            joined_at: now,
            last_seen_at: now,
            is_bot: false,
        }
    }

    /// Creates the bot seat: always ready, fleet already committed.
    pub fn bot(id: PlayerId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            ready: true,
            placement_committed: true,
            timeout_count: 0,
            joined_at: now,
            last_seen_at: now,
            is_bot: true,
        }
    }
}

/// Current turn-holder's published cursor position, shown to the opponent
/// while fresh. Ephemeral: never written to the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoverState {
    /// Player whose cursor this is.
    pub player_id: PlayerId,
    /// Hovered cell.
    pub coord: Coord,
    /// When the hover was last published.
    pub updated_at: DateTime<Utc>,
}

/// The single mutable aggregate for one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Game id.
    pub id: GameId,
    /// Current lifecycle phase.
    pub status: GameStatus,
    /// Opponent kind.
    pub mode: GameMode,
    /// Joined players, at most two, in join order.
    pub players: Vec<PlayerState>,
    /// One board per joined player.
    pub boards: HashMap<PlayerId, Board>,
    /// When the countdown began.
    pub countdown_started_at: Option<DateTime<Utc>>,
    /// Countdown length in milliseconds.
    pub countdown_duration_ms: i64,
    /// When the placement phase began.
    pub placement_started_at: Option<DateTime<Utc>>,
    /// Placement window in milliseconds.
    pub placement_duration_ms: i64,
    /// Holder of the current battle turn.
    pub current_turn_player_id: Option<PlayerId>,
    /// When the current turn began.
    pub turn_started_at: Option<DateTime<Utc>>,
    /// Turn length in milliseconds.
    pub turn_duration_ms: i64,
    /// Winner, once finished.
    pub winner_player_id: Option<PlayerId>,
    /// Why the game ended, once finished.
    pub win_reason: Option<WinReason>,
    /// Live hover signal, battle phase only.
    pub hover: Option<HoverState>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

impl GameRecord {
    /// Creates an empty record in the given starting phase.
    pub fn new(id: GameId, mode: GameMode, status: GameStatus, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status,
            mode,
            players: Vec::new(),
            boards: HashMap::new(),
            countdown_started_at: None,
            countdown_duration_ms: 0,
            placement_started_at: None,
            placement_duration_ms: 0,
            current_turn_player_id: None,
            turn_started_at: None,
            turn_duration_ms: 0,
            winner_player_id: None,
            win_reason: None,
            hover: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Looks up a player by id.
    pub fn player(&self, id: &str) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Looks up a player by id, mutably.
    pub fn player_mut(&mut self, id: &str) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// The id of the other player, if one has joined.
    pub fn opponent_id(&self, id: &str) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|p| p.id != id)
            .map(|p| p.id.clone())
    }

    /// The bot seat's id, for pve games.
    pub fn bot_id(&self) -> Option<PlayerId> {
        self.players.iter().find(|p| p.is_bot).map(|p| p.id.clone())
    }

    /// Whether both seats are taken.
    pub fn is_full(&self) -> bool {
        self.players.len() >= 2
    }

    /// Whether every joined player has readied up.
    pub fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.ready)
    }

    /// Whether every joined player has committed a fleet.
    pub fn all_committed(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.placement_committed)
    }

    /// Whether the countdown deadline has passed.
    pub fn countdown_expired(&self, now: DateTime<Utc>) -> bool {
        match self.countdown_started_at {
            Some(start) => now >= start + Duration::milliseconds(self.countdown_duration_ms),
            None => false,
        }
    }

    /// Whether the placement deadline has passed.
    pub fn placement_expired(&self, now: DateTime<Utc>) -> bool {
        match self.placement_started_at {
            Some(start) => now >= start + Duration::milliseconds(self.placement_duration_ms),
            None => false,
        }
    }

    /// Whether the current turn's deadline has passed.
    pub fn turn_expired(&self, now: DateTime<Utc>) -> bool {
        match self.turn_started_at {
            Some(start) => now >= start + Duration::milliseconds(self.turn_duration_ms),
            None => false,
        }
    }
}
