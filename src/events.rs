//! Append-only per-game event log types.
//!
//! Events carry a per-game sequence number that is strictly increasing
//! and gapless; the log is never edited or deleted. Hover signals are
//! ephemeral and deliberately absent from this log.

use crate::game::{GameId, PlayerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kinds of domain event a game can append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// A game record was created.
    GameCreated,
    /// A player joined the lobby.
    PlayerJoined,
    /// A player toggled their ready flag.
    PlayerReady,
    /// All players readied up; the countdown began.
    CountdownStarted,
    /// The countdown expired; placement began.
    PlacementStarted,
    /// A player explicitly committed a fleet.
    PlacementCommitted,
    /// The placement timer force-committed a straggler's fleet.
    PlacementAutoCommitted,
    /// All fleets committed; battle began with a random first turn.
    BattleStarted,
    /// A shot was fired.
    ShotFired,
    /// The shot's outcome was resolved.
    ShotResolved,
    /// The turn passed to the other player.
    TurnAdvanced,
    /// A turn expired without a shot.
    TurnTimeout,
    /// The game reached its terminal state.
    GameFinished,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::GameCreated => "GAME_CREATED",
            EventKind::PlayerJoined => "PLAYER_JOINED",
            EventKind::PlayerReady => "PLAYER_READY",
            EventKind::CountdownStarted => "COUNTDOWN_STARTED",
            EventKind::PlacementStarted => "PLACEMENT_STARTED",
            EventKind::PlacementCommitted => "PLACEMENT_COMMITTED",
            EventKind::PlacementAutoCommitted => "PLACEMENT_AUTO_COMMITTED",
            EventKind::BattleStarted => "BATTLE_STARTED",
            EventKind::ShotFired => "SHOT_FIRED",
            EventKind::ShotResolved => "SHOT_RESOLVED",
            EventKind::TurnAdvanced => "TURN_ADVANCED",
            EventKind::TurnTimeout => "TURN_TIMEOUT",
            EventKind::GameFinished => "GAME_FINISHED",
        };
        write!(f, "{}", name)
    }
}

/// One entry in a game's event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Game this event belongs to.
    pub game_id: GameId,
    /// Per-game sequence number, starting at 1, gapless.
    pub seq: u64,
    /// Acting player; absent for system-generated events.
    pub actor_player_id: Option<PlayerId>,
    /// Event kind.
    pub kind: EventKind,
    /// Kind-specific payload for audit and UI replay.
    pub payload: serde_json::Value,
    /// When the event was appended.
    pub created_at: DateTime<Utc>,
}

/// A page of events from a cursor-paginated read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPage {
    /// Events in ascending `seq` order.
    pub events: Vec<GameEvent>,
    /// Cursor for the next page; `None` when the log is exhausted.
    pub next_cursor: Option<u64>,
}
