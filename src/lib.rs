//! Broadside - server-authoritative naval combat engine
//!
//! The engine drives a two-player, turn-based naval combat game (human
//! vs. human or human vs. bot) through a finite-state lifecycle with an
//! append-only event log per game.
//!
//! # Architecture
//!
//! - **Service**: the command surface and sole writer of game records
//! - **Store**: atomic read-modify-write record store plus event log
//! - **Placement**: fleet validation and deterministic collision resolution
//! - **Board**: pure shot resolution and fleet-destruction detection
//! - **Strategist**: the bot's hunt/search targeting AI
//!
//! # Example
//!
//! ```no_run
//! use broadside::{GameConfig, GameMode, GameService};
//!
//! # async fn example() -> Result<(), broadside::GameError> {
//! let service = GameService::new(GameConfig::default());
//! let game = service.create_game("player-1", GameMode::Pve)?;
//! let view = service.get_game(&game.id, "player-1")?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod board;
mod bot;
mod clock;
mod config;
mod error;
mod events;
mod game;
mod grid;
mod placement;
mod service;
mod ships;
mod store;
mod strategist;

// Crate-level exports - geometry
pub use grid::{BOARD_SIZE, Coord, Orientation};

// Crate-level exports - ships and boards
pub use board::{Board, Shot, ShotResult, all_ships_sunk, resolve_shot};
pub use ships::{Ship, ShipKind};

// Crate-level exports - placement rules
pub use placement::{
    generate_random_placement, move_and_resolve, resolve_placement, rotate_and_resolve,
    validate_placement,
};

// Crate-level exports - strategist AI
pub use strategist::{Heatmap, heatmap, hunt_candidates, recommend_target, remaining_lengths};

// Crate-level exports - game aggregate
pub use game::{
    GameId, GameMode, GameRecord, GameStatus, HoverState, PlayerId, PlayerState, WinReason,
};

// Crate-level exports - event log
pub use events::{EventKind, EventPage, GameEvent};

// Crate-level exports - store
pub use store::{EventWriter, GameStore};

// Crate-level exports - service commands
pub use service::{
    AdvanceOutcome, CommitOutcome, GameService, GameSummary, GameView, JoinOutcome, ReadyOutcome,
    ShotOutcome, TurnPollOutcome,
};

// Crate-level exports - configuration and time
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, GameConfig};

// Crate-level exports - errors
pub use error::{GameError, PlacementError};
