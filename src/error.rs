//! Typed error taxonomy for the game service.
//!
//! Every error is detected synchronously and is non-retryable: the caller
//! made a logical mistake and must change the request. Idempotent
//! short-circuits (already committed, phase already advanced) are success
//! results with a flag, never errors.

use crate::game::GameStatus;
use crate::grid::Coord;
use crate::ships::ShipKind;
use derive_more::{Display, Error, From};

/// Reasons a fleet fails placement validation, one category per check.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum PlacementError {
    /// A required ship class is absent.
    #[display("missing required ship: {kind}")]
    MissingShip {
        /// The absent class.
        #[error(not(source))]
        kind: ShipKind,
    },
    /// A ship class appears more than once.
    #[display("duplicate ship: {kind}")]
    DuplicateShip {
        /// The duplicated class.
        #[error(not(source))]
        kind: ShipKind,
    },
    /// A ship's recorded length does not match its canonical length.
    #[display("wrong length for {kind}: expected {expected}, got {actual}")]
    WrongLength {
        /// The offending class.
        kind: ShipKind,
        /// Canonical length.
        expected: u8,
        /// Length supplied.
        actual: u8,
    },
    /// A ship extends past the edge of the board.
    #[display("{kind} extends out of bounds")]
    OutOfBounds {
        /// The offending class.
        #[error(not(source))]
        kind: ShipKind,
    },
    /// Two ships share at least one cell.
    #[display("{first} overlaps {second}")]
    Overlap {
        /// First ship of the overlapping pair.
        first: ShipKind,
        /// Second ship of the overlapping pair.
        second: ShipKind,
    },
    /// Random fleet generation ran out of attempts. Practically
    /// unreachable on a 10×10 board with 17 ship cells.
    #[display("random placement exhausted its attempt budget")]
    GenerationExhausted,
}

/// Errors returned by game service commands.
#[derive(Debug, Clone, PartialEq, Display, Error, From)]
pub enum GameError {
    /// No game exists with the given id.
    #[display("game not found: {id}")]
    NotFound {
        /// The unknown game id.
        #[error(not(source))]
        id: String,
    },
    /// The command is not legal in the game's current phase.
    #[display("command requires phase {expected}, game is in {actual}")]
    Phase {
        /// Phase the command requires.
        expected: GameStatus,
        /// Phase the game is actually in.
        actual: GameStatus,
    },
    /// The acting player does not hold the current turn.
    #[display("not your turn")]
    NotYourTurn,
    /// The target coordinate is off the board.
    #[display("coordinate {coord} is out of bounds")]
    OutOfBounds {
        /// The offending coordinate.
        #[error(not(source))]
        coord: Coord,
    },
    /// The target coordinate was already fired at on this board.
    #[display("already fired at {coord}")]
    DuplicateShot {
        /// The repeated coordinate.
        #[error(not(source))]
        coord: Coord,
    },
    /// The committed fleet failed validation.
    #[display("invalid placement: {_0}")]
    #[from]
    InvalidPlacement(PlacementError),
    /// A third distinct player tried to join.
    #[display("game already has two players")]
    GameFull,
    /// The player is not part of the game.
    #[display("player {player_id} is not in this game")]
    UnknownPlayer {
        /// The unknown player id.
        #[error(not(source))]
        player_id: String,
    },
    /// A phase-advancing command arrived before its timer expired.
    #[display("the {phase} timer has not expired yet")]
    TimerNotExpired {
        /// Phase whose timer is still running.
        #[error(not(source))]
        phase: GameStatus,
    },
    /// The command applies only to human-vs-human games.
    #[display("command is only available in pvp games")]
    PvpOnly,
}
