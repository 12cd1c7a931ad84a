//! The game service: sole writer of game records.
//!
//! Every command loads the record inside a store transaction, checks its
//! phase guard and turn ownership there, applies the pure-function rules
//! (placement, shot resolution, strategist), and appends events — all
//! under one lock, so racing commands serialize and the loser re-reads
//! the already-advanced state. Guard violations are synchronous, typed,
//! and non-retryable; idempotent short-circuits are success results with
//! a flag.

use crate::board::{Board, Shot, ShotResult, all_ships_sunk, resolve_shot};
use crate::clock::{Clock, SystemClock};
use crate::config::GameConfig;
use crate::error::GameError;
use crate::events::{EventKind, EventPage};
use crate::game::{
    GameId, GameMode, GameRecord, GameStatus, HoverState, PlayerId, PlayerState, WinReason,
};
use crate::grid::Coord;
use crate::placement::{generate_random_placement, validate_placement};
use crate::ships::Ship;
use crate::store::{EventWriter, GameStore};
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

/// Result of a join command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOutcome {
    /// The player was already in the game; only `last_seen_at` moved.
    pub rejoined: bool,
}

/// Result of a ready toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyOutcome {
    /// All players were ready, so the countdown began.
    pub countdown_started: bool,
}

/// Result of a phase-advancing poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceOutcome {
    /// The phase advanced now; `false` means it had already advanced.
    pub advanced: bool,
}

/// Result of a placement commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOutcome {
    /// The player had already committed; nothing changed.
    pub already_committed: bool,
    /// This commit completed the fleet set and started the battle.
    pub battle_started: bool,
}

/// Result of a resolved shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotOutcome {
    /// What the shot struck.
    pub result: ShotResult,
    /// The defender's fleet is destroyed and the game is finished.
    pub game_over: bool,
}

/// Result of a turn-expiry poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnPollOutcome {
    /// The expired turn was advanced (or the game forfeited); `false`
    /// means the poll was a no-op with no side effects.
    pub advanced: bool,
    /// The expiry reached the timeout limit and forfeited the game.
    pub forfeited: bool,
}

/// A player-scoped view of a game, safe to send to that player.
///
/// The requesting player's own board is complete; every other board has
/// its ships stripped. Leaking enemy ship positions would break the
/// game, so redaction happens here and nowhere later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameView {
    /// Game id.
    pub id: GameId,
    /// Current phase.
    pub status: GameStatus,
    /// Opponent kind.
    pub mode: GameMode,
    /// Joined players.
    pub players: Vec<PlayerState>,
    /// Boards keyed by player id, redacted for everyone but the requester.
    pub boards: HashMap<PlayerId, Board>,
    /// Holder of the current battle turn.
    pub current_turn_player_id: Option<PlayerId>,
    /// When the current turn began.
    pub turn_started_at: Option<DateTime<Utc>>,
    /// Turn length in milliseconds.
    pub turn_duration_ms: i64,
    /// When the countdown began.
    pub countdown_started_at: Option<DateTime<Utc>>,
    /// Countdown length in milliseconds.
    pub countdown_duration_ms: i64,
    /// When placement began.
    pub placement_started_at: Option<DateTime<Utc>>,
    /// Placement window in milliseconds.
    pub placement_duration_ms: i64,
    /// Winner, once finished.
    pub winner_player_id: Option<PlayerId>,
    /// Why the game ended, once finished.
    pub win_reason: Option<WinReason>,
    /// The opponent's fresh hover, when one is visible to the requester.
    pub enemy_hover_coord: Option<Coord>,
}

/// A lobby-browsing summary of one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    /// Game id.
    pub id: GameId,
    /// Current phase.
    pub status: GameStatus,
    /// Opponent kind.
    pub mode: GameMode,
    /// Number of joined players.
    pub player_count: usize,
    /// When the game was created.
    pub created_at: DateTime<Utc>,
}

/// Turn handoff details a command reports back so the service can
/// schedule a bot move outside the store lock.
#[derive(Debug, Clone)]
pub(crate) struct TurnHandoff {
    pub(crate) to_bot: bool,
    pub(crate) turn_started_at: DateTime<Utc>,
}

/// Cloneable handle to the game engine. All clones share one store,
/// clock, and RNG.
#[derive(Debug, Clone)]
pub struct GameService {
    store: GameStore,
    config: Arc<GameConfig>,
    clock: Arc<dyn Clock>,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl GameService {
    /// Creates a service with the system clock.
    #[instrument(skip(config))]
    pub fn new(config: GameConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a service with an injected clock (tests use
    /// [`ManualClock`](crate::clock::ManualClock)).
    pub fn with_clock(config: GameConfig, clock: Arc<dyn Clock>) -> Self {
        let rng = match config.rng_seed() {
            Some(seed) => ChaCha8Rng::seed_from_u64(*seed),
            None => ChaCha8Rng::from_entropy(),
        };
        info!(seeded = config.rng_seed().is_some(), "Creating game service");
        Self {
            store: GameStore::new(),
            config: Arc::new(config),
            clock,
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// The underlying store (the persistence collaborator's in-process
    /// implementation). Exposed for embedding and for tests.
    pub fn store(&self) -> &GameStore {
        &self.store
    }

    /// The service configuration.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut rng = self.rng.lock().expect("rng lock poisoned");
        format!("{}-{:016x}", prefix, rng.next_u64())
    }

    /// Creates a game. Pvp games start in the lobby; pve games start in
    /// countdown with the bot seated, readied, and holding a random
    /// committed fleet.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidPlacement`] only if random fleet
    /// generation exhausts its budget, which does not happen in practice.
    #[instrument(skip(self))]
    pub fn create_game(&self, owner_id: &str, mode: GameMode) -> Result<GameRecord, GameError> {
        let now = self.now();
        let game_id = self.next_id("game");

        let owner_fleet = {
            let mut rng = self.rng.lock().expect("rng lock poisoned");
            generate_random_placement(&mut *rng)?
        };

        let status = match mode {
            GameMode::Pvp => GameStatus::Lobby,
            GameMode::Pve => GameStatus::Countdown,
        };
        let mut record = GameRecord::new(game_id.clone(), mode, status, now);
        record
            .players
            .push(PlayerState::human(owner_id.to_string(), now));
        record
            .boards
            .insert(owner_id.to_string(), Board::new(owner_fleet));

        if mode == GameMode::Pve {
            let bot_id = self.next_id("bot");
            let bot_fleet = {
                let mut rng = self.rng.lock().expect("rng lock poisoned");
                generate_random_placement(&mut *rng)?
            };
            record.players.push(PlayerState::bot(bot_id.clone(), now));
            record.boards.insert(bot_id, Board::new(bot_fleet));
            record.countdown_started_at = Some(now);
            record.countdown_duration_ms = *self.config.countdown_ms();
        }

        self.store.create(record.clone(), now, |events| {
            events.append(
                Some(owner_id.to_string()),
                EventKind::GameCreated,
                json!({ "mode": mode, "owner_player_id": owner_id }),
            );
            if mode == GameMode::Pve {
                events.append(None, EventKind::CountdownStarted, json!({}));
            }
        });

        info!(game_id = %game_id, ?mode, "Game created");
        Ok(record)
    }

    /// Joins a player to a lobby. Re-joining is idempotent and only
    /// refreshes `last_seen_at`. The joiner receives a random starter
    /// fleet they can rearrange until committing.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Phase`] outside the lobby and
    /// [`GameError::GameFull`] for a third distinct player.
    #[instrument(skip(self))]
    pub fn join_game(&self, game_id: &str, player_id: &str) -> Result<JoinOutcome, GameError> {
        let now = self.now();
        let starter_fleet = {
            let mut rng = self.rng.lock().expect("rng lock poisoned");
            generate_random_placement(&mut *rng)?
        };

        self.store.update(game_id, now, |record, events| {
            if let Some(player) = record.player_mut(player_id) {
                player.last_seen_at = now;
                debug!(player_id, "Player re-joined");
                return Ok(JoinOutcome { rejoined: true });
            }
            if record.status != GameStatus::Lobby {
                return Err(GameError::Phase {
                    expected: GameStatus::Lobby,
                    actual: record.status,
                });
            }
            if record.is_full() {
                warn!(player_id, "Join rejected, game full");
                return Err(GameError::GameFull);
            }

            record
                .players
                .push(PlayerState::human(player_id.to_string(), now));
            record
                .boards
                .insert(player_id.to_string(), Board::new(starter_fleet));
            events.append(
                Some(player_id.to_string()),
                EventKind::PlayerJoined,
                json!({ "player_id": player_id }),
            );
            info!(player_id, "Player joined");
            Ok(JoinOutcome { rejoined: false })
        })
    }

    /// Sets a player's ready flag. When the game is full and everyone is
    /// ready the countdown starts.
    #[instrument(skip(self))]
    pub fn set_ready(
        &self,
        game_id: &str,
        player_id: &str,
        ready: bool,
    ) -> Result<ReadyOutcome, GameError> {
        let now = self.now();
        let countdown_ms = *self.config.countdown_ms();

        self.store.update(game_id, now, |record, events| {
            if record.status != GameStatus::Lobby {
                return Err(GameError::Phase {
                    expected: GameStatus::Lobby,
                    actual: record.status,
                });
            }
            let player = record.player_mut(player_id).ok_or(GameError::UnknownPlayer {
                player_id: player_id.to_string(),
            })?;
            player.ready = ready;
            player.last_seen_at = now;
            events.append(
                Some(player_id.to_string()),
                EventKind::PlayerReady,
                json!({ "player_id": player_id, "ready": ready }),
            );

            if record.is_full() && record.all_ready() {
                record.status = GameStatus::Countdown;
                record.countdown_started_at = Some(now);
                record.countdown_duration_ms = countdown_ms;
                events.append(None, EventKind::CountdownStarted, json!({}));
                info!("All players ready, countdown started");
                return Ok(ReadyOutcome {
                    countdown_started: true,
                });
            }
            Ok(ReadyOutcome {
                countdown_started: false,
            })
        })
    }

    /// Advances an expired countdown into the placement phase.
    ///
    /// Re-entrant: once the game has moved past the countdown this
    /// returns success with `advanced: false` and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::TimerNotExpired`] while the countdown is
    /// still running and [`GameError::Phase`] in the lobby.
    #[instrument(skip(self))]
    pub fn advance_from_countdown(&self, game_id: &str) -> Result<AdvanceOutcome, GameError> {
        let now = self.now();
        let placement_ms = *self.config.placement_ms();

        self.store.update(game_id, now, |record, events| {
            match record.status {
                GameStatus::Countdown => {}
                GameStatus::Placement | GameStatus::Battle | GameStatus::Finished => {
                    return Ok(AdvanceOutcome { advanced: false });
                }
                GameStatus::Lobby => {
                    return Err(GameError::Phase {
                        expected: GameStatus::Countdown,
                        actual: record.status,
                    });
                }
            }
            if !record.countdown_expired(now) {
                return Err(GameError::TimerNotExpired {
                    phase: GameStatus::Countdown,
                });
            }
            record.status = GameStatus::Placement;
            record.placement_started_at = Some(now);
            record.placement_duration_ms = placement_ms;
            events.append(None, EventKind::PlacementStarted, json!({}));
            info!("Countdown expired, placement started");
            Ok(AdvanceOutcome { advanced: true })
        })
    }

    /// Commits a player's fleet.
    ///
    /// Idempotent: a repeat commit after success returns
    /// `already_committed: true` without appending events. When the last
    /// player commits, a uniformly random first turn-holder is drawn and
    /// the battle begins.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidPlacement`] (leaving all state
    /// untouched) when the fleet fails validation, and
    /// [`GameError::Phase`] outside the placement phase.
    #[instrument(skip(self, ships))]
    pub async fn commit_placement(
        &self,
        game_id: &str,
        player_id: &str,
        ships: Vec<Ship>,
    ) -> Result<CommitOutcome, GameError> {
        let now = self.now();

        let (outcome, handoff) = self.store.update(game_id, now, |record, events| {
            let player = record.player(player_id).ok_or(GameError::UnknownPlayer {
                player_id: player_id.to_string(),
            })?;
            // A network retry can land after the phase advanced; the
            // committed flag, not the caller's assumption, decides.
            if player.placement_committed {
                debug!(player_id, "Placement already committed");
                return Ok((
                    CommitOutcome {
                        already_committed: true,
                        battle_started: false,
                    },
                    None,
                ));
            }
            if record.status != GameStatus::Placement {
                return Err(GameError::Phase {
                    expected: GameStatus::Placement,
                    actual: record.status,
                });
            }

            validate_placement(&ships)?;
            record
                .boards
                .insert(player_id.to_string(), Board::new(ships));
            let player = record.player_mut(player_id).ok_or(GameError::UnknownPlayer {
                player_id: player_id.to_string(),
            })?;
            player.placement_committed = true;
            player.last_seen_at = now;
            events.append(
                Some(player_id.to_string()),
                EventKind::PlacementCommitted,
                json!({ "player_id": player_id }),
            );
            info!(player_id, "Placement committed");

            if record.is_full() && record.all_committed() {
                let handoff = self.start_battle(record, events, now);
                return Ok((
                    CommitOutcome {
                        already_committed: false,
                        battle_started: true,
                    },
                    Some(handoff),
                ));
            }
            Ok((
                CommitOutcome {
                    already_committed: false,
                    battle_started: false,
                },
                None,
            ))
        })?;

        self.maybe_schedule_bot(game_id, handoff);
        Ok(outcome)
    }

    /// Advances an expired placement phase, force-committing any player
    /// who never committed (their starter fleet stands), then starting
    /// the battle.
    ///
    /// Re-entrant like [`advance_from_countdown`](Self::advance_from_countdown).
    #[instrument(skip(self))]
    pub async fn advance_from_placement(&self, game_id: &str) -> Result<AdvanceOutcome, GameError> {
        let now = self.now();

        let (outcome, handoff) = self.store.update(game_id, now, |record, events| {
            match record.status {
                GameStatus::Placement => {}
                GameStatus::Battle | GameStatus::Finished => {
                    return Ok((AdvanceOutcome { advanced: false }, None));
                }
                GameStatus::Lobby | GameStatus::Countdown => {
                    return Err(GameError::Phase {
                        expected: GameStatus::Placement,
                        actual: record.status,
                    });
                }
            }
            if !record.placement_expired(now) {
                return Err(GameError::TimerNotExpired {
                    phase: GameStatus::Placement,
                });
            }

            let stragglers: Vec<PlayerId> = record
                .players
                .iter()
                .filter(|p| !p.placement_committed)
                .map(|p| p.id.clone())
                .collect();
            for id in stragglers {
                if let Some(p) = record.player_mut(&id) {
                    p.placement_committed = true;
                }
                events.append(
                    None,
                    EventKind::PlacementAutoCommitted,
                    json!({ "player_id": id }),
                );
                info!(player_id = %id, "Placement auto-committed on timer expiry");
            }

            let handoff = self.start_battle(record, events, now);
            Ok((AdvanceOutcome { advanced: true }, Some(handoff)))
        })?;

        self.maybe_schedule_bot(game_id, handoff);
        Ok(outcome)
    }

    /// Picks a random first turn-holder and moves the record into battle.
    fn start_battle(
        &self,
        record: &mut GameRecord,
        events: &mut EventWriter,
        now: DateTime<Utc>,
    ) -> TurnHandoff {
        let first_idx = {
            let mut rng = self.rng.lock().expect("rng lock poisoned");
            rng.gen_range(0..record.players.len())
        };
        let first = record.players[first_idx].clone();

        record.status = GameStatus::Battle;
        record.current_turn_player_id = Some(first.id.clone());
        record.turn_started_at = Some(now);
        record.turn_duration_ms = *self.config.turn_ms();
        events.append(
            None,
            EventKind::BattleStarted,
            json!({ "first_turn_player_id": first.id }),
        );
        info!(first_turn = %first.id, "Battle started");
        TurnHandoff {
            to_bot: first.is_bot,
            turn_started_at: now,
        }
    }

    /// Fires a shot at the opponent's board.
    ///
    /// Rejects callers who do not hold the turn, out-of-bounds targets,
    /// and repeats of an already-fired coordinate — each with no state
    /// change at all. A destroying shot finishes the game; otherwise the
    /// turn passes to the opponent, any hover is cleared, and a bot move
    /// is scheduled when the opponent is the bot.
    #[instrument(skip(self), fields(coord = %coord))]
    pub async fn fire_shot(
        &self,
        game_id: &str,
        player_id: &str,
        coord: Coord,
    ) -> Result<ShotOutcome, GameError> {
        let now = self.now();

        let (outcome, handoff) = self.store.update(game_id, now, |record, events| {
            if record.status != GameStatus::Battle {
                return Err(GameError::Phase {
                    expected: GameStatus::Battle,
                    actual: record.status,
                });
            }
            if record.player(player_id).is_none() {
                return Err(GameError::UnknownPlayer {
                    player_id: player_id.to_string(),
                });
            }
            if record.current_turn_player_id.as_deref() != Some(player_id) {
                return Err(GameError::NotYourTurn);
            }
            if !coord.in_bounds() {
                return Err(GameError::OutOfBounds { coord });
            }
            let defender_id = record
                .opponent_id(player_id)
                .ok_or(GameError::NotYourTurn)?;
            let board = record
                .boards
                .get_mut(&defender_id)
                .ok_or(GameError::UnknownPlayer {
                    player_id: defender_id.clone(),
                })?;
            if board.has_shot_at(coord) {
                return Err(GameError::DuplicateShot { coord });
            }

            let result = resolve_shot(board, coord);
            board.shots_received.push(Shot {
                coord,
                result: result.clone(),
                timestamp: now,
            });
            events.append(
                Some(player_id.to_string()),
                EventKind::ShotFired,
                json!({ "coord": coord }),
            );
            events.append(
                Some(player_id.to_string()),
                EventKind::ShotResolved,
                json!({ "coord": coord, "outcome": result }),
            );
            debug!(?result, "Shot resolved");

            // A successful shot breaks the expiry streak.
            if let Some(p) = record.player_mut(player_id) {
                p.timeout_count = 0;
                p.last_seen_at = now;
            }

            let destroyed = record
                .boards
                .get(&defender_id)
                .map(all_ships_sunk)
                .unwrap_or(false);
            if destroyed {
                Self::finish(record, events, Some(player_id.to_string()), WinReason::Elimination);
                return Ok((
                    ShotOutcome {
                        result,
                        game_over: true,
                    },
                    None,
                ));
            }

            let to_bot = record.player(&defender_id).map(|p| p.is_bot).unwrap_or(false);
            record.current_turn_player_id = Some(defender_id.clone());
            record.turn_started_at = Some(now);
            record.hover = None;
            events.append(
                None,
                EventKind::TurnAdvanced,
                json!({ "next_turn_player_id": defender_id }),
            );
            Ok((
                ShotOutcome {
                    result,
                    game_over: false,
                },
                Some(TurnHandoff {
                    to_bot,
                    turn_started_at: now,
                }),
            ))
        })?;

        self.maybe_schedule_bot(game_id, handoff);
        Ok(outcome)
    }

    /// Advances the turn when its deadline has passed.
    ///
    /// Safe for either client to poll: an unexpired turn (or an already
    /// finished game) is a no-op reported as `advanced: false`. An
    /// expiry increments the turn-holder's timeout count; hitting the
    /// configured maximum forfeits the game to the opponent.
    #[instrument(skip(self))]
    pub async fn advance_turn_if_expired(
        &self,
        game_id: &str,
    ) -> Result<TurnPollOutcome, GameError> {
        let now = self.now();
        let max_timeouts = *self.config.max_timeouts();

        let (outcome, handoff) = self.store.update(game_id, now, |record, events| {
            match record.status {
                GameStatus::Battle => {}
                // A racing poll may have already forfeited the game;
                // telling the caller "nothing to do" lets it self-heal.
                GameStatus::Finished => {
                    return Ok((
                        TurnPollOutcome {
                            advanced: false,
                            forfeited: false,
                        },
                        None,
                    ));
                }
                _ => {
                    return Err(GameError::Phase {
                        expected: GameStatus::Battle,
                        actual: record.status,
                    });
                }
            }
            if !record.turn_expired(now) {
                return Ok((
                    TurnPollOutcome {
                        advanced: false,
                        forfeited: false,
                    },
                    None,
                ));
            }
            let Some(expiring_id) = record.current_turn_player_id.clone() else {
                warn!("Battle record has no turn holder");
                return Ok((
                    TurnPollOutcome {
                        advanced: false,
                        forfeited: false,
                    },
                    None,
                ));
            };

            let count = {
                let player = record.player_mut(&expiring_id).ok_or(GameError::UnknownPlayer {
                    player_id: expiring_id.clone(),
                })?;
                player.timeout_count += 1;
                player.timeout_count
            };
            events.append(
                None,
                EventKind::TurnTimeout,
                json!({ "player_id": expiring_id, "timeout_count": count }),
            );
            warn!(player_id = %expiring_id, count, "Turn expired");

            if count >= max_timeouts {
                let winner = record.opponent_id(&expiring_id);
                Self::finish(record, events, winner, WinReason::TimeoutForfeit);
                return Ok((
                    TurnPollOutcome {
                        advanced: true,
                        forfeited: true,
                    },
                    None,
                ));
            }

            let next_id = record.opponent_id(&expiring_id).ok_or(GameError::UnknownPlayer {
                player_id: expiring_id.clone(),
            })?;
            let to_bot = record.player(&next_id).map(|p| p.is_bot).unwrap_or(false);
            record.current_turn_player_id = Some(next_id.clone());
            record.turn_started_at = Some(now);
            record.hover = None;
            events.append(
                None,
                EventKind::TurnAdvanced,
                json!({ "next_turn_player_id": next_id }),
            );
            Ok((
                TurnPollOutcome {
                    advanced: true,
                    forfeited: false,
                },
                Some(TurnHandoff {
                    to_bot,
                    turn_started_at: now,
                }),
            ))
        })?;

        self.maybe_schedule_bot(game_id, handoff);
        Ok(outcome)
    }

    /// Forfeits the game. The opponent, if any has joined, wins.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Phase`] during the countdown or once the
    /// game is already finished.
    #[instrument(skip(self))]
    pub fn forfeit_game(&self, game_id: &str, player_id: &str) -> Result<(), GameError> {
        let now = self.now();

        self.store.update(game_id, now, |record, events| {
            match record.status {
                GameStatus::Lobby | GameStatus::Placement | GameStatus::Battle => {}
                GameStatus::Countdown | GameStatus::Finished => {
                    return Err(GameError::Phase {
                        expected: GameStatus::Battle,
                        actual: record.status,
                    });
                }
            }
            if record.player(player_id).is_none() {
                return Err(GameError::UnknownPlayer {
                    player_id: player_id.to_string(),
                });
            }
            let winner = record.opponent_id(player_id);
            info!(forfeited_by = player_id, winner = ?winner, "Game forfeited");
            Self::finish(record, events, winner, WinReason::Forfeit);
            Ok(())
        })
    }

    /// Moves the record to its terminal state and logs the finish.
    fn finish(
        record: &mut GameRecord,
        events: &mut EventWriter,
        winner: Option<PlayerId>,
        reason: WinReason,
    ) {
        record.status = GameStatus::Finished;
        record.winner_player_id = winner.clone();
        record.win_reason = Some(reason);
        record.current_turn_player_id = None;
        record.turn_started_at = None;
        record.hover = None;
        events.append(
            None,
            EventKind::GameFinished,
            json!({ "winner_player_id": winner, "reason": reason }),
        );
        info!(winner = ?record.winner_player_id, ?reason, "Game finished");
    }

    /// Publishes the turn-holder's hover position for the opponent. The
    /// channel only exists in pvp games; the bot neither hovers nor
    /// watches.
    ///
    /// # Errors
    ///
    /// Rejected in pve games, outside battle, and for anyone but the
    /// turn-holder.
    #[instrument(skip(self), fields(coord = %coord))]
    pub fn set_hover(&self, game_id: &str, player_id: &str, coord: Coord) -> Result<(), GameError> {
        let now = self.now();

        self.store.update(game_id, now, |record, _events| {
            if record.mode != GameMode::Pvp {
                return Err(GameError::PvpOnly);
            }
            if record.status != GameStatus::Battle {
                return Err(GameError::Phase {
                    expected: GameStatus::Battle,
                    actual: record.status,
                });
            }
            if record.current_turn_player_id.as_deref() != Some(player_id) {
                return Err(GameError::NotYourTurn);
            }
            if !coord.in_bounds() {
                return Err(GameError::OutOfBounds { coord });
            }
            record.hover = Some(HoverState {
                player_id: player_id.to_string(),
                coord,
                updated_at: now,
            });
            Ok(())
        })
    }

    /// Reads a game as seen by `requesting_player_id`.
    ///
    /// The requester's own board is returned in full; every other board
    /// has its ships stripped. The opponent's hover is included only
    /// while fresh.
    #[instrument(skip(self))]
    pub fn get_game(
        &self,
        game_id: &str,
        requesting_player_id: &str,
    ) -> Result<GameView, GameError> {
        let record = self.store.get(game_id)?;
        let now = self.now();

        let boards = record
            .boards
            .iter()
            .map(|(id, board)| {
                let view = if id == requesting_player_id {
                    board.clone()
                } else {
                    board.redacted()
                };
                (id.clone(), view)
            })
            .collect();

        let staleness = Duration::milliseconds(*self.config.hover_staleness_ms());
        let enemy_hover_coord = record
            .hover
            .as_ref()
            .filter(|h| h.player_id != requesting_player_id)
            .filter(|_| record.player(requesting_player_id).is_some())
            .filter(|h| now - h.updated_at <= staleness)
            .map(|h| h.coord);

        Ok(GameView {
            id: record.id,
            status: record.status,
            mode: record.mode,
            players: record.players,
            boards,
            current_turn_player_id: record.current_turn_player_id,
            turn_started_at: record.turn_started_at,
            turn_duration_ms: record.turn_duration_ms,
            countdown_started_at: record.countdown_started_at,
            countdown_duration_ms: record.countdown_duration_ms,
            placement_started_at: record.placement_started_at,
            placement_duration_ms: record.placement_duration_ms,
            winner_player_id: record.winner_player_id,
            win_reason: record.win_reason,
            enemy_hover_coord,
        })
    }

    /// Lists a summary of every game, newest first.
    #[instrument(skip(self))]
    pub fn list_games(&self) -> Vec<GameSummary> {
        let mut summaries: Vec<GameSummary> = self
            .store
            .list()
            .into_iter()
            .map(|r| GameSummary {
                id: r.id,
                status: r.status,
                mode: r.mode,
                player_count: r.players.len(),
                created_at: r.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        summaries
    }

    /// Reads a page of the game's event log for audit or UI replay.
    #[instrument(skip(self))]
    pub fn list_game_events(
        &self,
        game_id: &str,
        limit: usize,
        cursor: Option<u64>,
    ) -> Result<EventPage, GameError> {
        self.store.events_page(game_id, limit, cursor)
    }

    /// Draws a uniform delay from the configured bot window and hands
    /// off to the deferred executor in `bot.rs`.
    fn maybe_schedule_bot(&self, game_id: &str, handoff: Option<TurnHandoff>) {
        let Some(handoff) = handoff else { return };
        if !handoff.to_bot {
            return;
        }
        self.schedule_bot_move(game_id.to_string(), handoff.turn_started_at);
    }

    pub(crate) fn rng_delay_ms(&self) -> u64 {
        let min = *self.config.bot_delay_min_ms();
        let max = (*self.config.bot_delay_max_ms()).max(min);
        let mut rng = self.rng.lock().expect("rng lock poisoned");
        rng.gen_range(min..=max)
    }

    pub(crate) fn draw_target(&self, shots: &[Shot]) -> Option<Coord> {
        let mut rng = self.rng.lock().expect("rng lock poisoned");
        crate::strategist::recommend_target(shots, &mut *rng)
    }
}
