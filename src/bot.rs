//! Deferred bot-move scheduling and execution.
//!
//! Whenever a state change hands the turn to the bot, a task is spawned
//! that sleeps a random, human-paced delay and then fires. The task is
//! never cancelled; instead it re-validates the world before acting, so
//! a callback that outlived its turn (human forfeited, turn advanced by
//! timeout, a sibling callback already fired) degrades to a silent
//! no-op.

use crate::game::{GameId, GameStatus};
use crate::service::GameService;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, instrument, warn};

impl GameService {
    /// Spawns a deferred bot move for the turn that started at
    /// `turn_started_at`.
    pub(crate) fn schedule_bot_move(&self, game_id: GameId, turn_started_at: DateTime<Utc>) {
        let delay_ms = self.rng_delay_ms();
        debug!(game_id = %game_id, delay_ms, "Scheduling bot move");
        let service = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            service.execute_bot_move(&game_id, turn_started_at).await;
        });
    }

    /// Runs one scheduled bot move.
    ///
    /// Validates, against a fresh read of the record, that the game is
    /// still in battle, the bot still holds the turn, and the turn is
    /// still the one this callback was scheduled for. Any mismatch means
    /// a staler or newer world than expected, and the callback quietly
    /// stands down rather than double-fire.
    #[instrument(skip(self))]
    pub(crate) async fn execute_bot_move(&self, game_id: &str, scheduled_turn: DateTime<Utc>) {
        let record = match self.store().get(game_id) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Bot move aborted, game missing");
                return;
            }
        };

        if record.status != GameStatus::Battle {
            debug!(status = %record.status, "Bot move stale, game not in battle");
            return;
        }
        let Some(turn_holder) = record.current_turn_player_id.clone() else {
            debug!("Bot move stale, no turn holder");
            return;
        };
        if !record.player(&turn_holder).map(|p| p.is_bot).unwrap_or(false) {
            debug!("Bot move stale, turn belongs to a human");
            return;
        }
        if record.turn_started_at != Some(scheduled_turn) {
            debug!("Bot move stale, turn already advanced");
            return;
        }

        let Some(defender_id) = record.opponent_id(&turn_holder) else {
            warn!("Bot has no opponent to target");
            return;
        };
        let Some(board) = record.boards.get(&defender_id) else {
            warn!(defender_id = %defender_id, "Defender board missing");
            return;
        };
        let Some(target) = self.draw_target(&board.shots_received) else {
            warn!("Strategist found no target, board exhausted");
            return;
        };

        debug!(target = %target, "Bot firing");
        // The fire path re-checks phase, turn, and duplicates inside the
        // store transaction; losing that race is an expected no-op.
        if let Err(e) = self.fire_shot(game_id, &turn_holder, target).await {
            debug!(error = %e, "Bot shot rejected by a concurrent change");
        }
    }
}
