//! In-memory game store: the atomic read-modify-write boundary.
//!
//! Every service command runs as a closure under the store lock: phase
//! guards, record mutation, and event appends either all commit or none
//! do. Commands work on a clone of the record and the clone is only
//! written back on success, so a rejected command leaves no trace — not
//! even a bumped `updated_at`. Racing commands serialize on the lock and
//! the loser re-evaluates its guards against the updated record.

use crate::error::GameError;
use crate::events::{EventKind, EventPage, GameEvent};
use crate::game::{GameId, GameRecord, PlayerId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Buffers events appended during a transaction; assigned gapless
/// sequence numbers on commit.
#[derive(Debug)]
pub struct EventWriter {
    game_id: GameId,
    now: DateTime<Utc>,
    base_seq: u64,
    buffered: Vec<GameEvent>,
}

impl EventWriter {
    fn new(game_id: GameId, now: DateTime<Utc>, base_seq: u64) -> Self {
        Self {
            game_id,
            now,
            base_seq,
            buffered: Vec::new(),
        }
    }

    /// Appends an event; it becomes durable only if the enclosing
    /// transaction commits.
    pub fn append(
        &mut self,
        actor_player_id: Option<PlayerId>,
        kind: EventKind,
        payload: serde_json::Value,
    ) {
        let seq = self.base_seq + self.buffered.len() as u64 + 1;
        self.buffered.push(GameEvent {
            game_id: self.game_id.clone(),
            seq,
            actor_player_id,
            kind,
            payload,
            created_at: self.now,
        });
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    games: HashMap<GameId, GameRecord>,
    events: HashMap<GameId, Vec<GameEvent>>,
}

/// Thread-safe store holding every game record and its event log.
#[derive(Debug, Clone, Default)]
pub struct GameStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl GameStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new game record and its initial events atomically.
    pub fn create(
        &self,
        record: GameRecord,
        now: DateTime<Utc>,
        seed: impl FnOnce(&mut EventWriter),
    ) {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let mut writer = EventWriter::new(record.id.clone(), now, 0);
        seed(&mut writer);
        debug!(game_id = %record.id, events = writer.buffered.len(), "Creating game record");
        inner.events.insert(record.id.clone(), writer.buffered);
        inner.games.insert(record.id.clone(), record);
    }

    /// Returns a clone of the record.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown game id.
    pub fn get(&self, game_id: &str) -> Result<GameRecord, GameError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        inner.games.get(game_id).cloned().ok_or(GameError::NotFound {
            id: game_id.to_string(),
        })
    }

    /// Runs a command transactionally against one record.
    ///
    /// The closure receives a working copy of the record plus an event
    /// writer. On `Ok` the copy replaces the stored record (with
    /// `updated_at` stamped) and buffered events are appended; on `Err`
    /// nothing changes.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown game id, or the
    /// closure's own error.
    pub fn update<T>(
        &self,
        game_id: &str,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut GameRecord, &mut EventWriter) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let mut work = inner
            .games
            .get(game_id)
            .cloned()
            .ok_or(GameError::NotFound {
                id: game_id.to_string(),
            })?;
        let base_seq = inner.events.get(game_id).map(|log| log.len() as u64).unwrap_or(0);
        let mut writer = EventWriter::new(work.id.clone(), now, base_seq);

        let original = work.clone();
        let out = f(&mut work, &mut writer)?;

        // Idempotent re-entrant commands succeed without touching the
        // record; skip the write-back so even `updated_at` stays put.
        if work == original && writer.buffered.is_empty() {
            return Ok(out);
        }

        work.updated_at = now;
        inner.events.entry(work.id.clone()).or_default().extend(writer.buffered);
        inner.games.insert(work.id.clone(), work);
        Ok(out)
    }

    /// Clones of every stored record.
    pub fn list(&self) -> Vec<GameRecord> {
        let inner = self.inner.lock().expect("store lock poisoned");
        inner.games.values().cloned().collect()
    }

    /// Reads a page of a game's event log, ascending by `seq`, starting
    /// after `cursor`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown game id.
    pub fn events_page(
        &self,
        game_id: &str,
        limit: usize,
        cursor: Option<u64>,
    ) -> Result<EventPage, GameError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        if !inner.games.contains_key(game_id) {
            return Err(GameError::NotFound {
                id: game_id.to_string(),
            });
        }
        let log = inner.events.get(game_id).map(Vec::as_slice).unwrap_or(&[]);
        let after = cursor.unwrap_or(0);
        let events: Vec<GameEvent> = log
            .iter()
            .filter(|e| e.seq > after)
            .take(limit)
            .cloned()
            .collect();
        let next_cursor = match events.last() {
            Some(last) if log.iter().any(|e| e.seq > last.seq) => Some(last.seq),
            _ => None,
        };
        Ok(EventPage { events, next_cursor })
    }

    /// Number of events logged for a game. Mostly useful in tests.
    pub fn event_count(&self, game_id: &str) -> usize {
        let inner = self.inner.lock().expect("store lock poisoned");
        inner.events.get(game_id).map(Vec::len).unwrap_or(0)
    }
}
