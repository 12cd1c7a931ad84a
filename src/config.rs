//! Game service configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Tunable timings and limits for the game service.
///
/// Every field has a serde default, so a TOML file only needs to name the
/// values it overrides.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct GameConfig {
    /// Length of the pre-placement countdown, in milliseconds.
    #[serde(default = "default_countdown_ms")]
    countdown_ms: i64,

    /// How long players have to place their fleets, in milliseconds.
    #[serde(default = "default_placement_ms")]
    placement_ms: i64,

    /// How long each battle turn lasts, in milliseconds.
    #[serde(default = "default_turn_ms")]
    turn_ms: i64,

    /// Consecutive turn timeouts before a player forfeits.
    #[serde(default = "default_max_timeouts")]
    max_timeouts: u32,

    /// Lower bound of the bot's human-paced thinking delay, in milliseconds.
    #[serde(default = "default_bot_delay_min_ms")]
    bot_delay_min_ms: u64,

    /// Upper bound of the bot's thinking delay, in milliseconds.
    #[serde(default = "default_bot_delay_max_ms")]
    bot_delay_max_ms: u64,

    /// Age beyond which a stored hover is no longer shown, in milliseconds.
    #[serde(default = "default_hover_staleness_ms")]
    hover_staleness_ms: i64,

    /// Seed for the service RNG. `None` seeds from entropy; tests set it
    /// for reproducible fleets, turn draws, and strategist behavior.
    #[serde(default)]
    rng_seed: Option<u64>,
}

fn default_countdown_ms() -> i64 {
    5_000
}

fn default_placement_ms() -> i64 {
    60_000
}

fn default_turn_ms() -> i64 {
    30_000
}

fn default_max_timeouts() -> u32 {
    3
}

fn default_bot_delay_min_ms() -> u64 {
    800
}

fn default_bot_delay_max_ms() -> u64 {
    2_200
}

fn default_hover_staleness_ms() -> i64 {
    2_000
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            countdown_ms: default_countdown_ms(),
            placement_ms: default_placement_ms(),
            turn_ms: default_turn_ms(),
            max_timeouts: default_max_timeouts(),
            bot_delay_min_ms: default_bot_delay_min_ms(),
            bot_delay_max_ms: default_bot_delay_max_ms(),
            hover_staleness_ms: default_hover_staleness_ms(),
            rng_seed: None,
        }
    }
}

impl GameConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!("Config loaded successfully");
        Ok(config)
    }

    /// Returns a copy with the RNG seed pinned, for deterministic tests.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Returns a copy with the turn length overridden.
    pub fn with_turn_ms(mut self, turn_ms: i64) -> Self {
        self.turn_ms = turn_ms;
        self
    }

    /// Returns a copy with the countdown length overridden.
    pub fn with_countdown_ms(mut self, countdown_ms: i64) -> Self {
        self.countdown_ms = countdown_ms;
        self
    }

    /// Returns a copy with the placement window overridden.
    pub fn with_placement_ms(mut self, placement_ms: i64) -> Self {
        self.placement_ms = placement_ms;
        self
    }

    /// Returns a copy with the bot delay window overridden.
    pub fn with_bot_delay_ms(mut self, min: u64, max: u64) -> Self {
        self.bot_delay_min_ms = min;
        self.bot_delay_max_ms = max;
        self
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where the error occurred.
    pub line: u32,
    /// Source file where the error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error with caller location tracking.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
