pub mod game;
pub mod logger;
pub mod write;

use blackjack_lib::ShoeError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub use game::prelude::*;

pub mod prelude {
    pub use super::{
        game::prelude::*, ConfigError, GameError, TableConfig, TableConfigBuilder,
    };
}

/// Errors produced while driving the table.
#[derive(Error, Debug)]
pub enum GameError {
    #[error("{0}")]
    EmptyShoe(#[from] ShoeError),
    #[error("cannot {action} while the table is in the {phase} phase")]
    IllegalAction {
        action: &'static str,
        phase: RoundPhase,
    },
    #[error("double down requires exactly two cards, the hand holds {cards}")]
    DoubleNotAllowed { cards: usize },
    #[error("invalid bet rule: {0}")]
    InvalidRule(String),
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
    #[error("the shared table lock was poisoned")]
    Poisoned,
    #[error("the autopilot thread panicked")]
    AgentPanicked,
}

/// Errors produced while loading or validating a `TableConfig`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("unable to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Smallest depletion threshold a config may carry. Leaves enough cards behind the last deal for the round to finish.
pub const MIN_DEPLETION_THRESHOLD: usize = 15;

/// The tunables of a table: bet limits, shoe size, house rules and the pacing used by the autopilot.
/// Deserializes from partial documents, any missing key keeps its default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub min_bet: i64,
    pub max_bet: i64,
    pub num_decks: usize,
    /// A deal is refused, and the shoe ends, once fewer cards than this remain.
    pub depletion_threshold: usize,
    pub dealer_stands_on: u8,
    pub initial_bet: i64,
    /// Wager used by the autopilot when no bet rule matches.
    pub default_wager: i64,
    pub seed: Option<u64>,
    pub dealer_delay_ms: u64,
    pub think_delay_ms: u64,
    pub play_delay_ms: u64,
    pub wong_out_delay_ms: u64,
    pub round_delay_ms: u64,
    pub shoe_delay_ms: u64,
}

impl TableConfig {
    /// Associated method for returning a new `TableConfigBuilder`, unset fields take the standard table values.
    pub fn new() -> TableConfigBuilder {
        TableConfigBuilder::default()
    }

    /// Standard table with every pacing delay set to zero, for headless runs and tests.
    pub fn instant() -> TableConfig {
        TableConfig::new().no_delays().build()
    }

    /// Reads a TOML document from `path` and validates it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<TableConfig, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: TableConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_bet < 0 {
            return Err(ConfigError::Invalid("min_bet must not be negative".to_string()));
        }
        if self.min_bet > self.max_bet {
            return Err(ConfigError::Invalid(format!(
                "min_bet {} is larger than max_bet {}",
                self.min_bet, self.max_bet
            )));
        }
        if self.num_decks == 0 {
            return Err(ConfigError::Invalid("a shoe needs at least one deck".to_string()));
        }
        if self.depletion_threshold < MIN_DEPLETION_THRESHOLD {
            return Err(ConfigError::Invalid(format!(
                "depletion_threshold {} is below the minimum of {}",
                self.depletion_threshold, MIN_DEPLETION_THRESHOLD
            )));
        }
        if self.dealer_stands_on == 0 || self.dealer_stands_on > 21 {
            return Err(ConfigError::Invalid(format!(
                "dealer stand threshold {} is outside 1..=21",
                self.dealer_stands_on
            )));
        }
        Ok(())
    }

    /// Clamps `bet` into the table limits.
    pub fn clamp_bet(&self, bet: i64) -> i64 {
        bet.clamp(self.min_bet, self.max_bet)
    }

    pub fn dealer_delay(&self) -> Duration {
        Duration::from_millis(self.dealer_delay_ms)
    }

    pub fn think_delay(&self) -> Duration {
        Duration::from_millis(self.think_delay_ms)
    }

    pub fn play_delay(&self) -> Duration {
        Duration::from_millis(self.play_delay_ms)
    }

    pub fn wong_out_delay(&self) -> Duration {
        Duration::from_millis(self.wong_out_delay_ms)
    }

    pub fn round_delay(&self) -> Duration {
        Duration::from_millis(self.round_delay_ms)
    }

    pub fn shoe_delay(&self) -> Duration {
        Duration::from_millis(self.shoe_delay_ms)
    }
}

impl Default for TableConfig {
    /// Returns the standard configuration of the table.
    fn default() -> Self {
        TableConfig::new().build()
    }
}

/// Struct to implement builder pattern for `TableConfig`
#[derive(Debug, Clone, Copy, Default)]
pub struct TableConfigBuilder {
    min_bet: Option<i64>,
    max_bet: Option<i64>,
    num_decks: Option<usize>,
    depletion_threshold: Option<usize>,
    dealer_stands_on: Option<u8>,
    initial_bet: Option<i64>,
    default_wager: Option<i64>,
    seed: Option<u64>,
    dealer_delay_ms: Option<u64>,
    think_delay_ms: Option<u64>,
    play_delay_ms: Option<u64>,
    wong_out_delay_ms: Option<u64>,
    round_delay_ms: Option<u64>,
    shoe_delay_ms: Option<u64>,
}

impl TableConfigBuilder {
    /// Method for setting the minimum bet the autopilot may place.
    pub fn min_bet(&mut self, bet: i64) -> &mut Self {
        self.min_bet = Some(bet);
        self
    }

    /// Method for setting the maximum bet the autopilot may place.
    pub fn max_bet(&mut self, bet: i64) -> &mut Self {
        self.max_bet = Some(bet);
        self
    }

    /// Method for choosing the number of decks in each shoe
    pub fn num_decks(&mut self, decks: usize) -> &mut Self {
        self.num_decks = Some(decks);
        self
    }

    pub fn depletion_threshold(&mut self, cards: usize) -> &mut Self {
        self.depletion_threshold = Some(cards);
        self
    }

    pub fn dealer_stands_on(&mut self, total: u8) -> &mut Self {
        self.dealer_stands_on = Some(total);
        self
    }

    /// Method for setting the bet the table starts with after a hard reset
    pub fn initial_bet(&mut self, bet: i64) -> &mut Self {
        self.initial_bet = Some(bet);
        self
    }

    pub fn default_wager(&mut self, wager: i64) -> &mut Self {
        self.default_wager = Some(wager);
        self
    }

    /// Seeds the shuffles so a run can be replayed exactly.
    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.seed = Some(seed);
        self
    }

    pub fn dealer_delay_ms(&mut self, ms: u64) -> &mut Self {
        self.dealer_delay_ms = Some(ms);
        self
    }

    pub fn think_delay_ms(&mut self, ms: u64) -> &mut Self {
        self.think_delay_ms = Some(ms);
        self
    }

    pub fn play_delay_ms(&mut self, ms: u64) -> &mut Self {
        self.play_delay_ms = Some(ms);
        self
    }

    pub fn wong_out_delay_ms(&mut self, ms: u64) -> &mut Self {
        self.wong_out_delay_ms = Some(ms);
        self
    }

    pub fn round_delay_ms(&mut self, ms: u64) -> &mut Self {
        self.round_delay_ms = Some(ms);
        self
    }

    pub fn shoe_delay_ms(&mut self, ms: u64) -> &mut Self {
        self.shoe_delay_ms = Some(ms);
        self
    }

    /// Sets every pacing delay to zero.
    pub fn no_delays(&mut self) -> &mut Self {
        self.dealer_delay_ms(0)
            .think_delay_ms(0)
            .play_delay_ms(0)
            .wong_out_delay_ms(0)
            .round_delay_ms(0)
            .shoe_delay_ms(0)
    }

    /// Method for building a `TableConfig` object from the given `TableConfigBuilder` object.
    pub fn build(&mut self) -> TableConfig {
        TableConfig {
            min_bet: self.min_bet.unwrap_or(1_000),
            max_bet: self.max_bet.unwrap_or(1_000_000),
            num_decks: self.num_decks.unwrap_or(2),
            depletion_threshold: self.depletion_threshold.unwrap_or(15),
            dealer_stands_on: self.dealer_stands_on.unwrap_or(17),
            initial_bet: self.initial_bet.unwrap_or(1_000),
            default_wager: self.default_wager.unwrap_or(1_000),
            seed: self.seed,
            dealer_delay_ms: self.dealer_delay_ms.unwrap_or(400),
            think_delay_ms: self.think_delay_ms.unwrap_or(1_000),
            play_delay_ms: self.play_delay_ms.unwrap_or(400),
            wong_out_delay_ms: self.wong_out_delay_ms.unwrap_or(800),
            round_delay_ms: self.round_delay_ms.unwrap_or(1_000),
            shoe_delay_ms: self.shoe_delay_ms.unwrap_or(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TableConfig::default();
        assert_eq!(config.min_bet, 1_000);
        assert_eq!(config.max_bet, 1_000_000);
        assert_eq!(config.num_decks, 2);
        assert_eq!(config.depletion_threshold, 15);
        assert_eq!(config.dealer_stands_on, 17);
        assert_eq!(config.dealer_delay(), Duration::from_millis(400));
        assert_eq!(config.think_delay(), Duration::from_millis(1_000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = TableConfig::new().num_decks(6).min_bet(5).seed(42).build();
        assert_eq!(config.num_decks, 6);
        assert_eq!(config.min_bet, 5);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.max_bet, 1_000_000);
    }

    #[test]
    fn test_instant_has_no_delays() {
        let config = TableConfig::instant();
        assert_eq!(config.dealer_delay(), Duration::ZERO);
        assert_eq!(config.wong_out_delay(), Duration::ZERO);
        assert_eq!(config.shoe_delay(), Duration::ZERO);
    }

    #[test]
    fn test_validation() {
        assert!(TableConfig::new().num_decks(0).build().validate().is_err());
        assert!(TableConfig::new().min_bet(10).max_bet(5).build().validate().is_err());
        assert!(TableConfig::new().dealer_stands_on(22).build().validate().is_err());
        assert!(TableConfig::new().depletion_threshold(4).build().validate().is_err());
        assert!(TableConfig::new().depletion_threshold(14).build().validate().is_err());
        assert!(TableConfig::new().depletion_threshold(15).build().validate().is_ok());
    }

    #[test]
    fn test_clamp_bet() {
        let config = TableConfig::default();
        assert_eq!(config.clamp_bet(25_000), 25_000);
        assert_eq!(config.clamp_bet(10), 1_000);
        assert_eq!(config.clamp_bet(5_000_000), 1_000_000);
    }

    #[test]
    fn test_partial_toml() {
        let config: TableConfig = toml::from_str("num_decks = 6\nthink_delay_ms = 0\n").unwrap();
        assert_eq!(config.num_decks, 6);
        assert_eq!(config.think_delay_ms, 0);
        assert_eq!(config.min_bet, 1_000);
    }
}
