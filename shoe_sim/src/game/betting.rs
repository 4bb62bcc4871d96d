//! Threshold based bet sizing and the shoe exit check.

use crate::game::count::{CountState, CountingStrategy};
use crate::GameError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Comparison a `BetRule` applies between the true count and its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "<=")]
    AtMost,
    #[serde(rename = ">")]
    Above,
    #[serde(rename = "<")]
    Below,
}

impl Comparison {
    pub fn holds(&self, true_count: f64, threshold: f64) -> bool {
        match self {
            Comparison::AtLeast => true_count >= threshold,
            Comparison::AtMost => true_count <= threshold,
            Comparison::Above => true_count > threshold,
            Comparison::Below => true_count < threshold,
        }
    }
}

impl Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            Comparison::AtLeast => ">=",
            Comparison::AtMost => "<=",
            Comparison::Above => ">",
            Comparison::Below => "<",
        };
        write!(f, "{op}")
    }
}

/// Wager `wager` when the true count compares to `threshold` according to `comparison`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetRule {
    pub comparison: Comparison,
    pub threshold: f64,
    pub wager: i64,
}

impl BetRule {
    pub fn new(comparison: Comparison, threshold: f64, wager: i64) -> BetRule {
        BetRule {
            comparison,
            threshold,
            wager,
        }
    }

    /// Rejects rules that cannot be evaluated meaningfully, meant to be called where rules enter the system.
    pub fn validate(&self) -> Result<(), GameError> {
        if !self.threshold.is_finite() {
            return Err(GameError::InvalidRule(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        if self.wager < 0 {
            return Err(GameError::InvalidRule(format!(
                "wager must not be negative, got {}",
                self.wager
            )));
        }
        Ok(())
    }
}

impl Display for BetRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TC {} {} -> {}", self.comparison, self.threshold, self.wager)
    }
}

/// The ramp used when no rules have been configured.
pub fn default_rules() -> Vec<BetRule> {
    vec![
        BetRule::new(Comparison::AtLeast, 10.0, 25_000),
        BetRule::new(Comparison::AtLeast, 5.0, 10_000),
        BetRule::new(Comparison::AtLeast, 2.0, 5_000),
        BetRule::new(Comparison::Below, 2.0, 1_000),
    ]
}

/// Wager of the first rule that holds for `true_count`, or `default_wager` when none does.
pub fn wager_for(true_count: f64, rules: &[BetRule], default_wager: i64) -> i64 {
    rules
        .iter()
        .find(|rule| rule.comparison.holds(true_count, rule.threshold))
        .map(|rule| rule.wager)
        .unwrap_or(default_wager)
}

/// Computes the true count of `strategy` from `counts` and `decks_remaining`, then picks a wager by `rules`.
/// The result is not clamped, the table applies its own bet limits.
pub fn decide_wager(
    counts: &CountState,
    decks_remaining: f64,
    rules: &[BetRule],
    strategy: CountingStrategy,
    default_wager: i64,
) -> i64 {
    let true_count = counts.running(strategy) / decks_remaining;
    wager_for(true_count, rules, default_wager)
}

/// True when the count has dropped below `exit_threshold` and the shoe should be abandoned.
pub fn should_exit(true_count: f64, exit_threshold: f64) -> bool {
    true_count < exit_threshold
}
