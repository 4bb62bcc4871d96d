//! The two running counts kept while a shoe is played, and the true-count view derived from them.

use blackjack_lib::{decks_remaining, Card, Rank};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;

lazy_static! {
    /// Hi-Lo tags: small cards +1, ten-valued cards and aces -1, 7 through 9 neutral.
    static ref SIMPLE_TAGS: HashMap<Rank, i32> = {
        let mut lookup_table = HashMap::new();
        for rank in [Rank::Two, Rank::Three, Rank::Four, Rank::Five, Rank::Six] {
            lookup_table.insert(rank, 1);
        }
        for rank in [Rank::Seven, Rank::Eight, Rank::Nine] {
            lookup_table.insert(rank, 0);
        }
        for rank in [Rank::Ten, Rank::Jack, Rank::Queen, Rank::King, Rank::Ace] {
            lookup_table.insert(rank, -1);
        }
        lookup_table
    };

    /// Fractional weights for the complex system.
    static ref COMPLEX_WEIGHTS: HashMap<Rank, f64> = {
        let mut lookup_table = HashMap::new();
        lookup_table.insert(Rank::Two, 0.4);
        lookup_table.insert(Rank::Three, 0.5);
        lookup_table.insert(Rank::Four, 0.6);
        lookup_table.insert(Rank::Five, 0.7);
        lookup_table.insert(Rank::Six, 0.6);
        lookup_table.insert(Rank::Seven, 0.3);
        lookup_table.insert(Rank::Eight, 0.0);
        lookup_table.insert(Rank::Nine, -0.2);
        for rank in [Rank::Ten, Rank::Jack, Rank::Queen, Rank::King] {
            lookup_table.insert(rank, -0.6);
        }
        lookup_table.insert(Rank::Ace, -0.7);
        lookup_table
    };
}

/// Count delta of `card` under the simple system.
pub fn simple_delta(card: &Card) -> i32 {
    SIMPLE_TAGS.get(&card.rank).copied().unwrap_or(0)
}

/// Count delta of `card` under the complex weighted system.
pub fn complex_delta(card: &Card) -> f64 {
    COMPLEX_WEIGHTS.get(&card.rank).copied().unwrap_or(0.0)
}

/// Which of the two counting systems drives betting and exit decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountingStrategy {
    #[default]
    Simple,
    Complex,
}

impl std::str::FromStr for CountingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(CountingStrategy::Simple),
            "complex" => Ok(CountingStrategy::Complex),
            other => Err(format!("counting strategy not recognized: {other}")),
        }
    }
}

impl Display for CountingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CountingStrategy::Simple => write!(f, "simple"),
            CountingStrategy::Complex => write!(f, "complex"),
        }
    }
}

/// Both running counts for the current shoe. `reveal` is the only way either count moves,
/// so the two systems always see exactly the same cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CountState {
    pub simple: i32,
    pub complex: f64,
}

impl CountState {
    pub fn new() -> CountState {
        CountState::default()
    }

    /// Applies a newly visible card to both systems.
    pub fn reveal(&mut self, card: &Card) {
        self.simple += simple_delta(card);
        self.complex += complex_delta(card);
    }

    pub fn reveal_all<'a, I: IntoIterator<Item = &'a Card>>(&mut self, cards: I) {
        for card in cards {
            self.reveal(card);
        }
    }

    /// Running count of the chosen system.
    pub fn running(&self, strategy: CountingStrategy) -> f64 {
        match strategy {
            CountingStrategy::Simple => self.simple as f64,
            CountingStrategy::Complex => self.complex,
        }
    }

    /// Running count of `strategy` divided by decks remaining (never less than half a deck).
    /// Computed on demand from the cards left in the shoe, nothing is cached.
    pub fn true_count(&self, strategy: CountingStrategy, remaining_cards: usize) -> f64 {
        self.running(strategy) / decks_remaining(remaining_cards)
    }

    pub fn reset(&mut self) {
        self.simple = 0;
        self.complex = 0.0;
    }
}

impl Display for CountState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = "complex count:".len() + 2;
        write!(
            f,
            "{:<width$}{:>8}\n{:<width$}{:>8.1}",
            "simple count:", self.simple, "complex count:", self.complex,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blackjack_lib::{Shoe, Suit};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_simple_tags() {
        assert_eq!(simple_delta(&Card::new(Rank::Two, Suit::Hearts)), 1);
        assert_eq!(simple_delta(&Card::new(Rank::Six, Suit::Hearts)), 1);
        assert_eq!(simple_delta(&Card::new(Rank::Seven, Suit::Hearts)), 0);
        assert_eq!(simple_delta(&Card::new(Rank::Nine, Suit::Hearts)), 0);
        assert_eq!(simple_delta(&Card::new(Rank::Queen, Suit::Hearts)), -1);
        assert_eq!(simple_delta(&Card::new(Rank::Ace, Suit::Hearts)), -1);
    }

    #[test]
    fn test_complex_weights() {
        assert_eq!(complex_delta(&Card::new(Rank::Five, Suit::Spades)), 0.7);
        assert_eq!(complex_delta(&Card::new(Rank::Eight, Suit::Spades)), 0.0);
        assert_eq!(complex_delta(&Card::new(Rank::Nine, Suit::Spades)), -0.2);
        assert_eq!(complex_delta(&Card::new(Rank::King, Suit::Spades)), -0.6);
        assert_eq!(complex_delta(&Card::new(Rank::Ace, Suit::Spades)), -0.7);
    }

    #[test]
    fn test_simple_count_is_balanced_over_a_deck() {
        let mut shoe = Shoe::with_rng(1, &mut StdRng::seed_from_u64(3));
        let mut counts = CountState::new();
        while let Ok(card) = shoe.draw() {
            counts.reveal(&card);
        }
        assert_eq!(counts.simple, 0);
    }

    #[test]
    fn test_running_count_matches_sum_of_deltas() {
        let mut shoe = Shoe::with_rng(2, &mut StdRng::seed_from_u64(19));
        let mut counts = CountState::new();
        let mut revealed = Vec::new();
        for _ in 0..37 {
            let card = shoe.draw().unwrap();
            counts.reveal(&card);
            revealed.push(card);
        }
        let simple: i32 = revealed.iter().map(simple_delta).sum();
        let complex: f64 = revealed.iter().map(complex_delta).sum();
        assert_eq!(counts.simple, simple);
        assert!((counts.complex - complex).abs() < 1e-9);
    }

    #[test]
    fn test_true_count_normalizes_by_decks_remaining() {
        let counts = CountState {
            simple: 6,
            complex: -3.0,
        };
        assert_eq!(counts.true_count(CountingStrategy::Simple, 104), 3.0);
        assert_eq!(counts.true_count(CountingStrategy::Complex, 52), -3.0);
        // empty shoe floors at half a deck
        assert_eq!(counts.true_count(CountingStrategy::Simple, 0), 12.0);
    }

    #[test]
    fn test_reset() {
        let mut counts = CountState::new();
        counts.reveal(&Card::new(Rank::Four, Suit::Clubs));
        counts.reset();
        assert_eq!(counts, CountState::new());
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!("Complex".parse::<CountingStrategy>(), Ok(CountingStrategy::Complex));
        assert!("hilo".parse::<CountingStrategy>().is_err());
    }
}
