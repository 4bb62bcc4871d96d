//! Playing decisions: count based deviations checked first, then the basic strategy lookup tables.

use blackjack_lib::{evaluate, Card};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;

/// The actions the decision engine can recommend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Hit,
    Stand,
    Double,
}

impl Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Move::Hit => write!(f, "hit"),
            Move::Stand => write!(f, "stand"),
            Move::Double => write!(f, "double"),
        }
    }
}

/// Whether a rule applies to hard or soft totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hardness {
    Hard,
    Soft,
}

/// A count conditioned override of basic strategy: `total` against any of `dealer` switches to `action`
/// once the true count reaches `min_true_count`.
#[derive(Debug, Clone, Copy)]
pub struct Deviation {
    pub hardness: Hardness,
    pub total: u8,
    pub dealer: &'static [u8],
    pub min_true_count: f64,
    pub action: Move,
}

impl Deviation {
    pub fn matches(&self, hardness: Hardness, total: u8, dealer: u8, true_count: f64) -> bool {
        self.hardness == hardness
            && self.total == total
            && self.dealer.contains(&dealer)
            && true_count >= self.min_true_count
    }
}

/// Deviations in priority order, the first match wins.
pub const DEVIATIONS: &[Deviation] = &[
    Deviation { hardness: Hardness::Hard, total: 16, dealer: &[10], min_true_count: 0.0, action: Move::Stand },
    Deviation { hardness: Hardness::Hard, total: 15, dealer: &[10], min_true_count: 4.0, action: Move::Stand },
    Deviation { hardness: Hardness::Hard, total: 12, dealer: &[3], min_true_count: 2.0, action: Move::Stand },
    Deviation { hardness: Hardness::Hard, total: 12, dealer: &[2], min_true_count: 3.0, action: Move::Stand },
    Deviation { hardness: Hardness::Hard, total: 10, dealer: &[10, 11], min_true_count: 4.0, action: Move::Double },
    Deviation { hardness: Hardness::Hard, total: 9, dealer: &[2], min_true_count: 1.0, action: Move::Double },
    Deviation { hardness: Hardness::Hard, total: 9, dealer: &[7], min_true_count: 3.0, action: Move::Double },
];

lazy_static! {
    static ref HARD_TOTALS: HashMap<(u8, u8), Move> = build_hard_totals();
    static ref SOFT_TOTALS: HashMap<(u8, u8), Move> = build_soft_totals();
}

/// Populates the hard totals lookup table keyed on (player total, dealer up-card value).
fn build_hard_totals() -> HashMap<(u8, u8), Move> {
    let mut hard_totals = HashMap::new();
    for i in 4..=21u8 {
        for j in 2..=11u8 {
            let option = match i {
                17..=21 => Move::Stand,
                13..=16 => match j {
                    2..=6 => Move::Stand,
                    _ => Move::Hit,
                },
                12 => match j {
                    4..=6 => Move::Stand,
                    _ => Move::Hit,
                },
                11 => Move::Double,
                10 => match j {
                    2..=9 => Move::Double,
                    _ => Move::Hit,
                },
                9 => match j {
                    3..=6 => Move::Double,
                    _ => Move::Hit,
                },
                _ => Move::Hit,
            };
            hard_totals.insert((i, j), option);
        }
    }
    hard_totals
}

/// Populates the soft totals lookup table, i.e. hands with an ace still counted as 11.
fn build_soft_totals() -> HashMap<(u8, u8), Move> {
    let mut soft_totals = HashMap::new();
    for i in 12..=21u8 {
        for j in 2..=11u8 {
            let option = match i {
                20 | 21 => Move::Stand,
                19 => Move::Stand,
                18 => match j {
                    2..=6 => Move::Double,
                    7 | 8 => Move::Stand,
                    _ => Move::Hit,
                },
                17 => match j {
                    3..=6 => Move::Double,
                    _ => Move::Hit,
                },
                15 | 16 => match j {
                    4..=6 => Move::Double,
                    _ => Move::Hit,
                },
                13 | 14 => match j {
                    5 | 6 => Move::Double,
                    _ => Move::Hit,
                },
                _ => Move::Hit,
            };
            soft_totals.insert((i, j), option);
        }
    }
    soft_totals
}

/// Recommends a move for `hand` against the dealer's `up_card` at `true_count`.
///
/// Hard hands first consult the deviation list, then every hand falls through to the basic strategy
/// tables. The function is total: anything the tables do not cover is a hit. It may recommend a double
/// on a hand of more than two cards, the caller decides whether a double can be honored.
pub fn recommend(hand: &[Card], up_card: &Card, true_count: f64) -> Move {
    let value = evaluate(hand);
    let hardness = if value.soft {
        Hardness::Soft
    } else {
        Hardness::Hard
    };
    let dealer = up_card.value();

    if hardness == Hardness::Hard {
        if let Some(deviation) = first_deviation(hardness, value.total, dealer, true_count) {
            return deviation.action;
        }
    }

    basic_strategy(hardness, value.total, dealer, true_count)
}

fn first_deviation(hardness: Hardness, total: u8, dealer: u8, true_count: f64) -> Option<&'static Deviation> {
    DEVIATIONS
        .iter()
        .find(|d| d.matches(hardness, total, dealer, true_count))
}

/// Basic strategy lookup. Soft 19 against a 6 doubles at a non-negative count, otherwise the tables decide.
fn basic_strategy(hardness: Hardness, total: u8, dealer: u8, true_count: f64) -> Move {
    match hardness {
        Hardness::Hard => HARD_TOTALS.get(&(total, dealer)).copied().unwrap_or(Move::Hit),
        Hardness::Soft => {
            if total == 19 && dealer == 6 && true_count >= 0.0 {
                return Move::Double;
            }
            SOFT_TOTALS.get(&(total, dealer)).copied().unwrap_or(Move::Hit)
        }
    }
}

/// What to play when `Move::Double` was recommended but the hand no longer holds exactly two cards.
pub fn double_fallback(hand: &[Card]) -> Move {
    let value = evaluate(hand);
    if value.soft && value.total >= 18 {
        Move::Stand
    } else {
        Move::Hit
    }
}
