//! Card primitives shared by the blackjack simulation crates: cards, the shoe they are drawn from,
//! and hand evaluation.

pub mod card;
pub mod hand;
pub mod shoe;

pub use card::{Card, Rank, Suit};
pub use hand::{evaluate, hand_value, Hand, HandValue};
pub use shoe::{decks_remaining, Shoe, CARDS_PER_DECK};

use thiserror::Error;

/// Errors raised by the shoe. Drawing from an empty shoe is the only failure a shoe can produce.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShoeError {
    #[error("cannot draw from an empty shoe")]
    Empty,
}
