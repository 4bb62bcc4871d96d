use crate::card::{Card, Rank, Suit};
use crate::ShoeError;
use rand::seq::SliceRandom;
use rand::Rng;

/// Number of cards in a single standard deck.
pub const CARDS_PER_DECK: usize = 52;

/// The shoe cards are drawn from. Cards are stored so that the top of the shoe is the end of the vector,
/// which keeps `draw` and `remaining` O(1).
#[derive(Debug, Clone)]
pub struct Shoe {
    cards: Vec<Card>,
}

impl Shoe {
    /// Associated method for building a freshly shuffled shoe of `num_decks` decks using the thread local rng.
    pub fn new(num_decks: usize) -> Shoe {
        Shoe::with_rng(num_decks, &mut rand::thread_rng())
    }

    /// Builds `52 * num_decks` cards and applies a uniform Fisher-Yates permutation drawn from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(num_decks: usize, rng: &mut R) -> Shoe {
        let mut cards = Vec::with_capacity(CARDS_PER_DECK * num_decks);
        for _ in 0..num_decks {
            for suit in Suit::ALL {
                for rank in Rank::ALL {
                    cards.push(Card::new(rank, suit));
                }
            }
        }
        cards.shuffle(rng);
        Shoe { cards }
    }

    /// Builds a shoe with a prearranged order, `cards[0]` is the first card drawn.
    pub fn from_cards<I: IntoIterator<Item = Card>>(cards: I) -> Shoe {
        let mut cards: Vec<Card> = cards.into_iter().collect();
        cards.reverse();
        Shoe { cards }
    }

    /// Removes and returns the top card of the shoe.
    pub fn draw(&mut self) -> Result<Card, ShoeError> {
        self.cards.pop().ok_or(ShoeError::Empty)
    }

    /// Number of cards left in the shoe.
    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Estimated decks left, floored at half a deck so a nearly empty shoe never blows up a true count.
    pub fn decks_remaining(&self) -> f64 {
        decks_remaining(self.cards.len())
    }

    /// Peek at the cards left in draw order, intended for tests and debugging.
    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter().rev()
    }
}

/// Converts a remaining card count into decks remaining, with a floor of 0.5 decks.
pub fn decks_remaining(remaining_cards: usize) -> f64 {
    f64::max(0.5, remaining_cards as f64 / CARDS_PER_DECK as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn test_shoe_contains_every_card_per_deck() {
        let mut rng = StdRng::seed_from_u64(7);
        let shoe = Shoe::with_rng(2, &mut rng);
        assert_eq!(shoe.remaining(), 104);

        let mut counts: HashMap<Card, usize> = HashMap::new();
        for card in shoe.iter() {
            *counts.entry(*card).or_insert(0) += 1;
        }
        assert_eq!(counts.len(), 52);
        assert!(counts.values().all(|n| *n == 2));
    }

    #[test]
    fn test_shuffles_are_independent() {
        let mut rng = StdRng::seed_from_u64(11);
        let first: Vec<Card> = Shoe::with_rng(1, &mut rng).iter().copied().collect();
        let second: Vec<Card> = Shoe::with_rng(1, &mut rng).iter().copied().collect();
        assert_ne!(first, second);
    }

    #[test]
    fn test_draw_from_prearranged_shoe() {
        let mut shoe = Shoe::from_cards(vec![
            Card::new(Rank::Ace, Suit::Spades),
            Card::new(Rank::Two, Suit::Hearts),
        ]);
        assert_eq!(shoe.draw().unwrap(), Card::new(Rank::Ace, Suit::Spades));
        assert_eq!(shoe.remaining(), 1);
        assert_eq!(shoe.draw().unwrap(), Card::new(Rank::Two, Suit::Hearts));
        assert!(shoe.is_empty());
    }

    #[test]
    fn test_draw_from_empty_shoe_fails() {
        let mut shoe = Shoe::from_cards(Vec::new());
        assert_eq!(shoe.draw(), Err(ShoeError::Empty));
    }

    #[test]
    fn test_decks_remaining_has_floor() {
        assert_eq!(decks_remaining(104), 2.0);
        assert_eq!(decks_remaining(52), 1.0);
        assert_eq!(decks_remaining(13), 0.5);
        assert_eq!(decks_remaining(0), 0.5);
    }
}
