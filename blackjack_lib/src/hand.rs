use crate::card::Card;
use serde::{Deserialize, Serialize};

/// The evaluated total of a hand together with whether an ace is still counted as 11.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandValue {
    pub total: u8,
    pub soft: bool,
}

/// Evaluates `cards` using standard ace softening: every ace starts at 11 and, while the total is above 21,
/// one ace at a time drops to 1. If the hand still exceeds 21 with every ace at 1 the bust total is returned.
pub fn evaluate(cards: &[Card]) -> HandValue {
    let mut total: u32 = 0;
    let mut soft_aces = 0;

    for card in cards {
        total += card.value() as u32;
        if card.is_ace() {
            soft_aces += 1;
        }
    }

    while total > 21 && soft_aces > 0 {
        total -= 10;
        soft_aces -= 1;
    }

    HandValue {
        total: u8::try_from(total).unwrap_or(u8::MAX),
        soft: soft_aces > 0,
    }
}

/// Best blackjack total for `cards`.
pub fn hand_value(cards: &[Card]) -> u8 {
    evaluate(cards).total
}

/// An ordered sequence of cards held by the player or the dealer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Hand {
        Hand { cards: Vec::new() }
    }

    pub fn receive_card(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn evaluate(&self) -> HandValue {
        evaluate(&self.cards)
    }

    pub fn value(&self) -> u8 {
        hand_value(&self.cards)
    }

    pub fn is_soft(&self) -> bool {
        self.evaluate().soft
    }

    pub fn busted(&self) -> bool {
        self.value() > 21
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }
}

impl From<Vec<Card>> for Hand {
    fn from(cards: Vec<Card>) -> Hand {
        Hand { cards }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Rank, Suit};

    fn cards(ranks: &[Rank]) -> Vec<Card> {
        ranks.iter().map(|r| Card::new(*r, Suit::Clubs)).collect()
    }

    #[test]
    fn test_simple_total() {
        assert_eq!(hand_value(&cards(&[Rank::Two, Rank::Three])), 5);
        assert_eq!(hand_value(&cards(&[Rank::King, Rank::Queen])), 20);
    }

    #[test]
    fn test_pair_of_aces_is_twelve() {
        let value = evaluate(&cards(&[Rank::Ace, Rank::Ace]));
        assert_eq!(value.total, 12);
        assert!(value.soft);
    }

    #[test]
    fn test_soft_hand() {
        let value = evaluate(&cards(&[Rank::Ace, Rank::Six]));
        assert_eq!(value, HandValue { total: 17, soft: true });
    }

    #[test]
    fn test_hard_ace() {
        let value = evaluate(&cards(&[Rank::Ace, Rank::Six, Rank::Nine]));
        assert_eq!(value, HandValue { total: 16, soft: false });
    }

    #[test]
    fn test_multiple_aces_soften_one_at_a_time() {
        assert_eq!(hand_value(&cards(&[Rank::Ace, Rank::Ace, Rank::Nine])), 21);
        assert_eq!(
            hand_value(&cards(&[Rank::Ace, Rank::Ace, Rank::Ace, Rank::Ace])),
            14
        );
        assert_eq!(
            hand_value(&cards(&[Rank::Ace, Rank::Ace, Rank::Ace, Rank::Ace, Rank::King, Rank::Nine])),
            23
        );
    }

    #[test]
    fn test_bust_keeps_minimum_total() {
        let hand = Hand::from(cards(&[Rank::King, Rank::Queen, Rank::Five]));
        assert_eq!(hand.value(), 25);
        assert!(hand.busted());
        assert!(!hand.is_soft());
    }

    #[test]
    fn test_blackjack_total() {
        let mut hand = Hand::new();
        hand.receive_card(Card::new(Rank::Ace, Suit::Hearts));
        hand.receive_card(Card::new(Rank::Jack, Suit::Spades));
        assert_eq!(hand.value(), 21);
        assert_eq!(hand.len(), 2);
    }

    #[test]
    fn test_value_bounds_over_all_two_and_three_card_hands() {
        for a in Rank::ALL {
            for b in Rank::ALL {
                for c in Rank::ALL {
                    let hand = cards(&[a, b, c]);
                    let all_low: u32 = hand
                        .iter()
                        .map(|c| if c.is_ace() { 1 } else { c.value() as u32 })
                        .sum();
                    let total = hand_value(&hand) as u32;
                    assert!(total >= all_low);
                    if all_low <= 21 {
                        assert!(total <= 21);
                    } else {
                        assert_eq!(total, all_low);
                    }
                }
            }
        }
    }
}
