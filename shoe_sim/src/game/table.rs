use crate::game::agent::AgentSettings;
use crate::game::betting::BetRule;
use crate::game::count::{CountState, CountingStrategy};
use crate::game::history::{RunHistory, RunResult};
use crate::{GameError, TableConfig};
use blackjack_lib::{Card, Hand, Shoe};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tracing::{debug, info, warn};

/// The phase a round is in. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoundPhase {
    Betting,
    Playing,
    DealerTurn,
    GameOver,
    ShoeEnded,
}

impl Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RoundPhase::Betting => "betting",
            RoundPhase::Playing => "playing",
            RoundPhase::DealerTurn => "dealerTurn",
            RoundPhase::GameOver => "gameOver",
            RoundPhase::ShoeEnded => "shoeEnded",
        };
        write!(f, "{name}")
    }
}

/// How a round that reached the dealer was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoundOutcome {
    DealerBust,
    PlayerWins,
    TieAtTwentyOne,
    Push,
    DealerWins,
}

impl RoundOutcome {
    /// Amount credited back to the wallet for a stake of `bet`.
    pub fn credit(&self, bet: i64) -> i64 {
        match self {
            RoundOutcome::DealerBust | RoundOutcome::PlayerWins | RoundOutcome::TieAtTwentyOne => {
                bet.saturating_mul(2)
            }
            RoundOutcome::Push => bet,
            RoundOutcome::DealerWins => 0,
        }
    }
}

/// Result of a single tick of the dealer loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealerStep {
    Drew(Card),
    Resolved(RoundOutcome),
}

/// Credit for a two card 21: the stake back plus one and a half times the stake.
fn blackjack_credit(bet: i64) -> i64 {
    bet.saturating_add(bet.saturating_mul(3) / 2)
}

/// Settles a player total against a dealer total. Player busts never reach this point.
pub fn settle(player_total: u8, dealer_total: u8) -> RoundOutcome {
    if dealer_total > 21 {
        RoundOutcome::DealerBust
    } else if player_total > dealer_total {
        RoundOutcome::PlayerWins
    } else if player_total == dealer_total {
        if player_total == 21 {
            RoundOutcome::TieAtTwentyOne
        } else {
            RoundOutcome::Push
        }
    } else {
        RoundOutcome::DealerWins
    }
}

/// Both running counts together with the true counts derived from them when the snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CountView {
    pub simple: i32,
    pub complex: f64,
    pub simple_true: f64,
    pub complex_true: f64,
}

/// Everything an observer may see of the table. The dealer's hole card is `None` while it is concealed.
#[derive(Debug, Clone, Serialize)]
pub struct TableSnapshot {
    pub phase: RoundPhase,
    pub player_hand: Vec<Card>,
    pub player_total: u8,
    pub dealer_hand: Vec<Option<Card>>,
    pub dealer_total: Option<u8>,
    pub hole_card_hidden: bool,
    pub wallet: i64,
    pub bet: i64,
    pub counts: CountView,
    pub message: String,
    pub cards_remaining: usize,
    pub history: Vec<RunResult>,
    pub total_profit: i64,
    pub settings: AgentSettings,
}

/// The round state machine. Owns the shoe, both hands, the counts, the wallet and the phase,
/// and is the only place any of them change.
pub struct BlackjackTable {
    config: TableConfig,
    rng: StdRng,
    shoe: Shoe,
    player_hand: Hand,
    dealer_hand: Hand,
    hole_revealed: bool,
    counts: CountState,
    wallet: i64,
    bet: i64,
    phase: RoundPhase,
    message: String,
    shoe_start_balance: i64,
    history: RunHistory,
    settings: AgentSettings,
}

impl BlackjackTable {
    /// Associated method for building a new table, starts out hard reset with a fresh shoe.
    pub fn new(config: TableConfig) -> BlackjackTable {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let shoe = Shoe::with_rng(config.num_decks, &mut rng);
        let mut table = BlackjackTable {
            config,
            rng,
            shoe,
            player_hand: Hand::new(),
            dealer_hand: Hand::new(),
            hole_revealed: false,
            counts: CountState::new(),
            wallet: 0,
            bet: config.initial_bet,
            phase: RoundPhase::Betting,
            message: String::new(),
            shoe_start_balance: 0,
            history: RunHistory::new(),
            settings: AgentSettings::default(),
        };
        table.hard_reset();
        table
    }

    /// Rebuilds the shoe and zeroes counts, wallet and run history. The only operation that clears history.
    pub fn hard_reset(&mut self) {
        self.shoe = Shoe::with_rng(self.config.num_decks, &mut self.rng);
        self.counts.reset();
        self.clear_hands();
        self.wallet = 0;
        self.shoe_start_balance = 0;
        self.history.clear();
        self.bet = self.config.initial_bet;
        self.phase = RoundPhase::Betting;
        self.message = "Place your bet to start.".to_string();
        info!(decks = self.config.num_decks, "table hard reset");
    }

    /// Shuffles a new shoe and starts playing it.
    pub fn start_new_shoe(&mut self) -> Result<(), GameError> {
        let shoe = Shoe::with_rng(self.config.num_decks, &mut self.rng);
        self.start_shoe_with(shoe)
    }

    /// Starts playing `shoe`: counts go back to zero, hands are cleared and the current wallet becomes
    /// the balance the shoe's profit is measured against.
    pub fn start_shoe_with(&mut self, shoe: Shoe) -> Result<(), GameError> {
        self.ensure_between_rounds("start a new shoe")?;
        self.shoe = shoe;
        self.counts.reset();
        self.clear_hands();
        self.shoe_start_balance = self.wallet;
        self.phase = RoundPhase::Betting;
        self.message = format!("Shoe #{} Started", self.history.len() + 1);
        info!(
            shoe = self.history.len() + 1,
            cards = self.shoe.remaining(),
            wallet = self.wallet,
            "shoe started"
        );
        Ok(())
    }

    /// Ends the current shoe, recording its profit under `reason`.
    pub fn finish_shoe(&mut self, reason: &str) -> Result<&RunResult, GameError> {
        self.ensure_between_rounds("finish the shoe")?;
        let profit = self.wallet.saturating_sub(self.shoe_start_balance);
        self.phase = RoundPhase::ShoeEnded;
        self.message = reason.to_string();
        info!(profit, reason, "shoe finished");
        Ok(self.history.record(profit, reason))
    }

    /// Sets the bet for the next deal, clamped to between zero and the table maximum.
    pub fn set_bet(&mut self, amount: i64) -> Result<(), GameError> {
        self.ensure_between_rounds("change the bet")?;
        self.bet = amount.clamp(0, self.config.max_bet.max(0));
        Ok(())
    }

    /// Deals a round: player, dealer, player, dealer hole card. The hole card stays out of the count.
    /// When the shoe is too short the shoe ends as depleted instead and nothing is drawn.
    pub fn deal(&mut self) -> Result<(), GameError> {
        self.ensure_phase(RoundPhase::Betting, "deal")?;

        if self.shoe.remaining() < self.config.depletion_threshold.max(4) {
            self.finish_shoe("Deck Depleted")?;
            return Ok(());
        }

        self.clear_hands();
        let player_first = self.shoe.draw()?;
        let dealer_up = self.shoe.draw()?;
        let player_second = self.shoe.draw()?;
        let dealer_hole = self.shoe.draw()?;

        self.player_hand.receive_card(player_first);
        self.player_hand.receive_card(player_second);
        self.dealer_hand.receive_card(dealer_up);
        self.dealer_hand.receive_card(dealer_hole);

        self.wallet = self.wallet.saturating_sub(self.bet);
        self.phase = RoundPhase::Playing;
        self.message = "Player's Turn".to_string();
        self.counts
            .reveal_all([&player_first, &player_second, &dealer_up]);
        debug!(
            bet = self.bet,
            player = %player_first,
            player_second = %player_second,
            dealer_up = %dealer_up,
            "dealt"
        );

        if self.player_hand.value() == 21 {
            self.settle_blackjack();
        }
        Ok(())
    }

    /// A two card 21 is paid immediately. The player wins even when the dealer also holds 21.
    fn settle_blackjack(&mut self) {
        self.reveal_hole_card();
        self.wallet = self.wallet.saturating_add(blackjack_credit(self.bet));
        self.phase = RoundPhase::GameOver;
        self.message = if self.dealer_hand.value() == 21 {
            "Blackjack! You win (Tie 21)!".to_string()
        } else {
            "Blackjack! You win!".to_string()
        };
        debug!(wallet = self.wallet, "player blackjack");
    }

    /// Draws one card for the player. A bust ends the round as a loss.
    pub fn hit(&mut self) -> Result<(), GameError> {
        self.ensure_phase(RoundPhase::Playing, "hit")?;
        let card = self.draw_player_card()?;
        debug!(card = %card, total = self.player_hand.value(), "player hits");
        if self.player_hand.busted() {
            self.player_busts();
        }
        Ok(())
    }

    /// Ends the player's turn and flips the hole card.
    pub fn stand(&mut self) -> Result<(), GameError> {
        self.ensure_phase(RoundPhase::Playing, "stand")?;
        self.begin_dealer_turn();
        Ok(())
    }

    /// Doubles the stake, draws exactly one card and ends the player's turn.
    pub fn double(&mut self) -> Result<(), GameError> {
        self.ensure_phase(RoundPhase::Playing, "double")?;
        if self.player_hand.len() != 2 {
            return Err(GameError::DoubleNotAllowed {
                cards: self.player_hand.len(),
            });
        }

        let card = self.draw_player_card()?;
        self.wallet = self.wallet.saturating_sub(self.bet);
        self.bet = self.bet.saturating_mul(2);
        debug!(card = %card, bet = self.bet, total = self.player_hand.value(), "player doubles");

        if self.player_hand.busted() {
            self.player_busts();
        } else {
            self.begin_dealer_turn();
        }
        Ok(())
    }

    /// One tick of the dealer loop: below the stand threshold the dealer draws, otherwise the round resolves.
    /// An exhausted shoe makes the dealer stand on the current total.
    pub fn dealer_step(&mut self) -> Result<DealerStep, GameError> {
        self.ensure_phase(RoundPhase::DealerTurn, "play the dealer")?;
        let wants_card = self.dealer_hand.value() < self.config.dealer_stands_on;
        if wants_card && self.shoe.is_empty() {
            warn!(total = self.dealer_hand.value(), "shoe exhausted, dealer stands");
        } else if wants_card {
            let card = self.shoe.draw()?;
            self.counts.reveal(&card);
            self.dealer_hand.receive_card(card);
            debug!(card = %card, total = self.dealer_hand.value(), "dealer draws");
            return Ok(DealerStep::Drew(card));
        }
        Ok(DealerStep::Resolved(self.resolve()))
    }

    /// Runs the dealer loop to completion without pacing.
    pub fn play_out_dealer(&mut self) -> Result<RoundOutcome, GameError> {
        loop {
            if let DealerStep::Resolved(outcome) = self.dealer_step()? {
                return Ok(outcome);
            }
        }
    }

    fn resolve(&mut self) -> RoundOutcome {
        let player = self.player_hand.value();
        let dealer = self.dealer_hand.value();
        let outcome = settle(player, dealer);
        self.wallet = self.wallet.saturating_add(outcome.credit(self.bet));
        self.message = match outcome {
            RoundOutcome::DealerBust => "Dealer Busts! You Win!".to_string(),
            RoundOutcome::PlayerWins => format!("You Win! ({player} vs {dealer})"),
            RoundOutcome::TieAtTwentyOne => "You Win! (Tie at 21)".to_string(),
            RoundOutcome::Push => format!("Push. ({dealer} vs {player})"),
            RoundOutcome::DealerWins => format!("Dealer Wins. ({dealer} vs {player})"),
        };
        self.phase = RoundPhase::GameOver;
        debug!(?outcome, player, dealer, wallet = self.wallet, "round resolved");
        outcome
    }

    /// Clears the finished round and returns to betting. Wallet, shoe and counts carry over.
    pub fn next_round(&mut self) -> Result<(), GameError> {
        self.ensure_phase(RoundPhase::GameOver, "start the next round")?;
        self.clear_hands();
        self.phase = RoundPhase::Betting;
        self.message = "Place your bet!".to_string();
        Ok(())
    }

    fn draw_player_card(&mut self) -> Result<Card, GameError> {
        let card = self.shoe.draw()?;
        self.counts.reveal(&card);
        self.player_hand.receive_card(card);
        Ok(card)
    }

    fn player_busts(&mut self) {
        self.reveal_hole_card();
        self.phase = RoundPhase::GameOver;
        self.message = "Bust! You lose.".to_string();
        debug!(total = self.player_hand.value(), "player busts");
    }

    fn begin_dealer_turn(&mut self) {
        self.reveal_hole_card();
        self.phase = RoundPhase::DealerTurn;
        self.message = "Dealer's Turn".to_string();
    }

    /// Counts the hole card the first time it becomes visible, and never again.
    fn reveal_hole_card(&mut self) {
        if self.hole_revealed {
            return;
        }
        if let Some(hole) = self.dealer_hand.cards().get(1) {
            self.counts.reveal(hole);
            self.hole_revealed = true;
        }
    }

    fn clear_hands(&mut self) {
        self.player_hand.clear();
        self.dealer_hand.clear();
        self.hole_revealed = false;
    }

    fn ensure_phase(&self, expected: RoundPhase, action: &'static str) -> Result<(), GameError> {
        if self.phase != expected {
            return Err(GameError::IllegalAction {
                action,
                phase: self.phase,
            });
        }
        Ok(())
    }

    /// Shoe level changes and bet changes are refused while a hand is in progress.
    fn ensure_between_rounds(&self, action: &'static str) -> Result<(), GameError> {
        match self.phase {
            RoundPhase::Playing | RoundPhase::DealerTurn => Err(GameError::IllegalAction {
                action,
                phase: self.phase,
            }),
            _ => Ok(()),
        }
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    pub fn set_auto_play(&mut self, on: bool) {
        self.settings.auto_play = on;
    }

    pub fn set_counting_strategy(&mut self, strategy: CountingStrategy) {
        self.settings.counting_strategy = strategy;
    }

    /// Replaces the bet rules after checking every rule.
    pub fn set_bet_rules(&mut self, rules: Vec<BetRule>) -> Result<(), GameError> {
        for rule in &rules {
            rule.validate()?;
        }
        self.settings.rules = rules;
        Ok(())
    }

    pub fn set_target_shoes(&mut self, shoes: usize) -> Result<(), GameError> {
        if shoes == 0 {
            return Err(GameError::InvalidSetting(
                "target shoe count must be at least 1".to_string(),
            ));
        }
        self.settings.target_shoes = shoes;
        Ok(())
    }

    pub fn set_exit_threshold(&mut self, threshold: f64) -> Result<(), GameError> {
        if threshold.is_nan() {
            return Err(GameError::InvalidSetting(
                "exit threshold must be a number".to_string(),
            ));
        }
        self.settings.exit_threshold = threshold;
        Ok(())
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn wallet(&self) -> i64 {
        self.wallet
    }

    pub fn bet(&self) -> i64 {
        self.bet
    }

    pub fn counts(&self) -> &CountState {
        &self.counts
    }

    /// True count of `strategy` against the cards left in the shoe.
    pub fn true_count(&self, strategy: CountingStrategy) -> f64 {
        self.counts.true_count(strategy, self.shoe.remaining())
    }

    pub fn decks_remaining(&self) -> f64 {
        self.shoe.decks_remaining()
    }

    pub fn cards_remaining(&self) -> usize {
        self.shoe.remaining()
    }

    pub fn player_hand(&self) -> &Hand {
        &self.player_hand
    }

    /// The dealer's full hand, including a hole card that may still be concealed from observers.
    pub fn dealer_hand(&self) -> &Hand {
        &self.dealer_hand
    }

    /// The dealer's up card, if a round has been dealt.
    pub fn dealer_up_card(&self) -> Option<&Card> {
        self.dealer_hand.cards().first()
    }

    /// The hole card is concealed for as long as the player is acting.
    pub fn hole_card_hidden(&self) -> bool {
        self.phase == RoundPhase::Playing
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn history(&self) -> &RunHistory {
        &self.history
    }

    pub fn total_profit(&self) -> i64 {
        self.history.total_profit()
    }

    pub fn snapshot(&self) -> TableSnapshot {
        let hidden = self.hole_card_hidden();
        let dealer_hand = self
            .dealer_hand
            .cards()
            .iter()
            .enumerate()
            .map(|(i, card)| if hidden && i == 1 { None } else { Some(*card) })
            .collect();
        let dealer_total = if hidden || self.dealer_hand.is_empty() {
            None
        } else {
            Some(self.dealer_hand.value())
        };

        TableSnapshot {
            phase: self.phase,
            player_hand: self.player_hand.cards().to_vec(),
            player_total: self.player_hand.value(),
            dealer_hand,
            dealer_total,
            hole_card_hidden: hidden,
            wallet: self.wallet,
            bet: self.bet,
            counts: CountView {
                simple: self.counts.simple,
                complex: self.counts.complex,
                simple_true: self.true_count(CountingStrategy::Simple),
                complex_true: self.true_count(CountingStrategy::Complex),
            },
            message: self.message.clone(),
            cards_remaining: self.shoe.remaining(),
            history: self.history.runs().to_vec(),
            total_profit: self.history.total_profit(),
            settings: self.settings.clone(),
        }
    }
}
