//! The autonomous player. `Agent` decides one action at a time from the table's committed state,
//! `Autopilot` paces those actions on a background thread until it is stopped or every requested shoe is played.

use crate::game::betting::{decide_wager, default_rules, should_exit, BetRule};
use crate::game::count::CountingStrategy;
use crate::game::strategy::{double_fallback, recommend, Move};
use crate::game::table::{BlackjackTable, RoundPhase};
use crate::GameError;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A table shared between the autopilot thread and whoever else observes or commands it.
pub type SharedTable = Arc<Mutex<BlackjackTable>>;

/// Settings the agent reads from the table each time one of its actions fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub auto_play: bool,
    pub counting_strategy: CountingStrategy,
    /// Ordered bet rules, the first that holds picks the wager.
    pub rules: Vec<BetRule>,
    pub target_shoes: usize,
    /// The shoe is abandoned once the active true count drops below this.
    pub exit_threshold: f64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        AgentSettings {
            auto_play: false,
            counting_strategy: CountingStrategy::Simple,
            rules: default_rules(),
            target_shoes: 1,
            exit_threshold: -100.0,
        }
    }
}

/// One step the agent takes against the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AgentAction {
    StartShoe,
    Finish,
    AnnounceWongOut(f64),
    WongOut(f64),
    Deal(i64),
    Play(Move),
    DealerStep,
    NextRound,
}

#[derive(Debug, Default)]
pub struct Agent {
    /// True count at which a wong-out was announced but not yet carried out.
    pending_exit: Option<f64>,
}

impl Agent {
    pub fn new() -> Agent {
        Agent::default()
    }

    /// How long to wait before acting on the table in its current phase.
    pub fn delay(&self, table: &BlackjackTable) -> Duration {
        let config = table.config();
        match table.phase() {
            RoundPhase::ShoeEnded => config.shoe_delay(),
            RoundPhase::Betting if self.pending_exit.is_some() => config.wong_out_delay(),
            RoundPhase::Betting => config.think_delay(),
            RoundPhase::Playing => config.play_delay(),
            RoundPhase::DealerTurn => config.dealer_delay(),
            RoundPhase::GameOver => config.round_delay(),
        }
    }

    /// Picks the next action from the table as it is right now.
    pub fn decide(&self, table: &BlackjackTable) -> AgentAction {
        let settings = table.settings();
        match table.phase() {
            RoundPhase::ShoeEnded => {
                if table.history().len() < settings.target_shoes {
                    AgentAction::StartShoe
                } else {
                    AgentAction::Finish
                }
            }
            RoundPhase::Betting => {
                if let Some(true_count) = self.pending_exit {
                    return AgentAction::WongOut(true_count);
                }
                let strategy = settings.counting_strategy;
                let true_count = table.true_count(strategy);
                if should_exit(true_count, settings.exit_threshold) {
                    return AgentAction::AnnounceWongOut(true_count);
                }
                let wager = decide_wager(
                    table.counts(),
                    table.decks_remaining(),
                    &settings.rules,
                    strategy,
                    table.config().default_wager,
                );
                AgentAction::Deal(table.config().clamp_bet(wager))
            }
            RoundPhase::Playing => AgentAction::Play(choose_move(table)),
            RoundPhase::DealerTurn => AgentAction::DealerStep,
            RoundPhase::GameOver => AgentAction::NextRound,
        }
    }

    /// Decides and applies a single action, returning what was done.
    pub fn act(&mut self, table: &mut BlackjackTable) -> Result<AgentAction, GameError> {
        let action = self.decide(table);
        match action {
            AgentAction::StartShoe => table.start_new_shoe()?,
            AgentAction::Finish => {
                table.set_auto_play(false);
                table.set_message("AI Finished all requested runs.");
                info!(shoes = table.history().len(), total_profit = table.total_profit(), "agent finished");
            }
            AgentAction::AnnounceWongOut(true_count) => {
                self.pending_exit = Some(true_count);
                table.set_message("Wonging Out...");
                info!(true_count, "wonging out");
            }
            AgentAction::WongOut(true_count) => {
                self.pending_exit = None;
                table.finish_shoe(&format!("Wong Out (TC: {true_count:.1})"))?;
            }
            AgentAction::Deal(wager) => {
                table.set_bet(wager)?;
                table.deal()?;
            }
            AgentAction::Play(Move::Hit) => table.hit()?,
            AgentAction::Play(Move::Stand) => table.stand()?,
            AgentAction::Play(Move::Double) => table.double()?,
            AgentAction::DealerStep => {
                table.dealer_step()?;
            }
            AgentAction::NextRound => {
                table.next_round()?;
                table.set_message("Next round...");
            }
        }
        debug!(?action, phase = %table.phase(), "agent acted");
        Ok(action)
    }

    /// Drops a wong-out that was announced in a phase the table has since left.
    fn forget_pending(&mut self) {
        self.pending_exit = None;
    }
}

/// Plays the engine's recommendation at the simple true count, doubling only on a two card hand.
/// With nothing left to draw the only playable move is a stand.
fn choose_move(table: &BlackjackTable) -> Move {
    if table.cards_remaining() == 0 {
        return Move::Stand;
    }
    let hand = table.player_hand().cards();
    let up_card = match table.dealer_up_card() {
        Some(card) => card,
        None => return Move::Stand,
    };
    let true_count = table.true_count(CountingStrategy::Simple);
    match recommend(hand, up_card, true_count) {
        Move::Double if hand.len() != 2 => double_fallback(hand),
        other => other,
    }
}

/// Handle to an agent running on its own thread.
pub struct Autopilot {
    stop: Sender<()>,
    handle: JoinHandle<Result<(), GameError>>,
}

impl Autopilot {
    /// Turns auto-play on and starts driving `table` from a new thread.
    pub fn spawn(table: SharedTable) -> Result<Autopilot, GameError> {
        {
            let mut guard = table.lock().map_err(|_| GameError::Poisoned)?;
            guard.set_auto_play(true);
            info!(
                target_shoes = guard.settings().target_shoes,
                strategy = %guard.settings().counting_strategy,
                "autopilot started"
            );
        }
        let (stop, stop_receiver) = mpsc::channel::<()>();
        let handle = thread::spawn(move || drive(table, stop_receiver));
        Ok(Autopilot { stop, handle })
    }

    /// Cancels any pending action and waits for the thread to exit.
    pub fn stop(self) -> Result<(), GameError> {
        // the thread may already have exited and dropped its receiver
        let _ = self.stop.send(());
        self.join()
    }

    /// Waits for the agent to finish on its own.
    pub fn join(self) -> Result<(), GameError> {
        self.handle.join().map_err(|_| GameError::AgentPanicked)?
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// The autopilot loop. Each action is planned under the lock, the lock is released for the pacing wait,
/// and the phase is checked again once the wait is over so a stale action is never fired.
fn drive(table: SharedTable, stop: mpsc::Receiver<()>) -> Result<(), GameError> {
    let mut agent = Agent::new();
    loop {
        let (planned_phase, delay) = {
            let guard = table.lock().map_err(|_| GameError::Poisoned)?;
            if !guard.settings().auto_play {
                info!("autopilot stopped");
                return Ok(());
            }
            (guard.phase(), agent.delay(&guard))
        };

        match stop.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                let mut guard = table.lock().map_err(|_| GameError::Poisoned)?;
                guard.set_auto_play(false);
                info!(phase = %guard.phase(), "autopilot stopped");
                return Ok(());
            }
        }

        let mut guard = table.lock().map_err(|_| GameError::Poisoned)?;
        if !guard.settings().auto_play {
            info!("autopilot stopped");
            return Ok(());
        }
        if guard.phase() != planned_phase {
            debug!(planned = %planned_phase, current = %guard.phase(), "phase changed, replanning");
            agent.forget_pending();
            continue;
        }
        if let Err(e) = agent.act(&mut guard) {
            warn!(error = %e, "autopilot halted");
            guard.set_auto_play(false);
            guard.set_message(format!("AI stopped: {e}"));
            return Err(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TableConfig;
    use blackjack_lib::{Card, Rank, Shoe, Suit};

    fn stacked(ranks: &[Rank]) -> BlackjackTable {
        let mut cards: Vec<Card> = ranks.iter().map(|r| Card::new(*r, Suit::Clubs)).collect();
        while cards.len() < 26 {
            cards.push(Card::new(Rank::Eight, Suit::Clubs));
        }
        let mut table = BlackjackTable::new(TableConfig::instant());
        table.start_shoe_with(Shoe::from_cards(cards)).unwrap();
        table
    }

    fn shared(table: BlackjackTable) -> SharedTable {
        Arc::new(Mutex::new(table))
    }

    #[test]
    fn test_default_settings() {
        let settings = AgentSettings::default();
        assert!(!settings.auto_play);
        assert_eq!(settings.target_shoes, 1);
        assert_eq!(settings.exit_threshold, -100.0);
        assert_eq!(settings.rules, default_rules());
    }

    #[test]
    fn test_bets_by_rules_and_clamps() {
        let table = BlackjackTable::new(TableConfig::instant());
        assert_eq!(Agent::new().decide(&table), AgentAction::Deal(1_000));

        let mut table = BlackjackTable::new(TableConfig::new().min_bet(2_000).no_delays().build());
        table.set_bet_rules(vec![]).unwrap();
        assert_eq!(Agent::new().decide(&table), AgentAction::Deal(2_000));
    }

    #[test]
    fn test_plays_deviation_from_simple_count() {
        // player 10 + 6 against a dealer 10; the two tens and the six leave the simple count at -1
        let mut table = stacked(&[Rank::Ten, Rank::King, Rank::Six, Rank::Five]);
        table.set_counting_strategy(CountingStrategy::Complex);
        table.deal().unwrap();
        assert!(table.true_count(CountingStrategy::Simple) < 0.0);
        assert_eq!(Agent::new().decide(&table), AgentAction::Play(Move::Hit));
    }

    #[test]
    fn test_three_card_double_falls_back() {
        // 2 + 3 hits a 6 for a three card 11 against a dealer 10
        let mut table = stacked(&[Rank::Two, Rank::Ten, Rank::Three, Rank::Seven, Rank::Six]);
        table.deal().unwrap();
        table.hit().unwrap();
        assert_eq!(table.player_hand().value(), 11);
        assert_eq!(Agent::new().decide(&table), AgentAction::Play(Move::Hit));
    }

    #[test]
    fn test_stands_on_exhausted_shoe() {
        let mut table = BlackjackTable::new(TableConfig::new().depletion_threshold(4).no_delays().build());
        let cards = [Rank::Ten, Rank::Ten, Rank::Two, Rank::Six].map(|r| Card::new(r, Suit::Clubs));
        table.start_shoe_with(Shoe::from_cards(cards)).unwrap();
        table.deal().unwrap();

        let mut agent = Agent::new();
        assert_eq!(agent.act(&mut table).unwrap(), AgentAction::Play(Move::Stand));
        assert_eq!(agent.act(&mut table).unwrap(), AgentAction::DealerStep);
        assert_eq!(table.phase(), RoundPhase::GameOver);
        assert_eq!(table.wallet(), -1_000);
    }

    #[test]
    fn test_wong_out_is_announced_then_carried_out() {
        let mut table = BlackjackTable::new(TableConfig::instant());
        table.set_exit_threshold(1.0).unwrap();
        let mut agent = Agent::new();

        assert_eq!(agent.act(&mut table).unwrap(), AgentAction::AnnounceWongOut(0.0));
        assert_eq!(table.message(), "Wonging Out...");
        assert_eq!(agent.delay(&table), table.config().wong_out_delay());

        assert_eq!(agent.act(&mut table).unwrap(), AgentAction::WongOut(0.0));
        assert_eq!(table.phase(), RoundPhase::ShoeEnded);
        assert_eq!(table.history().runs()[0].reason, "Wong Out (TC: 0.0)");
        assert_eq!(agent.decide(&table), AgentAction::Finish);
    }

    #[test]
    fn test_delays_follow_phase() {
        let config = TableConfig::default();
        let table = BlackjackTable::new(config);
        assert_eq!(Agent::new().delay(&table), config.think_delay());
    }

    #[test]
    fn test_autopilot_plays_requested_shoes() {
        let mut table = BlackjackTable::new(TableConfig::new().seed(7).no_delays().build());
        table.set_target_shoes(2).unwrap();
        let table = shared(table);

        Autopilot::spawn(table.clone()).unwrap().join().unwrap();

        let table = table.lock().unwrap();
        assert_eq!(table.history().len(), 2);
        assert!(!table.settings().auto_play);
        assert_eq!(table.message(), "AI Finished all requested runs.");
        assert_eq!(table.phase(), RoundPhase::ShoeEnded);
        assert!(table
            .history()
            .runs()
            .iter()
            .all(|run| run.reason == "Deck Depleted"));
    }

    #[test]
    fn test_autopilot_wongs_out_without_drawing() {
        let mut table = BlackjackTable::new(TableConfig::new().seed(3).no_delays().build());
        table.set_exit_threshold(100.0).unwrap();
        let table = shared(table);

        Autopilot::spawn(table.clone()).unwrap().join().unwrap();

        let table = table.lock().unwrap();
        assert_eq!(table.history().len(), 1);
        assert!(table.history().runs()[0].reason.starts_with("Wong Out (TC: "));
        assert_eq!(table.cards_remaining(), 104);
    }

    #[test]
    fn test_stop_lands_before_pending_action() {
        let table = shared(BlackjackTable::new(TableConfig::new().think_delay_ms(60_000).build()));
        let autopilot = Autopilot::spawn(table.clone()).unwrap();
        autopilot.stop().unwrap();

        let table = table.lock().unwrap();
        assert!(!table.settings().auto_play);
        assert_eq!(table.phase(), RoundPhase::Betting);
        assert_eq!(table.cards_remaining(), 104);
        assert_eq!(table.wallet(), 0);
    }
}
