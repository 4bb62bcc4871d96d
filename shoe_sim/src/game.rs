//! Module that holds everything needed to play a shoe of blackjack: the counting, decision and betting engines,
//! the round state machine that sequences them, and the agent that can drive the table on its own.

pub mod agent;
pub mod betting;
pub mod count;
pub mod history;
pub mod strategy;
pub mod table;

pub mod prelude {
    pub use super::agent::{Agent, AgentAction, AgentSettings, Autopilot, SharedTable};
    pub use super::betting::{decide_wager, default_rules, should_exit, BetRule, Comparison};
    pub use super::count::{CountState, CountingStrategy};
    pub use super::history::{RunHistory, RunResult};
    pub use super::strategy::{recommend, Move};
    pub use super::table::{BlackjackTable, DealerStep, RoundOutcome, RoundPhase, TableSnapshot};
    pub use blackjack_lib::{Card, Hand, Rank, Shoe, Suit};
}
