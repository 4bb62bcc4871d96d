use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// The outcome of one completed shoe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub id: usize,
    /// Wallet change over the shoe.
    pub profit: i64,
    pub reason: String,
    pub timestamp: DateTime<Local>,
}

/// Append-only record of completed shoes. Only a hard reset clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunHistory {
    runs: Vec<RunResult>,
}

impl RunHistory {
    pub fn new() -> RunHistory {
        RunHistory { runs: Vec::new() }
    }

    /// Records a finished shoe, numbering it after the shoes already recorded.
    pub fn record(&mut self, profit: i64, reason: impl Into<String>) -> &RunResult {
        let id = self.runs.len() + 1;
        self.runs.push(RunResult {
            id,
            profit,
            reason: reason.into(),
            timestamp: Local::now(),
        });
        &self.runs[id - 1]
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn runs(&self) -> &[RunResult] {
        &self.runs
    }

    pub fn last(&self) -> Option<&RunResult> {
        self.runs.last()
    }

    /// Sum of the profit of every recorded shoe.
    pub fn total_profit(&self) -> i64 {
        self.runs.iter().map(|run| run.profit).sum()
    }

    pub(crate) fn clear(&mut self) {
        self.runs.clear();
    }
}
