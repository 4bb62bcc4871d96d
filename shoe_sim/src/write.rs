use crate::game::history::{RunHistory, RunResult};
use std::io::Write;

const WIDTH: usize = 64;
const ID_WIDTH: usize = 6;
const REASON_WIDTH: usize = "Wong Out (TC: -10.0)".len() + 4;
const TIME_WIDTH: usize = "00:00:00".len() + 2;
const PROFIT_WIDTH: usize = WIDTH - ID_WIDTH - REASON_WIDTH - TIME_WIDTH;

fn format_run(run: &RunResult) -> String {
    format!(
        "{:<ID_WIDTH$}{:<REASON_WIDTH$}{:>PROFIT_WIDTH$}{:>TIME_WIDTH$}\n",
        format!("#{}", run.id),
        run.reason,
        run.profit,
        run.timestamp.format("%H:%M:%S").to_string(),
    )
}

/// Writes `history` as a fixed-width table followed by the total profit over every shoe.
pub fn write_history(history: &RunHistory, mut writer: impl Write) -> std::io::Result<()> {
    writer.write_all(format!("{:-^WIDTH$}\n", " run history ").as_bytes())?;
    writer.write_all(
        format!(
            "{:<ID_WIDTH$}{:<REASON_WIDTH$}{:>PROFIT_WIDTH$}{:>TIME_WIDTH$}\n",
            "shoe", "reason", "profit", "time"
        )
        .as_bytes(),
    )?;
    for run in history.runs() {
        writer.write_all(format_run(run).as_bytes())?;
    }
    writer.write_all(format!("{}\n", "-".repeat(WIDTH)).as_bytes())?;
    let label_width = WIDTH - PROFIT_WIDTH - TIME_WIDTH;
    writer.write_all(
        format!(
            "{:<label_width$}{:>PROFIT_WIDTH$}\n",
            "total profit",
            history.total_profit()
        )
        .as_bytes(),
    )?;
    writer.flush()
}
