use clap::Parser;
use shoe_sim::logger::init_logger;
use shoe_sim::prelude::*;
use shoe_sim::write::write_history;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Parser)]
#[command(name = "shoe_sim")]
#[command(about = "Plays whole shoes of blackjack with a card counting agent and reports the profit of each")]
struct Args {
    /// Number of shoes to play
    #[arg(short, long, default_value_t = 1)]
    shoes: usize,

    /// Decks per shoe, overrides the config file
    #[arg(short, long)]
    decks: Option<usize>,

    /// Counting system used for betting and exit decisions: simple or complex
    #[arg(long, default_value = "simple")]
    strategy: CountingStrategy,

    /// Leave a shoe once the true count drops below this
    #[arg(long, default_value_t = -100.0, allow_negative_numbers = true)]
    exit_threshold: f64,

    /// Seed for reproducible shuffles, overrides the config file
    #[arg(long)]
    seed: Option<u64>,

    /// Path to a TOML table configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep the pacing delays instead of playing as fast as possible
    #[arg(long)]
    paced: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn table_config(&self) -> Result<TableConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => TableConfig::load(path)?,
            None => TableConfig::default(),
        };
        if let Some(decks) = self.decks {
            config.num_decks = decks;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if !self.paced {
            config = TableConfig {
                dealer_delay_ms: 0,
                think_delay_ms: 0,
                play_delay_ms: 0,
                wong_out_delay_ms: 0,
                round_delay_ms: 0,
                shoe_delay_ms: 0,
                ..config
            };
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.table_config()?;
    tracing::info!(
        shoes = args.shoes,
        decks = config.num_decks,
        strategy = %args.strategy,
        "starting run"
    );

    let mut table = BlackjackTable::new(config);
    table.set_counting_strategy(args.strategy);
    table.set_target_shoes(args.shoes)?;
    table.set_exit_threshold(args.exit_threshold)?;
    let table = Arc::new(Mutex::new(table));

    Autopilot::spawn(Arc::clone(&table))?.join()?;

    let table = table.lock().map_err(|_| GameError::Poisoned)?;
    write_history(table.history(), BufWriter::new(std::io::stdout()))?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
