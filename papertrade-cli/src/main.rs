//! PaperTrade CLI — live engine, backtests, and optimization cycles.
//!
//! Commands:
//! - `run` — start the live paper-trading service from a TOML config
//! - `backtest` — run one seed strategy over CSV or synthetic history
//! - `optimize` — run one optimization cycle and print the ranking
//! - `status` — print the persisted engine state
//! - `profiles` — list the built-in risk profiles

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use papertrade_core::backtest::run_backtest;
use papertrade_core::domain::{Candle, Timeframe};
use papertrade_core::feed::{HistoryStore, MarketFeed, ReplayFeed, SyntheticFeed};
use papertrade_core::risk::RiskProfile;
use papertrade_core::strategy::{seed_catalog, Strategy};
use papertrade_runner::config::{EngineConfig, FeedKind};
use papertrade_runner::optimizer::{run_cycle, OptimizerConfig};
use papertrade_runner::persist;
use papertrade_runner::service::PaperTradingService;

#[derive(Parser)]
#[command(
    name = "papertrade",
    about = "PaperTrade CLI — simulated trading with continuous strategy optimization"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the live paper-trading service.
    Run {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Stop after this many seconds. Runs until killed when omitted.
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Backtest one seed strategy over CSV or synthetic history.
    Backtest {
        /// Strategy family: rsi_reversion, macd_cross, sma_cross, ema_cross, momentum, bollinger.
        #[arg(long)]
        strategy: String,

        /// CSV file of candles. Synthetic history is generated when omitted.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Candle timeframe: 1m, 5m, 15m, 1h, 4h, 1d.
        #[arg(long, default_value = "1m")]
        timeframe: String,

        /// Synthetic candle count (ignored with --csv).
        #[arg(long, default_value_t = 1000)]
        candles: usize,

        /// Synthetic feed seed (ignored with --csv).
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Risk profile: default, conservative, aggressive, learning.
        #[arg(long, default_value = "default")]
        profile: String,
    },
    /// Run one optimization cycle and print the ranking.
    Optimize {
        /// CSV file of candles. Synthetic history is generated when omitted.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Candle timeframe: 1m, 5m, 15m, 1h, 4h, 1d.
        #[arg(long, default_value = "1m")]
        timeframe: String,

        /// Synthetic candle count (ignored with --csv).
        #[arg(long, default_value_t = 1000)]
        candles: usize,

        /// Synthetic feed seed (ignored with --csv).
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Perturbed variants generated per seed strategy.
        #[arg(long, default_value_t = 8)]
        variants: usize,

        /// Risk profile: default, conservative, aggressive, learning.
        #[arg(long, default_value = "default")]
        profile: String,
    },
    /// Print the persisted engine state.
    Status {
        /// Engine state file.
        #[arg(long, default_value = "papertrade_state.json")]
        state_path: PathBuf,
    },
    /// List the built-in risk profiles.
    Profiles,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            duration_secs,
        } => cmd_run(config, duration_secs),
        Commands::Backtest {
            strategy,
            csv,
            timeframe,
            candles,
            seed,
            profile,
        } => cmd_backtest(&strategy, csv.as_deref(), &timeframe, candles, seed, &profile),
        Commands::Optimize {
            csv,
            timeframe,
            candles,
            seed,
            variants,
            profile,
        } => cmd_optimize(csv.as_deref(), &timeframe, candles, seed, variants, &profile),
        Commands::Status { state_path } => cmd_status(&state_path),
        Commands::Profiles => cmd_profiles(),
    }
}

fn cmd_run(config_path: Option<PathBuf>, duration_secs: Option<u64>) -> Result<()> {
    let config = match config_path {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let feed = build_feed(&config)?;
    let mut service = PaperTradingService::new(config, feed)?;
    service.start()?;
    println!("Engine running. Set RUST_LOG=info for engine logs.");

    let started = std::time::Instant::now();
    loop {
        std::thread::sleep(Duration::from_secs(5));
        let status = service.status();
        let active = status
            .active
            .as_ref()
            .map(|a| format!("{} ({:.3})", a.family, a.score))
            .unwrap_or_else(|| "none".to_string());
        println!(
            "cash: {:.2}  trades: {}  position: {}  active: {active}",
            status.cash,
            status.trade_count,
            if status.position_open { "open" } else { "flat" },
        );
        if let Some(limit) = duration_secs {
            if started.elapsed() >= Duration::from_secs(limit) {
                break;
            }
        }
    }

    service.stop()?;
    println!("Engine stopped, state persisted.");
    Ok(())
}

fn cmd_backtest(
    strategy_name: &str,
    csv: Option<&Path>,
    timeframe: &str,
    candle_count: usize,
    seed: u64,
    profile_name: &str,
) -> Result<()> {
    let timeframe: Timeframe = timeframe.parse()?;
    let strategy = find_seed_strategy(strategy_name)?;
    let profile = parse_profile(profile_name)?;
    let candles = load_history(csv, timeframe, candle_count, seed)?;

    let report = run_backtest(&strategy, &profile.policy(), &candles)?;
    let trades = &report.portfolio.trades;
    let wins = trades.iter().filter(|t| t.is_winner()).count();

    println!();
    println!("=== Backtest: {strategy_name} ===");
    println!("Strategy ID:   {}", strategy.id.short());
    println!("Candles:       {}", report.candles);
    println!("Final equity:  {:.2}", report.final_equity);
    println!("Total return:  {:.2}%", report.total_return() * 100.0);
    println!("Trades:        {} ({} wins)", trades.len(), wins);
    println!();
    Ok(())
}

fn cmd_optimize(
    csv: Option<&Path>,
    timeframe: &str,
    candle_count: usize,
    seed: u64,
    variants: usize,
    profile_name: &str,
) -> Result<()> {
    let timeframe: Timeframe = timeframe.parse()?;
    let profile = parse_profile(profile_name)?;
    let candles = load_history(csv, timeframe, candle_count, seed)?;

    let config = OptimizerConfig {
        variants_per_seed: variants,
        ..Default::default()
    };
    let report = run_cycle(&config, &profile.policy(), &candles, &[], 0);

    println!();
    println!(
        "Evaluated {} candidates ({} skipped on short history)",
        report.evaluated, report.skipped
    );
    println!();
    println!(
        "{:<4} {:<14} {:<14} {:>8} {:>9} {:>8} {:>7}",
        "#", "Family", "ID", "Score", "Return", "Sharpe", "Trades"
    );
    println!("{}", "-".repeat(70));
    for (i, candidate) in report.ranked.iter().enumerate() {
        println!(
            "{:<4} {:<14} {:<14} {:>8.4} {:>8.2}% {:>8.3} {:>7}",
            i + 1,
            candidate.strategy.kind.family(),
            candidate.strategy.id.short(),
            candidate.score,
            candidate.stats.total_return * 100.0,
            candidate.stats.sharpe,
            candidate.stats.trade_count,
        );
    }
    println!();
    Ok(())
}

fn cmd_status(state_path: &Path) -> Result<()> {
    let Some(state) = persist::load(state_path)? else {
        println!("No engine state at {}", state_path.display());
        return Ok(());
    };

    let portfolio = state.ledger.portfolio();
    println!();
    println!("=== Engine State ===");
    println!("Saved at:      {}", state.saved_at);
    println!("Risk profile:  {:?}", state.risk_profile);
    println!("Cash:          {:.2}", portfolio.cash);
    println!("Trades:        {}", portfolio.trades.len());
    println!(
        "Position:      {}",
        if portfolio.has_position() { "open" } else { "flat" }
    );
    match &state.active {
        Some(active) => {
            println!(
                "Active:        {} ({}) score {:.4}, promoted {}",
                active.strategy.kind.family(),
                active.strategy.id.short(),
                active.score,
                active.promoted_at,
            );
        }
        None => println!("Active:        none"),
    }
    println!();
    Ok(())
}

fn cmd_profiles() -> Result<()> {
    println!();
    println!(
        "{:<14} {:>12} {:>10} {:>12} {:>8} {:>8}",
        "Profile", "Balance", "Max Pos", "Conf Thresh", "Stop", "Target"
    );
    println!("{}", "-".repeat(70));
    for profile in RiskProfile::all() {
        let p = profile.policy();
        println!(
            "{:<14} {:>12.0} {:>9.0}% {:>11.0}% {:>7.1}% {:>7.1}%",
            format!("{profile:?}").to_lowercase(),
            p.starting_balance,
            p.max_position_fraction * 100.0,
            p.confidence_threshold * 100.0,
            p.stop_loss_pct * 100.0,
            p.take_profit_pct * 100.0,
        );
    }
    println!();
    Ok(())
}

// ─── Helpers ───────────────────────────────────────────────────────────────

fn build_feed(config: &EngineConfig) -> Result<Box<dyn MarketFeed>> {
    match config.feed.kind {
        FeedKind::Synthetic => Ok(Box::new(SyntheticFeed::new(
            config.feed.seed,
            config.timeframe,
            Utc::now(),
            config.feed.initial_price,
        ))),
        FeedKind::Csv => {
            let path = config
                .feed
                .csv_path
                .as_ref()
                .context("feed.csv_path is required for the csv feed")?;
            let mut store = HistoryStore::new();
            store
                .load_csv(config.timeframe, path)
                .with_context(|| format!("loading candles from {}", path.display()))?;
            Ok(Box::new(ReplayFeed::new(store.all(config.timeframe).to_vec())))
        }
    }
}

fn load_history(
    csv: Option<&Path>,
    timeframe: Timeframe,
    candle_count: usize,
    seed: u64,
) -> Result<Vec<Candle>> {
    match csv {
        Some(path) => {
            let mut store = HistoryStore::new();
            let loaded = store
                .load_csv(timeframe, path)
                .with_context(|| format!("loading candles from {}", path.display()))?;
            println!("Loaded {loaded} candles from {}", path.display());
            Ok(store.all(timeframe).to_vec())
        }
        None => {
            let mut feed = SyntheticFeed::new(seed, timeframe, Utc::now(), 100.0);
            let mut candles = Vec::with_capacity(candle_count);
            for _ in 0..candle_count {
                match feed.next_candle()? {
                    Some(candle) => candles.push(candle),
                    None => break,
                }
            }
            Ok(candles)
        }
    }
}

fn find_seed_strategy(name: &str) -> Result<Strategy> {
    let catalog = seed_catalog();
    let families: Vec<&str> = catalog.iter().map(|s| s.kind.family()).collect();
    catalog
        .iter()
        .find(|s| s.kind.family() == name)
        .cloned()
        .with_context(|| {
            format!(
                "unknown strategy '{name}'. Valid: {}",
                families.join(", ")
            )
        })
}

fn parse_profile(name: &str) -> Result<RiskProfile> {
    match name {
        "default" => Ok(RiskProfile::Default),
        "conservative" => Ok(RiskProfile::Conservative),
        "aggressive" => Ok(RiskProfile::Aggressive),
        "learning" => Ok(RiskProfile::Learning),
        _ => bail!("unknown profile '{name}'. Valid: default, conservative, aggressive, learning"),
    }
}
