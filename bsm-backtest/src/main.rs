//! Command-line runner.
//!
//! # Usage
//!
//! ```bash
//! # Price an option and show its Greeks
//! bsm-backtest price --spot 100 --strike 100 --maturity 1 --rate 0.05 --volatility 0.2
//!
//! # Backtest the stop-loss strategy on a daily close file
//! bsm-backtest backtest --config config/default.toml --data data/AAPL_historical.csv
//!
//! # Simulate delta hedging on one seeded path
//! bsm-backtest hedge --config config/default.toml --seed 42
//!
//! # Monte Carlo batch of hedging runs
//! bsm-backtest hedge-batch --config config/default.toml --runs 1000
//!
//! # Sweep stop-loss parameters
//! bsm-backtest sweep --config config/default.toml --data data/AAPL_historical.csv
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use bsm_backtest::backtest::run_sweep;
use bsm_backtest::data::PriceLoader;
use bsm_backtest::pricing::{call_put_prices, delta_profile, greeks, hedge_shares, price};
use bsm_backtest::{
    run_batch, AppConfig, BacktestEngine, HedgeEngine, OptionType, PriceSeries, TracingSink,
};

const SEPARATOR: &str = "============================================================";

#[derive(Parser)]
#[command(name = "bsm-backtest")]
#[command(about = "Black-Scholes pricing, backtesting and delta-hedging simulation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a European option and compute its Greeks
    Price {
        #[arg(long)]
        spot: f64,

        #[arg(long)]
        strike: f64,

        /// Time to maturity in years
        #[arg(long)]
        maturity: f64,

        #[arg(long, default_value_t = 0.03)]
        rate: f64,

        #[arg(long)]
        volatility: f64,

        /// call or put
        #[arg(long, default_value = "call")]
        kind: OptionType,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Run the stop-loss backtest over a daily close file
    Backtest {
        /// Path to configuration file (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// CSV file with Date and Close columns
        #[arg(short, long)]
        data: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Simulate dynamic delta hedging on one generated path
    Hedge {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the configured seed
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        json: bool,
    },

    /// Run a Monte Carlo batch of hedging simulations
    HedgeBatch {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long, default_value_t = 100)]
        runs: usize,

        /// Base seed (defaults to the configured seed)
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        json: bool,
    },

    /// Backtest every stop-loss threshold and sizing distance in the grid
    Sweep {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long)]
        data: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct PriceReport {
    kind: OptionType,
    price: f64,
    call: f64,
    put: f64,
    hedge_shares: f64,
    greeks: bsm_backtest::Greeks,
    /// (spot, delta) from 80% to 120% of the given spot
    delta_profile: Vec<(f64, f64)>,
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

fn load_prices(path: &Path) -> Result<PriceSeries> {
    let series = PriceLoader::load_file(path)
        .with_context(|| format!("Failed to load prices from {}", path.display()))?;
    info!(
        "Loaded {} bars ({} to {})",
        series.len(),
        series.first_date(),
        series.last_date()
    );
    Ok(series)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_price(
    spot: f64,
    strike: f64,
    maturity: f64,
    rate: f64,
    volatility: f64,
    kind: OptionType,
    json: bool,
) -> Result<()> {
    let (call, put) = call_put_prices(spot, strike, maturity, rate, volatility)?;
    let spots: Vec<f64> = (0..=8).map(|i| spot * (0.8 + 0.05 * i as f64)).collect();
    let report = PriceReport {
        kind,
        price: price(spot, strike, maturity, rate, volatility, kind)?,
        greeks: greeks(spot, strike, maturity, rate, volatility, kind)?,
        call,
        put,
        hedge_shares: hedge_shares(spot, strike, maturity, rate, volatility, kind)?,
        delta_profile: delta_profile(strike, maturity, rate, volatility, kind, &spots)?,
    };
    if json {
        return print_json(&report);
    }

    println!("{SEPARATOR}");
    println!("{} S={spot} K={strike} T={maturity} r={rate} sigma={volatility}", kind);
    println!("{SEPARATOR}");
    println!("  Price:  {:.4}", report.price);
    println!("  Delta:  {:.4}", report.greeks.delta);
    println!("  Gamma:  {:.4}", report.greeks.gamma);
    println!("  Theta:  {:.4} (per year)", report.greeks.theta);
    println!("  Vega:   {:.4}", report.greeks.vega);
    println!("  Rho:    {:.4}", report.greeks.rho);
    println!();
    println!("  Call / Put:   {:.4} / {:.4}", report.call, report.put);
    println!("  Hedge shares: {:.4}", report.hedge_shares);
    println!();
    println!("  Delta profile:");
    for (s, delta) in &report.delta_profile {
        println!("    S={s:>9.2}  delta={delta:>7.4}");
    }
    Ok(())
}

fn cmd_backtest(config: Option<&Path>, data: &Path, json: bool) -> Result<()> {
    let config = load_config(config)?;
    let series = load_prices(data)?;
    let engine = BacktestEngine::new(config.backtest)?;
    let result = engine.run(&series, &TracingSink)?;

    if json {
        return print_json(&result);
    }
    println!("{SEPARATOR}");
    println!("{}", result.summary());
    println!("{SEPARATOR}");
    for trade in &result.trades {
        println!(
            "  {} -> {}  {} shares  {:.2} -> {:.2}  P&L {:.2} ({})",
            trade.entry_date,
            trade.exit_date,
            trade.shares,
            trade.entry_price,
            trade.exit_price,
            trade.pnl,
            trade.exit_reason
        );
    }
    Ok(())
}

fn cmd_hedge(config: Option<&Path>, seed: Option<u64>, json: bool) -> Result<()> {
    let mut config = load_config(config)?.hedge;
    if let Some(seed) = seed {
        config.seed = seed;
    }
    let engine = HedgeEngine::new(config)?;
    let result = engine.run_seeded(&TracingSink)?;

    if json {
        return print_json(&result);
    }
    println!("{SEPARATOR}");
    println!("{}", result.summary());
    println!("{SEPARATOR}");
    Ok(())
}

fn cmd_hedge_batch(config: Option<&Path>, runs: usize, seed: Option<u64>, json: bool) -> Result<()> {
    let config = load_config(config)?.hedge;
    let base_seed = seed.unwrap_or(config.seed);
    let engine = HedgeEngine::new(config)?;
    info!("Running {} hedging simulations from seed {}", runs, base_seed);
    let summary = run_batch(&engine, runs, base_seed, &TracingSink)?;

    if json {
        return print_json(&summary);
    }
    println!("{SEPARATOR}");
    println!("{}", summary.summary());
    println!("{SEPARATOR}");
    Ok(())
}

fn cmd_sweep(config: Option<&Path>, data: &Path, json: bool) -> Result<()> {
    let config = load_config(config)?;
    let series = load_prices(data)?;
    info!(
        "Sweeping {} parameter combinations",
        config.sweep.total_combinations()
    );
    let results = run_sweep(&config.backtest, &config.sweep, &series, &TracingSink)?;

    if json {
        return print_json(&results);
    }
    println!("{SEPARATOR}");
    println!(
        "{:>10} {:>10} {:>10} {:>10} {:>8} {:>7}",
        "threshold", "distance", "return", "max dd", "sharpe", "trades"
    );
    println!("{SEPARATOR}");
    for r in &results {
        let sharpe = r
            .sharpe_ratio
            .map_or_else(|| "-".to_string(), |s| format!("{s:.2}"));
        println!(
            "{:>10.2} {:>10.2} {:>9.2}% {:>9.2}% {:>8} {:>7}",
            r.stop_loss_threshold,
            r.sizing_stop_distance,
            r.total_return * 100.0,
            r.max_drawdown * 100.0,
            sharpe,
            r.trades
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bsm_backtest=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Price {
            spot,
            strike,
            maturity,
            rate,
            volatility,
            kind,
            json,
        } => cmd_price(spot, strike, maturity, rate, volatility, kind, json)?,
        Commands::Backtest { config, data, json } => {
            cmd_backtest(config.as_deref(), &data, json)?
        }
        Commands::Hedge { config, seed, json } => cmd_hedge(config.as_deref(), seed, json)?,
        Commands::HedgeBatch {
            config,
            runs,
            seed,
            json,
        } => cmd_hedge_batch(config.as_deref(), runs, seed, json)?,
        Commands::Sweep { config, data, json } => cmd_sweep(config.as_deref(), &data, json)?,
    }

    Ok(())
}
