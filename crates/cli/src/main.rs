//! Command Line Interface for the concentrated-liquidity vault.
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use clm_vault::shares::shares_for_deposit;
use clm_vault::sliding_fee::deposit_amounts;
use clm_vault_domain::math::price_tick::{
    amount_from_decimal, amount_to_decimal, price_to_tick, tick_to_price,
};
use clm_vault_domain::math::{price_from_sqrt_price, sqrt_price_at_tick};
use clm_vault_domain::value_objects::{AmountPair, TickRange};
use clm_vault_simulation::prelude::*;
use clm_vault_strategy::position::PositionManager;
use dotenv::dotenv;
use primitive_types::U256;
use rust_decimal::Decimal;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Environment variable naming the scenario config file.
const CONFIG_ENV: &str = "CLM_VAULT_CONFIG";
const DECIMALS: u8 = 18;
/// Decimals of a `1e36`-scaled fair price.
const PRICE_DECIMALS: u8 = 36;

#[derive(Parser)]
#[command(name = "clm-vault")]
#[command(about = "Concentrated-liquidity vault strategy engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a generated market against a vault
    Simulate {
        /// Scenario config (JSON); falls back to $CLM_VAULT_CONFIG
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the number of steps
        #[arg(long)]
        steps: Option<usize>,

        /// Override the annualized volatility
        #[arg(long)]
        volatility: Option<f64>,

        /// Seed for reproducible paths
        #[arg(long)]
        seed: Option<u64>,

        /// Number of paths; more than one aggregates a Monte Carlo run
        #[arg(short, long, default_value_t = 1)]
        iterations: usize,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Shares and sliding fee a deposit would get
    PreviewDeposit {
        #[arg(long)]
        amount0: Decimal,
        #[arg(long)]
        amount1: Decimal,
        /// Vault reserves of asset0
        #[arg(long, default_value = "0")]
        reserves0: Decimal,
        /// Vault reserves of asset1
        #[arg(long, default_value = "0")]
        reserves1: Decimal,
        /// Outstanding shares
        #[arg(long, default_value = "0")]
        supply: Decimal,
        /// Asset1 per asset0
        #[arg(long, default_value = "1")]
        price: Decimal,
        /// Pool swap fee in hundredths of a basis point
        #[arg(long, default_value_t = 3_000)]
        fee_pips: u32,
    },
    /// Ranges the strategy would open at a price
    Ticks {
        /// Asset1 per asset0
        #[arg(long)]
        price: Decimal,
        #[arg(long, default_value_t = 60)]
        spacing: i32,
        /// Half-width of the main range in spacings
        #[arg(long, default_value_t = 10)]
        width: i32,
        /// Idle asset0 left after the main range
        #[arg(long, default_value = "0")]
        idle0: Decimal,
        /// Idle asset1 left after the main range
        #[arg(long, default_value = "0")]
        idle1: Decimal,
    },
    /// Print the effective scenario config
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config,
            steps,
            volatility,
            seed,
            iterations,
            json,
        } => {
            let mut scenario = load_config(config.as_deref())?;
            if let Some(steps) = steps {
                scenario.steps = steps;
            }
            if let Some(volatility) = volatility {
                scenario.volatility = volatility;
            }
            if let Some(seed) = seed {
                scenario.seed = Some(seed);
            }
            let volume = ConstantVolume::new(scenario.daily_volume);

            if iterations > 1 {
                println!("🎲 Running {iterations} Monte Carlo paths...");
                let result = MonteCarloRunner::new(scenario, volume, iterations).run()?;
                print_aggregate(&result, json)?;
            } else {
                let mut gbm = GeometricBrownianMotion::new(
                    scenario.initial_price,
                    scenario.drift,
                    scenario.volatility,
                    scenario.time_step_years(),
                );
                if let Some(seed) = scenario.seed {
                    gbm = gbm.with_seed(seed);
                }
                let prices = gbm.generate(scenario.steps);
                let mut volume = volume;
                let result = run_scenario(&scenario, &prices, &mut volume)?;
                print_summary(&result, json)?;
            }
        }
        Commands::PreviewDeposit {
            amount0,
            amount1,
            reserves0,
            reserves1,
            supply,
            price,
            fee_pips,
        } => {
            let offered = AmountPair::new(raw(amount0)?, raw(amount1)?);
            let reserves = AmountPair::new(raw(reserves0)?, raw(reserves1)?);
            let fair_price = amount_from_decimal(price, PRICE_DECIMALS)?;
            let split = deposit_amounts(offered, reserves, fair_price, fee_pips)?;
            let (shares, locked) = shares_for_deposit(split.credited, reserves, raw(supply)?, fair_price)?;

            println!("{:<12} | {:>28} | {:>28}", "", "asset0", "asset1");
            println!("{}", "-".repeat(74));
            for (label, pair) in [("offered", offered), ("fee", split.fees), ("credited", split.credited)] {
                println!(
                    "{:<12} | {:>28} | {:>28}",
                    label,
                    human(pair.amount0)?,
                    human(pair.amount1)?
                );
            }
            println!();
            println!("Shares minted:  {}", human(shares)?);
            if !locked.is_zero() {
                println!("Shares burned:  {} (first deposit)", human(locked)?);
            }
        }
        Commands::Ticks {
            price,
            spacing,
            width,
            idle0,
            idle1,
        } => {
            let tick = price_to_tick(price)?;
            let fair_price = price_from_sqrt_price(sqrt_price_at_tick(tick)?)?;
            let idle = AmountPair::new(raw(idle0)?, raw(idle1)?);
            let (main, alt) = PositionManager::plan(tick, spacing, width, idle, fair_price)?;

            println!("Spot tick: {tick}");
            print_range("main", &main)?;
            match alt {
                Some(alt) => print_range("alt", &alt)?,
                None => println!("alt:  none (idle balances are balanced)"),
            }
        }
        Commands::Config { config, output } => {
            let scenario = load_config(config.as_deref())?;
            scenario.validate()?;
            let rendered = serde_json::to_string_pretty(&scenario)?;
            match output {
                Some(path) => {
                    fs::write(&path, rendered)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("✅ Config written to {}", path.display());
                }
                None => println!("{rendered}"),
            }
        }
    }

    Ok(())
}

/// Reads the scenario from `path`, then `$CLM_VAULT_CONFIG`, then defaults.
fn load_config(path: Option<&Path>) -> Result<ScenarioConfig> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));
    let Some(path) = path else {
        return Ok(ScenarioConfig::default());
    };
    let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let config: ScenarioConfig =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    info!(path = %path.display(), "scenario config loaded");
    Ok(config)
}

fn raw(amount: Decimal) -> Result<U256> {
    if amount.is_sign_negative() {
        bail!("amounts cannot be negative: {amount}");
    }
    Ok(amount_from_decimal(amount, DECIMALS)?)
}

fn human(amount: U256) -> Result<Decimal> {
    Ok(amount_to_decimal(amount, DECIMALS)?)
}

fn print_range(label: &str, range: &TickRange) -> Result<()> {
    println!(
        "{label}: {range}  price {:.6} .. {:.6}",
        tick_to_price(range.lower)?,
        tick_to_price(range.upper)?
    );
    Ok(())
}

fn print_summary(result: &ScenarioResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    let summary = &result.summary;
    println!("\n📊 Scenario Results ({})", summary.keeper);
    println!("Steps:            {}", summary.total_steps);
    println!("Price:            {:.6} -> {:.6}", summary.initial_price, summary.final_price);
    println!("Time in range:    {:.2}%", summary.time_in_range_pct() * Decimal::from(100));
    println!("Harvests:         {}", summary.harvests);
    println!("Rebalances:       {}", summary.rebalances);
    println!("Skipped (calm):   {}", summary.skipped_not_calm);
    println!("Rejected flows:   {}", summary.rejected_flows);
    println!("Fees earned:      {:.6} / {:.6}", summary.fees_earned0, summary.fees_earned1);
    println!("Protocol fees:    {:.6} native", summary.native_fees);
    println!(
        "Share price:      {:.8} -> {:.8}",
        summary.initial_share_price, summary.final_share_price
    );
    println!("Return:           {:.4}%", summary.share_price_return() * Decimal::from(100));
    println!("Annualized:       {:.2}%", summary.annualized_return() * Decimal::from(100));
    println!("Withdrawn:        {:.6} / {:.6}", summary.withdrawn0, summary.withdrawn1);
    Ok(())
}

fn print_aggregate(result: &AggregateResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    let pct = Decimal::from(100);
    println!("\n📊 Monte Carlo Results ({} paths)", result.iterations);
    println!("Mean return:      {:.4}%", result.mean_return * pct);
    println!("Median return:    {:.4}%", result.median_return * pct);
    println!("VaR 95%:          {:.4}%", result.var_95_return * pct);
    println!("Time in range:    {:.2}%", result.mean_time_in_range * pct);
    println!("Harvests:         {:.2}", result.mean_harvests);
    println!("Skipped (calm):   {:.2}", result.mean_skipped_not_calm);
    Ok(())
}
