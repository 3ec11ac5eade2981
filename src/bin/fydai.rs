//! fyDai Ledger CLI
//!
//! Command-line interface for configuring the ledger and running scenarios.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::{style, Term};

use fydai::prelude::*;

const SECS_PER_DAY: u64 = 86_400;

/// fyDai Ledger CLI - fixed-yield debt accounting
#[derive(Parser)]
#[command(name = "fydai")]
#[command(author = "fyDai Team")]
#[command(version = fydai::VERSION)]
#[command(about = "Command-line interface for the fyDai ledger", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the ledger parameter file
    #[arg(short, long, env = "FYDAI_CONFIG", default_value = "fydai.json")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ledger parameter management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Check a maturity against the current time
    Series {
        /// Maturity as a unix timestamp
        #[arg(short, long)]
        maturity: u64,
    },

    /// Run a borrow, mature, redeem and repay scenario
    Simulate {
        /// Collateral type to post
        #[arg(long, default_value = "ETH-A")]
        collateral: String,

        /// Collateral units to post
        #[arg(long, default_value_t = 100)]
        post: u128,

        /// Collateral price in base units, in basis points
        #[arg(long, default_value_t = 30_000)]
        price_bps: u64,

        /// Face units to borrow
        #[arg(long, default_value_t = 150)]
        borrow: u128,

        /// Days until maturity
        #[arg(long, default_value_t = 90)]
        days: u64,

        /// Savings growth after maturity, in basis points
        #[arg(long, default_value_t = 10_500)]
        savings_bps: u64,

        /// Borrow-cost growth after maturity, in basis points
        #[arg(long, default_value_t = 11_000)]
        borrow_bps: u64,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write default parameters
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current parameters
    Show,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let term = Term::stdout();

    if let Err(e) = run_command(&cli, &term) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run_command(cli: &Cli, term: &Term) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Config(cmd) => cmd_config(cli, cmd, term),
        Commands::Series { maturity } => cmd_series(cli, *maturity, term),
        Commands::Simulate {
            collateral,
            post,
            price_bps,
            borrow,
            days,
            savings_bps,
            borrow_bps,
        } => {
            let scenario = Scenario {
                collateral: CollateralId::new(collateral.as_str()),
                post: *post,
                price: Ray::from_bps(*price_bps)?,
                borrow: *borrow,
                days: *days,
                savings_growth: Ray::from_bps(*savings_bps)?,
                borrow_growth: Ray::from_bps(*borrow_bps)?,
            };
            cmd_simulate(cli, &scenario, term)
        }
    }
}

fn load_params(path: &Path, verbose: bool) -> anyhow::Result<LedgerParams> {
    if path.exists() {
        Ok(LedgerParams::load(path)?)
    } else {
        if verbose {
            tracing::info!(path = %path.display(), "no parameter file, using defaults");
        }
        Ok(LedgerParams::default())
    }
}

fn now() -> anyhow::Result<u64> {
    Ok(u64::try_from(chrono::Utc::now().timestamp())?)
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_config(cli: &Cli, cmd: &ConfigCommands, term: &Term) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Init { force } => {
            if cli.config.exists() && !force {
                anyhow::bail!(
                    "Configuration already exists at {:?}. Use --force to overwrite.",
                    cli.config
                );
            }
            LedgerParams::default().save(&cli.config)?;
            let _ = term.write_line(&format!(
                "{} Parameters written to {}",
                style("✓").green(),
                style(cli.config.display()).yellow()
            ));
        }
        ConfigCommands::Show => {
            let params = load_params(&cli.config, cli.verbose)?;
            let _ = term.write_line(&format!("{} Ledger parameters", style("→").cyan()));
            let _ = term.write_line(&format!(
                "  Maturity horizon: {} days",
                params.max_maturity_horizon_secs / SECS_PER_DAY
            ));
            let _ = term.write_line(&format!("  Supply limit: {}", params.supply_limit));
            for c in &params.collaterals {
                let _ = term.write_line(&format!(
                    "  Collateral {}: min ratio {}",
                    style(&c.id).cyan(),
                    c.min_ratio
                ));
            }
        }
    }
    Ok(())
}

fn cmd_series(cli: &Cli, maturity: u64, term: &Term) -> anyhow::Result<()> {
    let params = load_params(&cli.config, cli.verbose)?;
    let now = now()?;

    match MaturityToken::with_params(maturity, now, &params) {
        Ok(token) => {
            let _ = term.write_line(&format!(
                "{} {} ({}) is a valid maturity",
                style("✓").green(),
                style(&token.name).yellow(),
                token.symbol
            ));
            let _ = term.write_line(&format!(
                "  Matures in {} days",
                (maturity - now) / SECS_PER_DAY
            ));
        }
        Err(e) => {
            let _ = term.write_line(&format!("{} {}", style("⚠").yellow(), e));
        }
    }
    Ok(())
}

struct Scenario {
    collateral: CollateralId,
    post: u128,
    price: Ray,
    borrow: u128,
    days: u64,
    savings_growth: Ray,
    borrow_growth: Ray,
}

fn cmd_simulate(cli: &Cli, scenario: &Scenario, term: &Term) -> anyhow::Result<()> {
    let params = load_params(&cli.config, cli.verbose)?;
    let now = now()?;
    let maturity = scenario
        .days
        .max(1)
        .checked_mul(SECS_PER_DAY)
        .and_then(|secs| now.checked_add(secs))
        .ok_or_else(|| anyhow::anyhow!("{} days from now overflows a timestamp", scenario.days))?;
    let user = Address::derive("simulated-user");
    let collateral = &scenario.collateral;

    let mut ledger = PositionLedger::new(params)?;
    ledger.create_series(maturity, now)?;

    let mut indices = ManualIndexSource::default();
    let oracle = StaticPriceOracle::new().with_price(collateral.clone(), scenario.price);
    let mut custody = InMemoryCustody::new();
    let collateral_asset = Asset::Collateral(collateral.clone());
    custody.mint(collateral_asset.clone(), user, scenario.post)?;
    custody.approve(collateral_asset, user, scenario.post);
    custody.mint(Asset::Base, user, scenario.borrow.saturating_mul(2))?;
    custody.approve(Asset::Base, user, u128::MAX);
    custody.fund_reserve(Asset::Base, scenario.borrow.saturating_mul(2))?;

    let _ = term.write_line(&format!(
        "{} Series {} matures at {}",
        style("→").cyan(),
        style(maturity).yellow(),
        chrono::DateTime::from_timestamp(i64::try_from(maturity)?, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_default()
    ));

    {
        let mut ctx = LedgerContext::new(&indices, &oracle, &mut custody);
        ledger.post(collateral, user, user, scenario.post, &mut ctx)?;
        ledger.borrow(collateral, maturity, user, user, scenario.borrow, &mut ctx)?;
    }
    let _ = term.write_line(&format!(
        "  Posted {} {}, power {}",
        scenario.post,
        collateral,
        style(ledger.power_of(collateral, &user, &oracle)?).green()
    ));
    let _ = term.write_line(&format!(
        "  Borrowed {} fyDai, locked collateral {}",
        scenario.borrow,
        ledger.locked(collateral, &user, &indices, &oracle)?
    ));

    let matured = ledger.mature_all(maturity, &indices)?;
    let _ = term.write_line(&format!(
        "{} Matured series: {:?}",
        style("✓").green(),
        matured
    ));

    indices.set_savings(scenario.savings_growth);
    indices.set_borrow(scenario.borrow_growth);
    let series = ledger.series(maturity)?;
    let _ = term.write_line(&format!(
        "  Savings growth {}, borrow-cost growth {}",
        series.savings_growth(&indices)?,
        series.borrow_cost_growth(&indices)?
    ));
    let _ = term.write_line(&format!(
        "  Debt now {} (face {})",
        style(ledger.debt_dai(collateral, maturity, &user, &indices)?).yellow(),
        ledger.debt_fy_dai(collateral, maturity, &user)
    ));

    let half = scenario.borrow / 2;
    if half > 0 {
        let paid = ledger
            .series_mut(maturity)?
            .redeem(user, user, user, half, &indices, &mut custody)?;
        let _ = term.write_line(&format!(
            "{} Redeemed {} fyDai for {} base",
            style("✓").green(),
            half,
            style(paid).green()
        ));
    }

    let debt = ledger.debt_dai(collateral, maturity, &user, &indices)?;
    let mut ctx = LedgerContext::new(&indices, &oracle, &mut custody);
    let paid = ledger.repay_dai(collateral, maturity, user, user, debt.saturating_add(1), &mut ctx)?;
    let _ = term.write_line(&format!(
        "{} Repaid debt with {} base, remaining face {}",
        style("✓").green(),
        style(paid).green(),
        ledger.debt_fy_dai(collateral, maturity, &user)
    ));

    if cli.verbose {
        for event in ledger.events().recent() {
            let _ = term.write_line(&format!("  {} {:?}", style("ℹ").blue(), event));
        }
    }
    let _ = term.write_line(&format!(
        "  State hash {}",
        style(ledger.state_hash().to_hex()).dim()
    ));
    Ok(())
}
