#![deny(warnings)]

//! Headless driver for the fuel economy. Ads are simulated as watched to the
//! end; each invocation is a fresh session over the same save file.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use fuel_core::{CalculationRecord, Clock, FeatureTier, FixedClock, LocalClock};
use fuel_runtime::{AdPrompt, CalculationGate, DailyClaim, FuelEconomy, Resolution};
use persistence::{DurableStore, JsonFileStore, MemoryStore, SessionStore};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: fuel [--store PATH] [--config PATH] [--today YYYY-MM-DD] [--seed N] \
<status|calc|continue|claim|scratch|spin|refuel> [--premium] [--name NAME] [--input JSON]";

#[derive(Debug, Default)]
struct Args {
    command: Option<String>,
    store: Option<String>,
    config: Option<String>,
    today: Option<NaiveDate>,
    seed: Option<u64>,
    premium: bool,
    name: Option<String>,
    input: Option<String>,
    version: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--store" => args.store = it.next(),
            "--config" => args.config = it.next(),
            "--today" => {
                let raw = it.next().context("--today needs a date")?;
                args.today = Some(
                    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                        .with_context(|| format!("bad date {raw}"))?,
                );
            }
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()),
            "--premium" => args.premium = true,
            "--name" => args.name = it.next(),
            "--input" => args.input = it.next(),
            "--version" | "-V" => args.version = true,
            other if other.starts_with('-') => bail!("unknown flag {other}\n{USAGE}"),
            _ => args.command = Some(arg),
        }
    }
    Ok(args)
}

/// Play the ad to the end and hand the pending result back.
fn watch(economy: &mut FuelEconomy, mut prompt: AdPrompt) -> Result<Resolution> {
    let length = prompt.modal.remaining();
    println!("[ad] {:?} ad, {}s", prompt.kind(), length.as_secs());
    let completion = prompt
        .modal
        .advance(length)
        .context("ad did not finish")?;
    Ok(economy.resume(prompt.pending, completion)?)
}

fn record(args: &Args) -> Result<CalculationRecord> {
    let inputs = match &args.input {
        Some(raw) => serde_json::from_str(raw).context("--input must be JSON")?,
        None => serde_json::Value::Null,
    };
    Ok(CalculationRecord {
        calculator: args.name.clone().unwrap_or_else(|| "emi".into()),
        tier: if args.premium {
            FeatureTier::Premium
        } else {
            FeatureTier::Standard
        },
        inputs,
        result: serde_json::Value::Null,
    })
}

fn report_gate(economy: &mut FuelEconomy, gate: CalculationGate) -> Result<()> {
    match gate {
        CalculationGate::Show(r) => println!("result shown: {}", r.calculator),
        CalculationGate::ShowWithToast(r) => {
            println!("out of fuel: calculations are now ad-supported");
            println!("result shown: {}", r.calculator);
        }
        CalculationGate::InsufficientFuel {
            needed, available, ..
        } => {
            println!("need {needed} fuel, have {available}; run `continue` to go ad-supported");
        }
        CalculationGate::WatchAd(prompt) => match watch(economy, prompt)? {
            Resolution::Calculation(r) => println!("result shown: {}", r.calculator),
            other => println!("{other:?}"),
        },
    }
    Ok(())
}

fn status(economy: &FuelEconomy) {
    let daily = economy.daily_status();
    println!("fuel: {}", economy.fuel());
    println!(
        "daily: streak {} | claimable: {} | next day {}",
        daily.current_streak, daily.claimable, daily.next_streak
    );
    for day in &daily.days {
        println!(
            "  day {}: +{}{}{}",
            day.day,
            day.reward,
            if day.requires_ad { " (ad)" } else { "" },
            if day.claimed { " claimed" } else { "" }
        );
    }
    println!(
        "scratch: {} | wheel: {} | next refuel: +{}",
        if economy.scratch_available() { "ready" } else { "played" },
        if economy.wheel_available() { "ready" } else { "played" },
        economy.next_refuel_grant()
    );
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args()?;
    if args.version {
        println!(
            "fuel {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }
    let Some(command) = args.command.clone() else {
        bail!("{USAGE}");
    };

    let cfg = match &args.config {
        Some(path) => econ_config::load_config(path)?,
        None => fuel_core::EconomyConfig::default(),
    };
    let store_path = args
        .store
        .clone()
        .unwrap_or_else(|| persistence::default_store_path().to_string());
    let durable = DurableStore::new(Arc::new(JsonFileStore::open(&store_path)));
    let session = SessionStore::new(Arc::new(MemoryStore::new()));
    let clock: Arc<dyn Clock> = match args.today {
        Some(date) => Arc::new(FixedClock::new(date)),
        None => Arc::new(LocalClock),
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    info!(%store_path, seed, command = %command, "starting");

    let mut economy = FuelEconomy::new(cfg, durable, session, clock)?;

    match command.as_str() {
        "status" => status(&economy),
        "calc" => {
            let gate = economy.request_calculation(record(&args)?);
            report_gate(&mut economy, gate)?;
        }
        "continue" => {
            let gate = economy.continue_ad_supported(record(&args)?);
            report_gate(&mut economy, gate)?;
        }
        "claim" => match economy.claim_daily() {
            DailyClaim::AlreadyClaimed => println!("already claimed today"),
            DailyClaim::Granted { reward, streak } => {
                println!("day {streak}: +{reward} fuel")
            }
            DailyClaim::WatchAd(prompt) => match watch(&mut economy, prompt)? {
                Resolution::DailyReward { reward, streak } => {
                    println!("day {streak}: +{reward} fuel")
                }
                other => warn!(?other, "unexpected resolution"),
            },
        },
        "scratch" => {
            let mut board = economy.open_scratch_card(&mut rng)?;
            for cell in 0..board.visible().len() {
                if let fuel_runtime::Reveal::Won { prize, .. } =
                    economy.scratch(&mut board, cell)?
                {
                    println!("matched three: +{prize} fuel");
                    break;
                }
            }
            let cells: Vec<String> = board
                .visible()
                .iter()
                .map(|c| c.map_or_else(|| "?".to_string(), |v| v.to_string()))
                .collect();
            println!("board: [{}]", cells.join(" "));
        }
        "spin" => {
            // No animation to wait for here; the plan is completed at once.
            let plan = economy.spin_wheel(&mut rng)?;
            println!(
                "wheel stopped on segment {} after {:.1} deg",
                plan.segment, plan.rotation_deg
            );
            let prize = economy.finish_spin(plan)?;
            println!("wheel: +{prize} fuel");
        }
        "refuel" => {
            let prompt = economy.start_refuel();
            match watch(&mut economy, prompt)? {
                Resolution::Refuel { granted } => println!("refueled: +{granted}"),
                other => warn!(?other, "unexpected resolution"),
            }
        }
        other => bail!("unknown command {other}\n{USAGE}"),
    }
    println!("fuel: {}", economy.fuel());
    Ok(())
}
