use anyhow::Result;
use cadence_common::observability::init_logging;
use cadence_common::{ActionKind, ActionLimit, SystemClock};
use cadence_config::{CadenceConfig, CadenceConfigLoader};
use cadence_schedule::{
    ActivityScheduler, SchedulerConfig, is_business_hours, parse_timezone, until_business_hours,
    wait_for_business_hours,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod sample;
mod simulate;

/// Pacing and quota tooling for automated sessions.
#[derive(Parser, Debug)]
#[command(name = "cadence", version, about)]
struct Cli {
    /// Path to cadence.yaml; a missing file means defaults plus environment.
    #[arg(long, global = true, default_value = "cadence.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the effective limit table as JSON.
    Limits,

    /// Print draws from every scheduler delay generator, one JSON line each.
    Sample {
        #[arg(long, default_value_t = 5)]
        samples: usize,
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Pace `count` actions of one kind in virtual time and print the timeline.
    Simulate {
        #[arg(long)]
        kind: ActionKind,
        #[arg(long, default_value_t = 20)]
        count: u32,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },

    /// Report whether business hours are open; with --wait, block until they are.
    Hours {
        #[arg(long)]
        wait: bool,
    },
}

#[derive(Serialize)]
struct LimitRow {
    hourly_max: u32,
    daily_max: u32,
    min_interval_secs: u64,
    cooldown_after: u32,
    cooldown_secs: u64,
}

impl From<&ActionLimit> for LimitRow {
    fn from(l: &ActionLimit) -> Self {
        Self {
            hourly_max: l.hourly_max,
            daily_max: l.daily_max,
            min_interval_secs: l.min_interval.as_secs(),
            cooldown_after: l.cooldown_after,
            cooldown_secs: l.cooldown_duration.as_secs(),
        }
    }
}

fn scheduler_config(cfg: &CadenceConfig) -> SchedulerConfig {
    SchedulerConfig {
        timezone: cfg.scheduler.timezone.clone(),
        work_hours_start: cfg.scheduler.work_hours_start,
        work_hours_end: cfg.scheduler.work_hours_end,
    }
}

async fn hours(cfg: &CadenceConfig, wait: bool) -> Result<()> {
    let tz = parse_timezone(&cfg.scheduler.timezone)?;
    let window = cfg.business_hours;
    let local = Utc::now().with_timezone(&tz);
    if is_business_hours(&local, window.start_hour, window.end_hour) {
        println!("open ({})", local.format("%a %H:%M %Z"));
        return Ok(());
    }
    let until = until_business_hours(&local, window.start_hour, window.end_hour);
    println!(
        "closed ({}), opens in {}m",
        local.format("%a %H:%M %Z"),
        until.as_secs() / 60
    );
    if !wait {
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    if wait_for_business_hours(&SystemClock, tz, window.start_hour, window.end_hour, &cancel).await
    {
        println!("open");
    } else {
        println!("cancelled");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Environment wins over the file.
    let cfg = CadenceConfigLoader::new()
        .with_optional_file(&cli.config)
        .load()?;

    let log_path = init_logging(cfg.logging.to_log_config("cadence"))?;
    info!(config = %cli.config.display(), log = %log_path.display(), "cadence.start");

    match cli.command {
        Command::Limits => {
            let rows: BTreeMap<ActionKind, LimitRow> = cfg
                .effective_limits()
                .iter()
                .map(|(kind, limit)| (*kind, LimitRow::from(limit)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Command::Sample { samples, seed } => {
            let (scheduler, mut rng) = match seed {
                Some(seed) => (
                    ActivityScheduler::with_rng(
                        &scheduler_config(&cfg),
                        Arc::new(SystemClock),
                        StdRng::seed_from_u64(seed),
                    ),
                    StdRng::seed_from_u64(seed.wrapping_add(1)),
                ),
                None => (
                    ActivityScheduler::new(&scheduler_config(&cfg), Arc::new(SystemClock)),
                    StdRng::from_entropy(),
                ),
            };
            println!(
                "working_hours={} break_time={} local={}",
                scheduler.is_working_hours(),
                scheduler.is_break_time(),
                scheduler.local_now().format("%a %H:%M %Z")
            );
            for _ in 0..samples {
                let s = sample::draw(&scheduler, &mut rng);
                println!("{}", serde_json::to_string(&s)?);
            }
        }
        Command::Simulate { kind, count, seed } => {
            let sim = simulate::Simulation {
                limits: cfg.effective_limits(),
                scheduler: scheduler_config(&cfg),
                business_hours: cfg.business_hours,
                start: Utc::now(),
                seed,
            };
            let report = sim.run(kind, count)?;
            for step in &report.steps {
                match &step.blocked_by {
                    Some(reason) => println!(
                        "#{:<3} {}  waited {:>6}s  ({reason})",
                        step.index,
                        step.at.format("%a %H:%M:%S"),
                        step.waited_secs
                    ),
                    None => println!(
                        "#{:<3} {}  waited {:>6}s",
                        step.index,
                        step.at.format("%a %H:%M:%S"),
                        step.waited_secs
                    ),
                }
            }
            println!("{}", serde_json::to_string_pretty(&report.stats)?);
        }
        Command::Hours { wait } => hours(&cfg, wait).await?,
    }

    Ok(())
}
