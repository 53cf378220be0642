//! Parses the command line arguments.
//!
//! Basic usage for a scripted run with logging on:
//!
//! ```cargo run -- --commands scripts/demo.txt --program chat --log```
//!
//! Omitting `--commands` drops into the interactive prompt.

use clap::{Parser, ValueEnum};
use lockstep_core::{Console, FailureLevel, SimConfig, Simulator};
use std::process::ExitCode;
use std::{
    fs::{create_dir_all, OpenOptions},
    sync::Arc,
};
use tracing_subscriber::FmtSubscriber;

use crate::programs;
use crate::script;

/// Stores the different command line arguments.
#[derive(Parser)]
struct Args {
    /// Logging flag. Used to turn logging on or off.
    #[arg(short, long)]
    log: bool,
    /// Failure mode for the run.
    #[arg(short, long, value_enum, default_value = "nothing")]
    mode: Mode,
    /// Probability that an in-transit packet is dropped, per tick.
    #[arg(long, default_value_t = 0.0)]
    drop_rate: f64,
    /// Probability that a surviving packet is delayed a tick.
    #[arg(long, default_value_t = 0.0)]
    delay_rate: f64,
    /// Probability that a live node crashes, per tick.
    #[arg(long, default_value_t = 0.0)]
    failure_rate: f64,
    /// Probability that a crashed node recovers, per tick.
    #[arg(long, default_value_t = 0.0)]
    recovery_rate: f64,
    /// Seed for the failure generator. Drawn from entropy when omitted.
    #[arg(short, long)]
    seed: Option<u64>,
    /// Command file to run. Omit for the interactive prompt.
    #[arg(short, long)]
    commands: Option<String>,
    /// Node program to simulate.
    #[arg(short, long, default_value = "chat")]
    program: String,
    /// How many nodes to start at time zero.
    #[arg(short, long, default_value_t = 2)]
    nodes: u8,
    /// Stop after this many ticks even if work remains.
    #[arg(long)]
    max_ticks: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Nothing,
    Drop,
    Delay,
    Crash,
    Everything,
}

impl From<Mode> for FailureLevel {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Nothing => FailureLevel::Nothing,
            Mode::Drop => FailureLevel::Drop,
            Mode::Delay => FailureLevel::Delay,
            Mode::Crash => FailureLevel::Crash,
            Mode::Everything => FailureLevel::Everything,
        }
    }
}

/// Parses command line arguments and runs the simulation they describe.
pub fn parse_args() -> ExitCode {
    let cli = Args::parse();
    if cli.log {
        initialize_logging();
    }

    for (name, rate) in [
        ("drop-rate", cli.drop_rate),
        ("delay-rate", cli.delay_rate),
        ("failure-rate", cli.failure_rate),
        ("recovery-rate", cli.recovery_rate),
    ] {
        if !(0.0..=1.0).contains(&rate) {
            eprintln!("--{name} must be between 0 and 1, got {rate}");
            return ExitCode::from(2);
        }
    }

    let Some(factory) = programs::factory(&cli.program) else {
        eprintln!(
            "Unknown program: '{}'. Available: {}",
            cli.program,
            programs::NAMES.join(", ")
        );
        return ExitCode::from(2);
    };

    let config = SimConfig {
        level: cli.mode.into(),
        drop_rate: cli.drop_rate,
        delay_rate: cli.delay_rate,
        failure_rate: cli.failure_rate,
        recovery_rate: cli.recovery_rate,
        seed: cli.seed,
        tick_limit: cli.max_ticks,
    };

    let mut sim = Simulator::new(&config, factory, Console::stdio());
    sim.boot(cli.nodes);

    match &cli.commands {
        Some(path) => match script::load(path) {
            Ok(events) => {
                sim.run_script(events);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        },
        None => {
            sim.run_interactive();
            ExitCode::SUCCESS
        }
    }
}

/// Initializes tracing. Only should be called once when the sim starts.
/// Writes JSON events to a timestamped file under ./logs.
fn initialize_logging() {
    let main_path = "./logs";
    create_dir_all(main_path).unwrap();
    let file_path = format!(
        "{}/debug-{}.log",
        main_path,
        chrono::offset::Local::now().format("%y-%m-%d_%H-%M-%S")
    );
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(file_path)
        .unwrap();
    let subscriber = FmtSubscriber::builder()
        .with_writer(Arc::new(file))
        .json()
        .finish();
    tracing::subscriber::set_global_default(subscriber).unwrap()
}
