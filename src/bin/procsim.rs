//! procsim - Run FCFS/priority scheduling and the producer/consumer
//! simulation over a process list.

use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use procsim::{
    load_processes, Policy, ProcessRecord, ProducerConsumer, Schedule, ScheduleReport,
    SimFormat, SimulationConfig, SimulationOutcome,
};

/// Which simulations to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// FCFS and priority scheduling only.
    Schedule,
    /// Producer/consumer buffer simulation only.
    Buffer,
    /// Both, scheduling first.
    #[default]
    All,
}

/// Simulate CPU scheduling policies and a bounded-buffer producer/consumer
/// scheme over a process list.
#[derive(Parser)]
#[command(name = "procsim", version)]
struct Cli {
    /// Process list: a header line, then `pid arrival burst priority` per line.
    #[arg(default_value = "processes.txt", env = "PROCSIM_PROCESSES")]
    processes: PathBuf,

    /// Which simulations to run.
    #[arg(short, long, value_enum, default_value_t = Mode::All)]
    mode: Mode,

    /// Wall-clock milliseconds per logical time unit in the buffer
    /// simulation.
    #[arg(long, default_value_t = 1000, env = "PROCSIM_TIME_UNIT_MS")]
    time_unit_ms: u64,

    /// Print results as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Enable verbose output, including debug log messages. Specify twice
    /// for trace output. Ignored when RUST_LOG is set.
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    processes: &'a [ProcessRecord],
    schedules: Vec<Schedule>,
    buffer: Option<SimulationOutcome>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let records = load_processes(&cli.processes)?;

    let schedules: Vec<Schedule> = match cli.mode {
        Mode::Buffer => Vec::new(),
        Mode::Schedule | Mode::All => Policy::ALL.iter().map(|p| p.run(&records)).collect(),
    };

    if !cli.json {
        println!("Processes Loaded:");
        for p in &records {
            println!("{p}");
        }
        for schedule in &schedules {
            println!();
            println!("{}", ScheduleReport(schedule));
        }
    }

    let buffer = match cli.mode {
        Mode::Schedule => None,
        Mode::Buffer | Mode::All => Some(run_buffer(&cli, &records)?),
    };

    if cli.json {
        let report = JsonReport {
            processes: &records,
            schedules,
            buffer,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Some(outcome) = buffer {
        println!();
        println!("{outcome}");
    }

    Ok(())
}

fn run_buffer(cli: &Cli, records: &[ProcessRecord]) -> Result<SimulationOutcome> {
    let config = SimulationConfig::builder()
        .time_unit_ms(cli.time_unit_ms)
        .build()
        .context("invalid simulation settings")?;
    let sim = ProducerConsumer::new(config);

    let cancel = sim.cancel_handle();
    ctrlc::set_handler(move || cancel.cancel()).context("Error setting Ctrl-C handler")?;

    if !cli.json {
        println!();
        println!("Producer/Consumer Simulation:");
    }

    let (tx, rx) = crossbeam::channel::unbounded();
    let print_events = !cli.json;
    let printer = thread::Builder::new()
        .name("events".into())
        .spawn(move || {
            for event in rx {
                if print_events {
                    println!("{event}");
                }
            }
        })
        .context("failed to spawn event printer")?;

    let outcome = sim.run(records, Some(tx));
    // Every sender is gone once run() returns, which ends the printer.
    let _ = printer.join();
    let outcome = outcome?;
    info!(cancelled = outcome.cancelled, "buffer simulation done");
    Ok(outcome)
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .event_format(SimFormat)
        .try_init();
}
