//! mockio CLI - stress and race checks for the mock streams

use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;

use mockio::{run_probe, run_race, FixSuggestion, MockIoError, ProbeConfig, RaceConfig};

#[derive(Parser)]
#[command(name = "mockio")]
#[command(about = "mockio - infinite stdin/stdout streams for testing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check lossless sink delivery and a handshake echo round trip
    Probe {
        /// Concurrent sink writers
        #[arg(short, long, env = "MOCKIO_WRITERS", default_value_t = 4)]
        writers: usize,

        /// Records per writer and lines echoed
        #[arg(short, long, env = "MOCKIO_ROUNDS", default_value_t = 100)]
        rounds: usize,

        /// Timeout for each delimiter-bounded read, in milliseconds
        #[arg(short, long, env = "MOCKIO_TIMEOUT_MS", default_value_t = 2000)]
        timeout_ms: u64,
    },

    /// Race single-byte writes against a parked reader
    Race {
        /// Number of write/read rounds
        #[arg(short, long, env = "MOCKIO_ITERATIONS", default_value_t = 500)]
        iterations: usize,

        /// How long a read may stay parked after its write, in milliseconds
        #[arg(short, long, env = "MOCKIO_STALL_MS", default_value_t = 500)]
        stall_ms: u64,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Probe {
            writers,
            rounds,
            timeout_ms,
        } => probe(ProbeConfig {
            writers,
            rounds,
            timeout: Duration::from_millis(timeout_ms),
        }),
        Commands::Race {
            iterations,
            stall_ms,
        } => race(RaceConfig {
            iterations,
            stall: Duration::from_millis(stall_ms),
        }),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn probe(config: ProbeConfig) -> Result<(), MockIoError> {
    println!(
        "{} Probing with {} writers x {} rounds",
        "→".cyan(),
        config.writers.to_string().cyan().bold(),
        config.rounds.to_string().cyan().bold()
    );

    let report = run_probe(&config)?;

    println!("{} Probe passed", "✓".green());
    println!("  Records: {}", report.records);
    println!("  Sink bytes: {}", report.sink_bytes);
    println!("  Echoed lines: {}", report.echoed_lines);
    println!("  Handoffs: {}", report.handoffs);
    println!("  Elapsed: {:?}", report.elapsed);

    Ok(())
}

fn race(config: RaceConfig) -> Result<(), MockIoError> {
    println!(
        "{} Racing {} single-byte writes",
        "→".cyan(),
        config.iterations.to_string().cyan().bold()
    );

    let report = run_race(&config)?;

    println!("{} No stalled reads", "✓".green());
    println!("  Iterations: {}", report.iterations);
    println!("  Handoffs: {}", report.handoffs);
    println!("  Elapsed: {:?}", report.elapsed);

    Ok(())
}
