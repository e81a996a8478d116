//! STRAND Agent Runtime: Demo CLI
//!
//! Runs one or all of the reference scenarios against the real engine,
//! runners, agent servers and coordination layer.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- counter-chain
//!   cargo run -p demo -- fan-out
//!   cargo run -p demo -- compensation
//!   cargo run -p demo -- check-config crates/strand-ref/config/runtime.toml

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use strand_config::RuntimeConfig;
use strand_contracts::error::StrandResult;
use strand_ref::scenarios::{compensation, counter_chain, fan_out};

// ── CLI definition ────────────────────────────────────────────────────────────

/// STRAND: bounded action execution and agent runtime demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "STRAND agent runtime reference demo",
    long_about = "Runs STRAND reference scenarios showing chained execution, self-enqueueing\n\
                  agents, child spawning with race and barrier waits, and compensation."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all three scenarios in sequence.
    RunAll,
    /// Scenario 1: chained arithmetic and a bounded self-enqueueing countdown.
    CounterChain,
    /// Scenario 2: spawned workers awaited as a race and as a barrier.
    FanOut,
    /// Scenario 3: a failed transfer rolled back by compensation.
    Compensation,
    /// Load a runtime TOML file and print the options it resolves to.
    CheckConfig {
        /// Path to the runtime configuration file.
        path: PathBuf,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Set RUST_LOG=debug for engine and server events.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all().await,
        Command::CounterChain => counter_chain::run_scenario().await.map(|_| ()),
        Command::FanOut => fan_out::run_scenario().await.map(|_| ()),
        Command::Compensation => compensation::run_scenario().await.map(|_| ()),
        Command::CheckConfig { path } => check_config(&path),
    };

    match result {
        Ok(()) => {
            println!("All selected commands completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error [{}]: {}", e.kind(), e);
            std::process::exit(1);
        }
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

async fn run_all() -> StrandResult<()> {
    counter_chain::run_scenario().await?;
    fan_out::run_scenario().await?;
    compensation::run_scenario().await?;
    Ok(())
}

fn check_config(path: &Path) -> StrandResult<()> {
    let config = RuntimeConfig::from_file(path)?;
    info!(path = %path.display(), "runtime configuration is valid");

    let exec = config.exec_options();
    let server = config.server_options();
    let policy = config.restart_policy();

    println!("=== Runtime configuration: {} ===", path.display());
    println!();
    println!(
        "  Execution:     timeout {}ms, {} retries, backoff {}ms, telemetry {:?}",
        exec.timeout_ms, exec.max_retries, exec.backoff_ms, exec.telemetry
    );
    println!(
        "  Compensation:  {} (timeout {}ms)",
        if exec.compensation { "enabled" } else { "disabled" },
        exec.compensation_timeout_ms
    );
    println!(
        "  Runner:        {:?}, continue_on_directive {}, merge_results {}",
        server.runner, server.run.continue_on_directive, server.run.merge_results
    );
    println!(
        "  Server:        max_iterations {}, fail_on_error {}",
        server.max_iterations, server.fail_on_error
    );
    println!("  Supervisor:    {} restarts per {}ms", policy.max_restarts, policy.window_ms);
    println!("  Coordination:  child poll every {}ms", config.child_poll_interval().as_millis());
    println!();
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("STRAND Agent Execution Runtime");
    println!("Reference Demo");
    println!("================================");
    println!();
    println!("Per instruction:");
    println!("  [1] Params validated against the action's schema (defaults, coercion)");
    println!("  [2] Action body runs under a timeout, retried with exponential backoff");
    println!("  [3] On final failure, the action's compensation runs under its own bound");
    println!("  [4] The runner merges the state delta and applies agent directives");
    println!("  [5] The agent server performs runtime directives (spawn, publish, ...)");
    println!();
}
