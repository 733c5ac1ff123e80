//! Fleet battle host.
//!
//! # Usage
//!
//! ```bash
//! # Play the built-in skirmish and print the final state as JSON
//! cargo run -p battle_server -- simulate
//!
//! # Play a scenario file for at most 20 turns
//! cargo run -p battle_server -- simulate --scenario crates/battle_server/scenarios/skirmish.ron --turns 20
//!
//! # Validate a configuration file
//! cargo run -p battle_server -- check-config --config server.ron
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the level chosen by `--verbose`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use battle_server::scenario::{simulate, Scenario};
use battle_server::{BattleService, ServerConfig, ServerError};

#[derive(Parser)]
#[command(name = "battle_server")]
#[command(about = "Turn-based fleet battle host")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario headlessly and print the operator view as JSON
    Simulate {
        /// Scenario file to load (built-in skirmish when omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Maximum turns to play (scenario default when omitted)
        #[arg(short, long)]
        turns: Option<u32>,

        /// Server configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate a server configuration file
    CheckConfig {
        /// Configuration file to check
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Simulate {
            scenario,
            turns,
            config,
        } => cmd_simulate(scenario, turns, config),
        Commands::CheckConfig { config } => cmd_check_config(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(reason = err.reason_code(), "{err}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_simulate(
    scenario: Option<PathBuf>,
    turns: Option<u32>,
    config: Option<PathBuf>,
) -> Result<(), ServerError> {
    let config = match config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    let scenario = match scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::skirmish(),
    };
    let turns = turns.unwrap_or(scenario.turns);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(async {
        // Simulations never touch the configured snapshot directory.
        let service = BattleService::in_memory(config);
        simulate(&service, &scenario, turns).await
    })?;

    println!("{}", report.view.to_json()?);
    Ok(())
}

fn cmd_check_config(path: PathBuf) -> Result<(), ServerError> {
    let config = ServerConfig::load(&path)?;
    tracing::info!(path = %path.display(), ?config, "Configuration is valid");
    Ok(())
}
