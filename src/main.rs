use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use points_settlement::scenario::{load_state, save_state, Scenario, ScenarioError, StepOutcome};
use points_settlement::{Address, IncomeSourceType, PointsState};

#[derive(Parser)]
#[command(name = "points-settlement", version, about = "Replay and inspect points settlement state")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a scenario file and print one JSON report per step.
    Replay {
        scenario: PathBuf,
        /// Start from a saved state instead of an empty one.
        #[arg(long)]
        state: Option<PathBuf>,
        /// Where to write the resulting state.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print one balance from a saved state.
    Balance {
        #[arg(long)]
        state: PathBuf,
        #[arg(long)]
        address: String,
        #[arg(long)]
        domain: String,
        /// user, kol or inviter
        #[arg(long, default_value = "user")]
        source: IncomeSourceType,
        #[arg(long)]
        point: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "command failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ScenarioError> {
    match cli.command {
        Command::Replay {
            scenario,
            state,
            out,
        } => {
            let scenario = Scenario::load(&scenario)?;
            let mut points = match &state {
                Some(path) => load_state(path)?,
                None => PointsState::new(),
            };
            let reports = scenario.replay(&mut points);
            for report in &reports {
                println!("{}", serde_json::to_string(report)?);
            }
            let rejected = reports
                .iter()
                .filter(|report| matches!(report.outcome, StepOutcome::Rejected { .. }))
                .count();
            println!("state_root={}", points.state_root_hex());
            info!(steps = reports.len(), rejected, "replay finished");
            if let Some(path) = out {
                save_state(&path, &points)?;
                info!(path = %path.display(), "state written");
            }
        }
        Command::Balance {
            state,
            address,
            domain,
            source,
            point,
        } => {
            let points = load_state(&state)?;
            let balance = points.points_balance(&Address::new(address), &domain, source, &point);
            println!("{balance}");
        }
    }
    Ok(())
}
