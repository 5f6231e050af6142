//! Application layer - drivers, Monte-Carlo batches, experiments and the CLI

pub mod commands;
pub mod experiments;
pub mod monte_carlo;
pub mod simulation;

pub use commands::{Cli, CommandExecutor, Commands};
pub use monte_carlo::{MonteCarloOutcome, MonteCarloParams, MonteCarloRunner, TrialMode, TrialSummary};
pub use simulation::{DriverParams, SimulationDriver, TrialRun};
