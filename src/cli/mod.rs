// ABOUTME: Command line interface for the conductor workflow orchestrator
// ABOUTME: Wires argument parsing, logging initialization, and command dispatch

pub mod args;
pub mod commands;

pub use args::{Args, Commands};

use anyhow::Result;
use tracing_subscriber::EnvFilter;

pub struct App;

impl App {
    pub fn new() -> Self {
        Self
    }

    /// Initialize logging before any command runs.
    pub fn init_logging(&self, verbose: bool, no_color: bool) {
        let default_level = if verbose { "debug" } else { "info" };
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(!no_color)
            .with_target(false)
            .init();
    }

    /// Run the application with parsed arguments.
    pub async fn run(&self, args: Args) -> Result<()> {
        self.init_logging(args.verbose, args.no_color);

        match args.command {
            Commands::Run {
                workflow,
                vars,
                mode,
                max_parallel,
                json,
            } => {
                let variables = Args::parse_variables(&vars)?;
                commands::run(&workflow, variables, mode, max_parallel, json).await
            }
            Commands::Validate { workflow } => commands::validate(&workflow),
            Commands::Plan { workflow } => commands::plan(&workflow),
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
