//! CLI argument parsing for the tournee-planner binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tournee-planner", about = "Delivery round planning worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the worker server (default if no subcommand given)
    Serve,
    /// Run database migrations and exit
    Migrate,
    /// Plan one request read from a JSON file and print the outcome
    Plan {
        /// Planning request (JSON)
        #[arg(long)]
        input: PathBuf,
        /// Write the outcome here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}
