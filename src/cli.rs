//! CLI argument parsing for the dispatch-scheduler binary.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dispatch-scheduler", about = "Daily route-and-schedule optimizer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server (default if no subcommand given)
    Serve,
    /// Run pending database migrations and exit
    Migrate,
}
