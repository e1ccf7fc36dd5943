use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// discord-notifier – post templated messages to a Discord channel
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Activate verbose output (-v, -vv, etc.)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true, env = "DISCORD_NOTIFIER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one message per incoming event
    Receive {
        /// JSON array or JSON lines of events ("-" for stdin)
        #[arg(short, long, value_name = "FILE", default_value = "-")]
        events: PathBuf,

        /// Print emitted events instead of storing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Send one message with no event context
    Check {
        /// Print emitted events instead of storing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate the agent options and list every problem
    Validate,
    /// Report whether the agent is working (exit code 1 if not)
    Health,
    /// Print build information
    Version {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
