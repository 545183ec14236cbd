//! inwatch CLI - print inotify events for paths

use clap::{Parser, Subcommand};
use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;
mod config;
mod output;

/// inwatch - watch paths for filesystem events
#[derive(Parser)]
#[command(name = "inwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch paths and print one line per event
    Watch {
        /// Files or directories to watch
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Comma separated event kinds (default: all)
        #[arg(short, long)]
        events: Option<String>,

        /// Exit after this many events
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,

        /// TOML config file with a [session] table
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List event kinds and their bit values
    Kinds,
}

fn main() -> Result<()> {
    // Logs go to stderr, stdout carries events
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch { paths, events, count, json, config } => {
            cmd::watch::run(&paths, events.as_deref(), count, json, config.as_deref())
        }
        Commands::Kinds => cmd::kinds::run(),
    }
}
