//! Trellis CLI - page hierarchy and navigation maintenance.
//!
//! Provides commands for:
//! - `check`: Verify page tree invariants of a snapshot
//! - `tree`: Print the page tree
//! - `resolve`: Resolve a path through the redirect ledger
//! - `menu`: Print a menu's navigation tree
//! - `regenerate`: Rebuild auto menus

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CheckArgs, MenuArgs, RegenerateArgs, ResolveArgs, TreeArgs};
use output::Output;

/// Trellis - page hierarchy and navigation maintenance.
#[derive(Parser)]
#[command(name = "trellis", version, about)]
struct Cli {
    /// Enable verbose output (engine commit and regeneration logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify page tree invariants.
    Check(CheckArgs),
    /// Print the page tree.
    Tree(TreeArgs),
    /// Resolve a path through the redirect ledger.
    Resolve(ResolveArgs),
    /// Print a menu's navigation tree.
    Menu(MenuArgs),
    /// Rebuild auto menus from the page tree.
    Regenerate(RegenerateArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Check(args) => args.execute(),
        Commands::Tree(args) => args.execute(),
        Commands::Resolve(args) => args.execute(),
        Commands::Menu(args) => args.execute(),
        Commands::Regenerate(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
