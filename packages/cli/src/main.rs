mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{init, inspect, repair, InitArgs, InspectArgs, RepairArgs};
use tracing_subscriber::EnvFilter;
use trellis_editor::EditorConfig;

/// Trellis CLI - inspect and repair block markup without an editor
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default trellis.config.json
    Init(InitArgs),

    /// List the blocks found in a markup file
    Inspect(InspectArgs),

    /// Import every block, reconcile, and write the repaired markup
    Repair(RepairArgs),
}

fn init_tracing(config: &EditorConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = EditorConfig::load(&cwd)?;
    init_tracing(&config);

    match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Inspect(args) => inspect(args, config),
        Command::Repair(args) => repair(args, config),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
