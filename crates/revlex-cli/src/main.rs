//! Revlex CLI
//!
//! Command-line interface for versioned text customizations. Every
//! subcommand prints a JSON `{success, data?, error?, details?}` envelope
//! and exits non-zero on failure.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use revlex_core::logging_facility::{self, Profile};
use revlex_engine::{EngineConfig, Outcome};
use serde_json::Value;

mod commands;

use commands::{customization, delta, snapshot};

#[derive(Debug, Parser)]
#[command(name = "revlex")]
#[command(about = "Revlex - versioned text customizations", long_about = None)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, default_value = ".revlex/revlex.db")]
    db: PathBuf,

    /// Engine configuration (TOML); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a customization from a baseline text
    Create(customization::CreateArgs),
    /// Replace the current text (amends the open snapshot)
    Edit(customization::EditArgs),
    /// Apply a JSON patch, gated by conflict analysis
    Patch(customization::PatchArgs),
    /// Finalize the open snapshot
    Finalize(customization::IdArgs),
    /// One line per snapshot
    Log(customization::IdArgs),
    /// Current state, or the text at a sequence
    Show(customization::ShowArgs),
    /// Restore a finalized sequence
    Rollback(snapshot::RollbackArgs),
    /// Undo specific sequences, keeping later changes
    Revert(snapshot::RevertArgs),
    /// Apply sequences of one customization to another
    CherryPick(snapshot::CherryPickArgs),
    /// Delta between two versions
    Diff(delta::DiffArgs),
    /// Screen a patch without applying it
    Analyze(delta::AnalyzeArgs),
    /// Replay history and check every hash
    Verify(customization::IdArgs),
    /// Expunge abandoned work now
    Janitor,
}

fn run(cli: Cli) -> Outcome<Value> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path),
        None => Ok(EngineConfig::default()),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => return Outcome::failure(&err),
    };
    logging_facility::init(config.profile().unwrap_or(Profile::Development));
    tracing::debug!(component = "cli", db = %cli.db.display(), "opening ledger");

    let vc = match commands::open_controller(&cli.db, config) {
        Ok(vc) => vc,
        Err(err) => return Outcome::failure(&err),
    };

    match cli.command {
        Commands::Create(args) => customization::create(&vc, args),
        Commands::Edit(args) => customization::edit(&vc, args),
        Commands::Patch(args) => customization::patch(&vc, args),
        Commands::Finalize(args) => customization::finalize(&vc, args),
        Commands::Log(args) => customization::log(&vc, args),
        Commands::Show(args) => customization::show(&vc, args),
        Commands::Rollback(args) => snapshot::rollback(&vc, args),
        Commands::Revert(args) => snapshot::revert(&vc, args),
        Commands::CherryPick(args) => snapshot::cherry_pick(&vc, args),
        Commands::Diff(args) => delta::diff(&vc, args),
        Commands::Analyze(args) => delta::analyze(&vc, args),
        Commands::Verify(args) => customization::verify(&vc, args),
        Commands::Janitor => snapshot::janitor(&vc),
    }
}

fn main() -> ExitCode {
    let outcome = run(Cli::parse());

    match serde_json::to_string_pretty(&outcome) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }
    if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
