//! History-rewriting commands: rollback, revert, cherry-pick, janitor.

use chrono::Utc;
use clap::Args;
use revlex_engine::{apply_engine_command, EngineCommand, Outcome, RollbackMode, RollbackRequest};
use serde_json::Value;

use super::{respond, Controller};

#[derive(Debug, Args)]
pub struct RequestArgs {
    #[arg(long, default_value = "cli")]
    pub actor: String,

    #[arg(long)]
    pub reason: Option<String>,
}

impl RequestArgs {
    fn request(&self) -> RollbackRequest {
        let request = RollbackRequest::new(&self.actor);
        match &self.reason {
            Some(reason) => request.with_reason(reason),
            None => request,
        }
    }
}

#[derive(Debug, Args)]
pub struct RollbackArgs {
    pub customization_id: String,

    /// Finalized sequence to restore
    pub target_seq: u64,

    /// Seed a new customization instead of rewinding this one
    #[arg(long)]
    pub branch: bool,

    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Debug, Args)]
pub struct RevertArgs {
    pub customization_id: String,

    /// Sequences to undo
    #[arg(required = true, num_args = 1..)]
    pub sequences: Vec<u64>,

    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Debug, Args)]
pub struct CherryPickArgs {
    pub source_id: String,

    pub target_id: String,

    /// Source sequences to apply (comma separated or repeated)
    #[arg(long = "seq", required = true, value_delimiter = ',')]
    pub sequences: Vec<u64>,

    #[arg(long, default_value = "cli")]
    pub actor: String,
}

pub fn rollback(vc: &Controller, args: RollbackArgs) -> Outcome<Value> {
    let mode = if args.branch {
        RollbackMode::Branch
    } else {
        RollbackMode::InPlace
    };
    respond(apply_engine_command(
        vc,
        EngineCommand::Rollback {
            customization_id: args.customization_id,
            target_seq: args.target_seq,
            mode,
            request: args.request.request(),
        },
    ))
}

pub fn revert(vc: &Controller, args: RevertArgs) -> Outcome<Value> {
    respond(apply_engine_command(
        vc,
        EngineCommand::Revert {
            customization_id: args.customization_id,
            sequences: args.sequences,
            request: args.request.request(),
        },
    ))
}

pub fn cherry_pick(vc: &Controller, args: CherryPickArgs) -> Outcome<Value> {
    respond(apply_engine_command(
        vc,
        EngineCommand::CherryPick {
            source_id: args.source_id,
            sequences: args.sequences,
            target_id: args.target_id,
            actor: args.actor,
        },
    ))
}

/// One janitor pass using the configured TTLs
pub fn janitor(vc: &Controller) -> Outcome<Value> {
    respond(vc.run_janitor(Utc::now()))
}
