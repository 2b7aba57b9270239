//! Customization lifecycle commands: create, edit, patch, finalize, show,
//! log and verify.

use clap::Args;
use revlex_core::errors::ExErrorKind;
use revlex_engine::{apply_engine_command, EngineCommand, Outcome};
use serde_json::{json, Value};

use super::{respond, to_value, Controller, MetaArgs, PatchInput, TextInput};

#[derive(Debug, Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub input: TextInput,

    /// Owning scope
    #[arg(long, default_value = "default")]
    pub scope: String,

    #[arg(long, default_value = "cli")]
    pub author: String,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    pub customization_id: String,

    #[command(flatten)]
    pub input: TextInput,

    #[command(flatten)]
    pub meta: MetaArgs,

    /// Finalize the resulting snapshot immediately
    #[arg(long)]
    pub finalize: bool,
}

#[derive(Debug, Args)]
pub struct PatchArgs {
    pub customization_id: String,

    #[command(flatten)]
    pub input: PatchInput,

    #[command(flatten)]
    pub meta: MetaArgs,

    /// Apply even if the conflict analysis would block it
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct IdArgs {
    pub customization_id: String,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub customization_id: String,

    /// Show the text as of this sequence instead of the current state
    #[arg(long)]
    pub seq: Option<u64>,
}

pub fn create(vc: &Controller, args: CreateArgs) -> Outcome<Value> {
    respond(
        args.input
            .read()
            .and_then(|text| vc.create_customization(&text, &args.scope, &args.author)),
    )
}

pub fn edit(vc: &Controller, args: EditArgs) -> Outcome<Value> {
    respond(args.input.read().and_then(|text| {
        apply_engine_command(
            vc,
            EngineCommand::ApplyChange {
                customization_id: args.customization_id,
                text,
                meta: args.meta.meta(),
                finalize: args.finalize,
            },
        )
    }))
}

/// Apply a patch; a blocked patch reports the analysis in `details`
pub fn patch(vc: &Controller, args: PatchArgs) -> Outcome<Value> {
    let patch = match args.input.read() {
        Ok(patch) => patch,
        Err(err) => return Outcome::failure(&err),
    };
    let result = apply_engine_command(
        vc,
        EngineCommand::ApplyPatch {
            customization_id: args.customization_id.clone(),
            patch: patch.clone(),
            meta: args.meta.meta(),
            force: args.force,
        },
    );
    match result {
        Err(err) if err.kind() == ExErrorKind::ConflictBlocked => {
            let report = vc
                .analyze(&args.customization_id, &patch)
                .and_then(|report| to_value(&report));
            let outcome = Outcome::failure(&err);
            match report {
                Ok(report) => outcome.with_details(json!({ "report": report })),
                Err(_) => outcome,
            }
        }
        other => respond(other),
    }
}

pub fn finalize(vc: &Controller, args: IdArgs) -> Outcome<Value> {
    respond(apply_engine_command(
        vc,
        EngineCommand::Finalize {
            customization_id: args.customization_id,
        },
    ))
}

pub fn show(vc: &Controller, args: ShowArgs) -> Outcome<Value> {
    match args.seq {
        Some(seq) => respond(vc.reconstruct(&args.customization_id, seq).map(|text| {
            json!({
                "customization_id": args.customization_id,
                "sequence": seq,
                "text": text,
            })
        })),
        None => respond(vc.customization(&args.customization_id)),
    }
}

pub fn log(vc: &Controller, args: IdArgs) -> Outcome<Value> {
    respond(vc.change_log(&args.customization_id))
}

pub fn verify(vc: &Controller, args: IdArgs) -> Outcome<Value> {
    respond(vc.verify_integrity(&args.customization_id))
}
