//! Read-only delta commands: diff between versions and patch analysis.

use clap::Args;
use revlex_core::diff::unified::{unified_delta_with, DEFAULT_CONTEXT};
use revlex_core::diff::{compute_delta, render_human_summary};
use revlex_engine::Outcome;
use serde_json::{json, Value};

use super::{respond, Controller, PatchInput};

#[derive(Debug, Args)]
pub struct DiffArgs {
    pub customization_id: String,

    /// Older sequence
    #[arg(long, default_value_t = 1)]
    pub from: u64,

    /// Newer sequence (the current text when omitted)
    #[arg(long)]
    pub to: Option<u64>,

    /// Unchanged lines of context around each hunk
    #[arg(long, default_value_t = DEFAULT_CONTEXT)]
    pub context: usize,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    pub customization_id: String,

    #[command(flatten)]
    pub input: PatchInput,
}

pub fn diff(vc: &Controller, args: DiffArgs) -> Outcome<Value> {
    let id = &args.customization_id;
    let texts = vc.reconstruct(id, args.from).and_then(|before| {
        let after = match args.to {
            Some(seq) => vc.reconstruct(id, seq)?,
            None => vc.customization(id)?.current_text,
        };
        Ok((before, after))
    });
    respond(texts.map(|(before, after)| {
        let delta = compute_delta(&before, &after);
        let new_label = args
            .to
            .map_or_else(|| "current".to_string(), |seq| format!("seq {}", seq));
        let unified = unified_delta_with(
            &before,
            &after,
            args.context,
            &format!("seq {}", args.from),
            &new_label,
        );
        json!({
            "customization_id": id,
            "from": args.from,
            "to": args.to,
            "summary": render_human_summary(&delta.line_delta),
            "stats": delta.stats,
            "unified": unified.render(),
        })
    }))
}

pub fn analyze(vc: &Controller, args: AnalyzeArgs) -> Outcome<Value> {
    respond(args.input.read().and_then(|patch| {
        let report = vc.analyze(&args.customization_id, &patch)?;
        Ok(json!({
            "recommended_action": report.recommended_action(),
            "report": report,
        }))
    }))
}
