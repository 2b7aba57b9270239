//! Subcommand implementations.
//!
//! Every subcommand returns an [`Outcome`] holding JSON data; `main` prints
//! it and derives the exit status from `success`.

pub mod customization;
pub mod delta;
pub mod snapshot;

use std::path::{Path, PathBuf};

use clap::Args;
use revlex_core::errors::{ExError, ExErrorKind};
use revlex_core::model::ChangeMeta;
use revlex_core::patch::Patch;
use revlex_engine::{EngineConfig, Outcome, VersionController};
use revlex_store::SqliteLedgerStore;
use serde::Serialize;
use serde_json::Value;

pub type Controller = VersionController<SqliteLedgerStore>;

/// Open the database (creating parent directories) under `config`
pub fn open_controller(db: &Path, config: EngineConfig) -> revlex_engine::Result<Controller> {
    if let Some(parent) = db.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error("open_db", parent, e))?;
    }
    let store = SqliteLedgerStore::open(db)?;
    Ok(VersionController::new(std::sync::Arc::new(store), config))
}

pub fn io_error(op: &str, path: &Path, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(op)
        .with_message(format!("{}: {}", path.display(), err))
}

/// Serialize a successful result into the envelope
pub fn respond<T: Serialize>(result: revlex_engine::Result<T>) -> Outcome<Value> {
    match result.and_then(|data| to_value(&data)) {
        Ok(value) => Outcome::ok(value),
        Err(err) => Outcome::failure(&err),
    }
}

pub fn to_value<T: Serialize>(data: &T) -> revlex_engine::Result<Value> {
    serde_json::to_value(data).map_err(|e| {
        ExError::new(ExErrorKind::Serialization)
            .with_op("render_output")
            .with_message(e.to_string())
    })
}

/// Text given inline or read from a file
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct TextInput {
    /// Text content
    #[arg(long)]
    pub text: Option<String>,

    /// Read the text from a file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl TextInput {
    pub fn read(&self) -> revlex_engine::Result<String> {
        match (&self.text, &self.file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => {
                std::fs::read_to_string(path).map_err(|e| io_error("read_input", path, e))
            }
            (None, None) => Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("read_input")
                .with_message("either --text or --file is required")),
        }
    }
}

/// JSON patch given inline or read from a file
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct PatchInput {
    /// Patch as a JSON array of operations
    #[arg(long)]
    pub patch: Option<String>,

    /// Read the patch JSON from a file
    #[arg(long)]
    pub patch_file: Option<PathBuf>,
}

impl PatchInput {
    pub fn read(&self) -> revlex_engine::Result<Patch> {
        let json = match (&self.patch, &self.patch_file) {
            (Some(json), _) => json.clone(),
            (None, Some(path)) => {
                std::fs::read_to_string(path).map_err(|e| io_error("read_patch", path, e))?
            }
            (None, None) => {
                return Err(ExError::new(ExErrorKind::InvalidInput)
                    .with_op("read_patch")
                    .with_message("either --patch or --patch-file is required"))
            }
        };
        Ok(Patch::from_json(&json)?)
    }
}

/// Who made an edit and how to describe it
#[derive(Debug, Args)]
pub struct MetaArgs {
    #[arg(long, default_value = "cli")]
    pub author: String,

    /// Change summary (generated from the diff when omitted)
    #[arg(long)]
    pub summary: Option<String>,

    /// Mark the change as produced by an assistant
    #[arg(long)]
    pub ai: bool,
}

impl MetaArgs {
    pub fn meta(&self) -> ChangeMeta {
        let meta = if self.ai {
            ChangeMeta::ai(&self.author)
        } else {
            ChangeMeta::manual(&self.author)
        };
        match &self.summary {
            Some(summary) => meta.with_summary(summary),
            None => meta,
        }
    }
}
