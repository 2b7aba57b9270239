//! Command dispatch over the version controller.

pub mod engine_command;
