//! Top-level error enum composing each crate boundary's own taxonomy.
//!
//! Only `Config::from_env` fails outright at this crate's edge — everything
//! inside `perform_task` itself is folded into `Stats`/`final_message`
//! rather than unwinding. `anyhow` is reserved for the CLI binary's own
//! wiring on top of this.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskctlError {
    #[error(transparent)]
    Core(#[from] taskctl_core::Error),
}

pub type Result<T> = std::result::Result<T, TaskctlError>;
