//! Failures that abort a sandbox operation before it can even produce an
//! `ExecutionResult` — a process that never spawns, a turn-log directory that
//! can't be created. Everything else (not found, ambiguous edit, timeout,
//! non-zero exit) has a precise `ErrorKind` already and is returned as a
//! plain `ExecutionResult`; see `exec.rs`/`files.rs`/`search.rs`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("failed to spawn process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("sandbox unreachable: {0}")]
    Unreachable(String),
}
