//! taskctl-sandbox — the Sandbox Executor, File Manager, Search Manager, and
//! per-agent State. The only crate in the workspace that touches a real
//! filesystem or spawns a process.

pub mod error;
pub mod exec;
pub mod files;
pub mod search;
pub mod state;

pub use error::SandboxError;
pub use exec::SandboxExecutor;
pub use files::FileManager;
pub use search::SearchManager;
pub use state::{AgentState, TodoItem};
