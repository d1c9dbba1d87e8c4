//! taskctl-core — data model, error taxonomy, and configuration shared by every
//! other crate in the workspace.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
