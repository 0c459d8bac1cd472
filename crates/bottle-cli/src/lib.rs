//! Bottle CLI library
//!
//! Argument parsing, layered configuration and the command handlers behind
//! the `bottle` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::{Cli, Commands};
pub use commands::CommandDispatcher;
pub use config::AppConfig;
pub use error::{CliError, Result};
