//! CLI for building a consistent hash ring from `--server` flags and
//! inspecting key placement and distribution against it.

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
