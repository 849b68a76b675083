//! CLI module for kongctl.

pub mod args;
pub mod commands;

pub use args::{AuthCommands, Cli, Commands, GetCommands, GlobalArgs, ShellType};
