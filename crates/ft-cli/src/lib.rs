//! Focus tracker CLI library.
//!
//! Holds the subcommands behind the `ft` binary: the tracker that reads
//! browser events, and the collector that stores and reports sessions.

pub mod bridge;
mod cli;
pub mod commands;
mod config;
pub mod server;

pub use cli::{Cli, Commands};
pub use config::Config;
