//! Command-line interface for pushgate
//!
//! With no subcommand the binary behaves as a `pre-receive` hook: it reads
//! ref updates on stdin and exits nonzero when any of them is refused.

pub mod commands;
pub mod output;

pub use commands::Cli;
pub use output::Output;
