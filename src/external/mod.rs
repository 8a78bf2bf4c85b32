//! Collaborators outside the repository: style checkers and the commit log receiver

pub mod checkers;
pub mod commit_log;

pub use checkers::{CheckReport, CheckStatus, Checker};
pub use commit_log::{CommitLog, CommitLogEmitter, Emission};
