//! Error taxonomy for a pre-receive invocation
//!
//! Rejections are not errors: a rule that refuses a push produces a
//! [`Decision`](crate::hooks::Decision). The variants here are the failures
//! that stop a run before it can reach a decision.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HookError {
    /// Missing or unreadable configuration, or an enabled checker that cannot run.
    #[error("configuration error: {0}")]
    Config(String),

    /// Repository access failed (open, object lookup, diff, staging I/O).
    #[error("repository error: {0:#}")]
    Infra(anyhow::Error),

    /// A stdin line that is not `<old> <new> <ref>`.
    #[error("invalid ref update line: {0}")]
    InvalidInput(String),
}

impl HookError {
    pub fn config(message: impl Into<String>) -> Self {
        HookError::Config(message.into())
    }

    /// Process exit status reported for this failure.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

impl From<anyhow::Error> for HookError {
    fn from(err: anyhow::Error) -> Self {
        HookError::Infra(err)
    }
}
