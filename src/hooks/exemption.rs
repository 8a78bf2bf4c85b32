//! One-time exemption tokens
//!
//! A commit message carrying `[A]<code>[/A]` is exempt from the remaining
//! rules when a file named `<code>` exists in the exemption directory.
//! Redeeming a token deletes that file, and only a successful delete grants
//! the exemption, so two concurrent pushes can never both use one token.

use lazy_static::lazy_static;
use regex::Regex;
use std::io::ErrorKind;
use std::path::PathBuf;

lazy_static! {
    static ref TOKEN_PATTERN: Regex = Regex::new(r"\[A\]([0-9]+)\[/A\]").unwrap();
}

/// First exemption code in `message`. Only digit sequences are ever returned.
pub fn find_token(message: &str) -> Option<&str> {
    TOKEN_PATTERN
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|code| code.as_str())
}

#[derive(Debug, Clone, Default)]
pub struct ExemptionStore {
    dir: Option<PathBuf>,
}

impl ExemptionStore {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    fn token_path(&self, code: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(code))
    }

    /// Delete the token file. True only if this call removed it.
    pub fn consume(&self, code: &str) -> bool {
        let Some(path) = self.token_path(code) else {
            return false;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("exemption code {} redeemed", code);
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("exemption code {} not present or already used", code);
                false
            }
            Err(e) => {
                tracing::warn!("failed to redeem exemption code {}: {}", code, e);
                false
            }
        }
    }

    /// Find a token in `message` and consume it. Returns the redeemed code.
    pub fn redeem<'m>(&self, message: &'m str) -> Option<&'m str> {
        let code = find_token(message)?;
        self.consume(code).then_some(code)
    }
}
