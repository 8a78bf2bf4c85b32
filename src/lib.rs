//! # pushgate - server-side pre-receive gate
//!
//! Decides whether each ref update in a push is accepted. A pushed commit
//! goes through an ordered list of metadata gates (author email domain,
//! super accounts, ignored projects, one-time exemption codes, merge
//! requests, protected branches, JIRA ids). When no gate decides, the
//! changed files are staged per type and handed to external style
//! checkers. A commit log record is posted to an HTTP receiver afterwards.
//!
//! ## Installing
//!
//! ```bash
//! cp target/release/pushgate <repo>.git/hooks/pre-receive
//! cp pre-receive.yaml /etc/pre-receive.yaml
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod external;
pub mod git;
pub mod hooks;

pub use cli::{Cli, Output};
pub use config::RuleConfig;
pub use error::HookError;

/// Result type alias for pushgate plumbing
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
