//! External style checker invocation
//!
//! A checker is any executable that lints a directory of staged files and
//! reports through its exit status: 0 passes, anything else fails. Output is
//! forwarded to the pusher unchanged.

use crate::config::CheckerConfig;
use crate::error::HookError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Resolve a configured checker executable.
///
/// Bare names are looked up on `PATH`; anything containing a path separator
/// must exist as given.
pub fn resolve_program(tag: &str, path: &str) -> Result<PathBuf, HookError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(HookError::config(format!(
            "style_check{tag} is enabled but its path is empty"
        )));
    }

    if !path.contains(std::path::MAIN_SEPARATOR) {
        return which::which(path).map_err(|e| {
            HookError::config(format!("style_check{tag}: can't find '{path}' on PATH: {e}"))
        });
    }

    let program = PathBuf::from(path);
    std::fs::metadata(&program).map_err(|e| {
        HookError::config(format!("style_check{tag}: can't stat {path}: {e}"))
    })?;
    Ok(program)
}

#[derive(Debug, Clone)]
pub struct Checker {
    tag: String,
    program: PathBuf,
    args: Vec<String>,
    pass_root: bool,
    timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Passed,
    Failed(Option<i32>),
    TimedOut,
    SpawnFailed(String),
}

#[derive(Debug, Clone)]
pub struct CheckReport {
    pub tag: String,
    pub status: CheckStatus,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Passed
    }

    pub fn describe(&self) -> String {
        match &self.status {
            CheckStatus::Passed => format!("{} style check passed", self.tag),
            CheckStatus::Failed(Some(code)) => {
                format!("{} style check was rejected (exit status {code})", self.tag)
            }
            CheckStatus::Failed(None) => {
                format!("{} style check was rejected (terminated by signal)", self.tag)
            }
            CheckStatus::TimedOut => format!("{} style check timed out", self.tag),
            CheckStatus::SpawnFailed(e) => {
                format!("{} style check could not be started: {e}", self.tag)
            }
        }
    }
}

impl Checker {
    pub fn from_config(tag: &str, config: &CheckerConfig, timeout: Duration) -> Result<Self, HookError> {
        Ok(Self {
            tag: tag.to_string(),
            program: resolve_program(tag, &config.path)?,
            args: config.args.clone(),
            pass_root: config.pass_root,
            timeout,
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments passed for a bucket rooted at `root`
    pub fn command_args(&self, root: &Path) -> Vec<String> {
        let mut args = self.args.clone();
        if self.pass_root {
            args.push(root.display().to_string());
        }
        args
    }

    /// Run the checker over one staging bucket
    pub async fn run(&self, root: &Path) -> CheckReport {
        let args = self.command_args(root);
        tracing::info!(
            "running {} checker: {} {}",
            self.tag,
            self.program.display(),
            args.join(" ")
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return self.report(CheckStatus::SpawnFailed(e.to_string()));
            }
        };

        let status = match timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => CheckStatus::Passed,
            Ok(Ok(status)) => CheckStatus::Failed(status.code()),
            Ok(Err(e)) => CheckStatus::SpawnFailed(e.to_string()),
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!("failed to kill timed out {} checker: {}", self.tag, e);
                }
                CheckStatus::TimedOut
            }
        };
        self.report(status)
    }

    fn report(&self, status: CheckStatus) -> CheckReport {
        let report = CheckReport {
            tag: self.tag.clone(),
            status,
        };
        tracing::debug!("{}", report.describe());
        report
    }
}
