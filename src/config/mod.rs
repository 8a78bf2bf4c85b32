//! Rule configuration for the pre-receive gate
//!
//! `RuleConfig` holds every enforcement parameter. It is loaded once per
//! process (see [`core::ConfigLoader`]) and passed by reference into the
//! pipeline; nothing reads configuration from global state.

pub mod core;
pub mod smart_load;

use crate::error::HookError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use self::core::ConfigLoader;

/// Complete set of enforcement parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Remove staged files after each run. Set to false to inspect them.
    pub clear_cache: bool,

    /// Directory holding one-time exemption token files
    pub code_exemption_dir: Option<PathBuf>,

    /// Author email domains allowed to push
    pub allow_email: Vec<String>,

    /// Branch short names that refuse direct pushes
    pub protect_branch: Vec<String>,

    /// Author emails that skip every rule after the domain check
    pub super_account: Vec<String>,

    /// Namespaces whose repositories are not checked
    pub ignore_namespace: Vec<String>,

    /// Repository names that are not checked
    pub ignore_repos: Vec<String>,

    /// Pattern every commit message must match; empty disables the rule
    pub require_jira_id_regexp: String,

    /// Message fragments that mark a web push as a merge request
    pub merge_keywords: Vec<String>,

    /// Upper bound for a single checker run
    pub checker_timeout_secs: u64,

    /// Style checkers keyed by file-type tag (`go` or `.go`)
    pub style_check: BTreeMap<String, CheckerConfig>,

    /// Commit log collection
    pub commit_log_hook: CommitLogHookConfig,
}

/// One external style checker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub enable: bool,

    /// Executable path, or a bare name resolved on `PATH`
    pub path: String,

    /// Arguments placed before the staging root
    pub args: Vec<String>,

    /// Append the staging root as the last argument.
    /// Tools that only lint their working directory set this to false.
    #[serde(default = "default_pass_root")]
    pub pass_root: bool,
}

fn default_pass_root() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitLogHookConfig {
    pub http: HttpSinkConfig,
}

/// HTTP receiver for commit log records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSinkConfig {
    pub enable: bool,
    pub receive_url: String,
    pub header: BTreeMap<String, String>,
    pub timeout_secs: u64,
}

impl Default for HttpSinkConfig {
    fn default() -> Self {
        Self {
            enable: false,
            receive_url: String::new(),
            header: BTreeMap::new(),
            timeout_secs: 3,
        }
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            clear_cache: true,
            code_exemption_dir: None,
            allow_email: vec![],
            protect_branch: vec![],
            super_account: vec![],
            ignore_namespace: vec![],
            ignore_repos: vec![],
            require_jira_id_regexp: String::new(),
            merge_keywords: vec!["合并分支".to_string(), "Merge".to_string()],
            checker_timeout_secs: 300,
            style_check: BTreeMap::new(),
            commit_log_hook: CommitLogHookConfig::default(),
        }
    }
}

/// Normalize a file-type tag to its dotted lowercase form (`Go` -> `.go`)
pub fn normalize_tag(tag: &str) -> String {
    let tag = tag.trim().trim_start_matches('.').to_lowercase();
    format!(".{tag}")
}

impl RuleConfig {
    /// Compile the JIRA requirement pattern. `None` when the rule is disabled.
    pub fn jira_pattern(&self) -> Result<Option<Regex>, HookError> {
        if self.require_jira_id_regexp.is_empty() {
            return Ok(None);
        }
        Regex::new(&self.require_jira_id_regexp)
            .map(Some)
            .map_err(|e| {
                HookError::config(format!(
                    "require_jira_id_regexp '{}' does not compile: {e}",
                    self.require_jira_id_regexp
                ))
            })
    }

    /// Enabled checkers with their normalized tags
    pub fn enabled_checkers(&self) -> impl Iterator<Item = (String, &CheckerConfig)> {
        self.style_check
            .iter()
            .filter(|(_, checker)| checker.enable)
            .map(|(tag, checker)| (normalize_tag(tag), checker))
    }

    /// Whether `branch_ref` (e.g. `refs/heads/main`) names a protected branch.
    /// Exact match only: `refs/heads/release-2` does not match `release`.
    pub fn is_protected_ref(&self, branch_ref: &str) -> bool {
        self.protect_branch
            .iter()
            .any(|name| branch_ref.strip_prefix("refs/heads/") == Some(name.as_str()))
    }

    /// Validate everything that must hold before any gate runs
    pub fn validate(&self) -> Result<(), HookError> {
        self.jira_pattern()?;

        if self.checker_timeout_secs == 0 {
            return Err(HookError::config("checker_timeout_secs cannot be 0"));
        }

        let mut seen = std::collections::BTreeSet::new();
        for (tag, checker) in self.enabled_checkers() {
            if tag == "." {
                return Err(HookError::config("style_check has an entry with an empty file type"));
            }
            if !seen.insert(tag.clone()) {
                return Err(HookError::config(format!(
                    "style_check configures {tag} more than once"
                )));
            }
            crate::external::checkers::resolve_program(&tag, &checker.path)?;
        }

        let http = &self.commit_log_hook.http;
        if http.enable && http.receive_url.is_empty() {
            return Err(HookError::config(
                "commit_log_hook.http is enabled but receive_url is empty",
            ));
        }

        if self.allow_email.is_empty() {
            tracing::warn!("allow_email is empty, every push will be rejected");
        }

        Ok(())
    }
}
