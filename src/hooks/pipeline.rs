//! Pipeline driver
//!
//! Runs the gates in order for one ref update and, when every metadata gate
//! continues, stages the changed files and dispatches them to the configured
//! checkers.

use super::context::{ProjectPath, PushRequest};
use super::exemption::ExemptionStore;
use super::gates::{Gate, GateContext, GateOutcome, default_gates};
use super::staging::StagingArea;
use crate::config::{RuleConfig, normalize_tag};
use crate::error::HookError;
use crate::external::checkers::{CheckReport, Checker};
use crate::git::commit::CommitMetadata;
use crate::git::{FileMode, ObjectSource};
use anyhow::Context;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accept,
    Reject,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Accept => f.write_str("accepted"),
            Outcome::Reject => f.write_str("rejected"),
        }
    }
}

/// Final verdict of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub outcome: Outcome,
    /// Name of the deciding gate
    pub gate: &'static str,
    pub reason: String,
    pub details: Vec<String>,
    /// Accepted as a merge request; no commit log is emitted
    pub merge_request: bool,
}

impl Decision {
    pub fn accept(gate: &'static str, reason: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Accept,
            gate,
            reason: reason.into(),
            details: Vec::new(),
            merge_request: false,
        }
    }

    pub fn reject(gate: &'static str, reason: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Reject,
            ..Self::accept(gate, reason)
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn is_accept(&self) -> bool {
        self.outcome == Outcome::Accept
    }

    pub fn exit_code(&self) -> u8 {
        match self.outcome {
            Outcome::Accept => 0,
            Outcome::Reject => 1,
        }
    }
}

/// Decision plus the commit it was made for. `commit` is `None` when the
/// update deleted the ref.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub decision: Decision,
    pub commit: Option<CommitMetadata>,
    /// Staging root left on disk for inspection
    pub kept_staging: Option<PathBuf>,
}

pub struct Pipeline<'a> {
    config: &'a RuleConfig,
    gates: Vec<Box<dyn Gate>>,
    jira: Option<Regex>,
    checkers: BTreeMap<String, Checker>,
    exemptions: ExemptionStore,
    keep_staging: bool,
}

impl<'a> Pipeline<'a> {
    /// Build a pipeline, validating the configuration up front. Every enabled
    /// checker must resolve even if the push never touches its file type.
    pub fn new(config: &'a RuleConfig) -> Result<Self, HookError> {
        config.validate()?;

        let timeout = Duration::from_secs(config.checker_timeout_secs);
        let mut checkers = BTreeMap::new();
        for (tag, checker) in config.enabled_checkers() {
            let checker = Checker::from_config(&tag, checker, timeout)?;
            tracing::debug!("{} checker: {}", tag, checker.program().display());
            checkers.insert(tag, checker);
        }

        Ok(Self {
            config,
            gates: default_gates(),
            jira: config.jira_pattern()?,
            checkers,
            exemptions: ExemptionStore::new(config.code_exemption_dir.clone()),
            keep_staging: !config.clear_cache,
        })
    }

    pub fn with_keep_staging(mut self, keep: bool) -> Self {
        self.keep_staging = self.keep_staging || keep;
        self
    }

    pub fn gate_names(&self) -> Vec<&'static str> {
        self.gates.iter().map(|gate| gate.name()).collect()
    }

    /// Decide one ref update
    pub async fn run(
        &self,
        source: &dyn ObjectSource,
        project: &ProjectPath,
        request: &PushRequest,
    ) -> Result<PipelineRun, HookError> {
        if request.is_deletion() {
            return Ok(PipelineRun {
                decision: Decision::accept("ref-deletion", "ref deleted, nothing to check"),
                commit: None,
                kept_staging: None,
            });
        }

        let info = source.commit(request.new_ref())?;
        let commit = CommitMetadata::extract(&info, self.jira.as_ref(), &self.config.merge_keywords);
        tracing::debug!("commit {} by {}, jira ids {:?}", commit.id, commit.author_email, commit.jira_ids);

        let mut kept_staging = None;
        let decision = match self.evaluate_gates(request, project, &commit) {
            Some(decision) => decision,
            None if self.checkers.is_empty() => {
                Decision::accept("style-check", "no style checks enabled")
            }
            None => {
                let mut staging = StagingArea::create(self.keep_staging)?;
                if staging.is_kept() {
                    kept_staging = Some(staging.path().to_path_buf());
                }
                self.check_style(source, request, &mut staging).await?
            }
        };

        Ok(PipelineRun {
            decision,
            commit: Some(commit),
            kept_staging,
        })
    }

    fn evaluate_gates(
        &self,
        request: &PushRequest,
        project: &ProjectPath,
        commit: &CommitMetadata,
    ) -> Option<Decision> {
        let ctx = GateContext {
            config: self.config,
            request,
            project,
            commit,
            exemptions: &self.exemptions,
        };

        for gate in &self.gates {
            match gate.evaluate(&ctx) {
                GateOutcome::Continue => {
                    tracing::trace!("{} gate: continue", gate.name());
                }
                GateOutcome::Accept(reason) => {
                    tracing::info!("{} gate accepted: {}", gate.name(), reason);
                    let mut decision = Decision::accept(gate.name(), reason);
                    decision.merge_request = gate.marks_merge_request();
                    return Some(decision);
                }
                GateOutcome::Reject(reason) => {
                    tracing::info!("{} gate rejected: {}", gate.name(), reason);
                    return Some(Decision::reject(gate.name(), reason));
                }
            }
        }
        None
    }

    /// Stage changed files by type and run one checker per staged type
    async fn check_style(
        &self,
        source: &dyn ObjectSource,
        request: &PushRequest,
        staging: &mut StagingArea,
    ) -> Result<Decision, HookError> {
        let changes = source.diff(request.old_ref(), request.new_ref())?;

        for change in &changes {
            let Some(file) = &change.new_file else {
                tracing::trace!("skip deleted {}", change.path);
                continue;
            };
            if file.mode != FileMode::Regular {
                tracing::trace!("skip {} with mode {:?}", change.path, file.mode);
                continue;
            }
            let Some(tag) = file_tag(&change.path) else {
                continue;
            };
            if !self.checkers.contains_key(&tag) {
                continue;
            }
            let content = source.blob(&file.blob)?;
            staging
                .stage(&tag, &change.path, &content)
                .with_context(|| format!("Failed to stage {}", change.path))?;
        }

        let buckets = staging.buckets()?;
        if buckets.is_empty() {
            return Ok(Decision::accept("style-check", "no files to check"));
        }

        let mut failures: Vec<CheckReport> = Vec::new();
        for bucket in &buckets {
            let Some(checker) = self.checkers.get(&bucket.tag) else {
                continue;
            };
            tracing::info!("checking {} {} file(s)", bucket.files.len(), bucket.tag);
            let report = checker.run(&bucket.root).await;
            if !report.passed() {
                failures.push(report);
            }
        }

        let Some(first) = failures.first() else {
            let checked: Vec<&str> = buckets.iter().map(|b| b.tag.as_str()).collect();
            return Ok(Decision::accept(
                "style-check",
                format!("style check passed for {}", checked.join(", ")),
            ));
        };
        let details = failures.iter().map(CheckReport::describe).collect();
        Ok(Decision::reject("style-check", first.describe()).with_details(details))
    }
}

/// Dotted lowercase extension of `path`, if any
fn file_tag(path: &str) -> Option<String> {
    let ext = Path::new(path).extension()?.to_str()?;
    if ext.is_empty() {
        return None;
    }
    Some(normalize_tag(ext))
}
