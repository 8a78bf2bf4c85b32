//! Commit log emission
//!
//! After a run decides, a record of the pushed commit is built and, when the
//! HTTP sink is enabled, posted as JSON. Every failure here is soft: callers
//! report it and keep the decision they already have.

use crate::config::HttpSinkConfig;
use crate::git::commit::CommitMetadata;
use crate::git::{FileStat, ObjectSource};
use crate::hooks::{PipelineRun, ProjectPath, PushRequest};
use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use std::time::Duration;

/// Body posted to the commit log receiver
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitLog {
    pub author: String,
    pub old_ref: String,
    pub new_ref: String,
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub namespace: String,
    pub repos: String,
    pub jira_ids: Vec<String>,
    pub file_stats: Vec<FileStat>,
    pub message: String,
}

impl CommitLog {
    pub fn new(
        request: &PushRequest,
        project: &ProjectPath,
        commit: &CommitMetadata,
        file_stats: Vec<FileStat>,
    ) -> Self {
        Self {
            author: commit.author_email.clone(),
            old_ref: request.old_ref().to_string(),
            new_ref: request.new_ref().to_string(),
            ref_name: request.ref_name().to_string(),
            namespace: project.namespace.clone(),
            repos: project.repository.clone(),
            jira_ids: commit.jira_ids.clone(),
            file_stats,
            message: commit.message.clone(),
        }
    }
}

/// What happened to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    Sent,
    /// Built but the HTTP sink is disabled
    Disabled,
    /// Nothing to log: merge request or no commit
    Skipped,
}

pub struct CommitLogEmitter {
    config: HttpSinkConfig,
}

impl CommitLogEmitter {
    pub fn new(config: &HttpSinkConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Build and send the record for a finished run
    pub async fn emit(
        &self,
        source: &dyn ObjectSource,
        project: &ProjectPath,
        request: &PushRequest,
        run: &PipelineRun,
    ) -> Result<Emission> {
        let Some(commit) = &run.commit else {
            return Ok(Emission::Skipped);
        };
        if run.decision.merge_request {
            tracing::debug!("merge request, commit log skipped");
            return Ok(Emission::Skipped);
        }

        let stats = source
            .numstat(request.old_ref(), request.new_ref())
            .context("Failed to collect file stats for the commit log")?;
        let record = CommitLog::new(request, project, commit, stats);

        if !self.config.enable {
            tracing::debug!("commit log: {}", serde_json::to_string(&record)?);
            return Ok(Emission::Disabled);
        }
        self.post(&record).await?;
        Ok(Emission::Sent)
    }

    pub async fn post(&self, record: &CommitLog) -> Result<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let response = client
            .post(&self.config.receive_url)
            .headers(self.headers()?)
            .json(record)
            .send()
            .await
            .with_context(|| format!("Failed to send commit log to {}", self.config.receive_url))?;

        let status = response.status();
        if status != StatusCode::OK {
            bail!("commit log receiver answered {status}");
        }
        tracing::info!("commit log sent to {}", self.config.receive_url);
        Ok(())
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.config.header {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid header name '{name}'"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for header '{name}'"))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}
