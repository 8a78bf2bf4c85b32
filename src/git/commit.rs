//! Commit metadata extraction
//!
//! Pulls the fields the gates read out of a commit: author email, message,
//! JIRA-style identifiers and the merge-keyword flag.

use super::CommitInfo;
use regex::Regex;
use std::collections::BTreeSet;

/// Read-only view of the pushed commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMetadata {
    pub id: String,
    pub author_email: String,
    pub message: String,
    /// Distinct identifiers matched by the JIRA pattern, sorted
    pub jira_ids: Vec<String>,
    pub is_merge_commit: bool,
}

impl CommitMetadata {
    pub fn extract(commit: &CommitInfo, jira: Option<&Regex>, merge_keywords: &[String]) -> Self {
        Self {
            id: commit.id.clone(),
            author_email: commit.author_email.clone(),
            message: commit.message.clone(),
            jira_ids: jira
                .map(|re| extract_jira_ids(re, &commit.message))
                .unwrap_or_default(),
            is_merge_commit: contains_merge_keyword(&commit.message, merge_keywords),
        }
    }

    pub fn email_domain(&self) -> Option<&str> {
        email_domain(&self.author_email)
    }
}

/// Domain part of an email address. `None` when there is no `@`.
pub fn email_domain(email: &str) -> Option<&str> {
    email.split_once('@').map(|(_, domain)| domain)
}

/// Collect every non-empty match and capture group of `re` in `message`.
pub fn extract_jira_ids(re: &Regex, message: &str) -> Vec<String> {
    let mut ids = BTreeSet::new();
    for caps in re.captures_iter(message) {
        for group in caps.iter().flatten() {
            if !group.as_str().is_empty() {
                ids.insert(group.as_str().to_string());
            }
        }
    }
    ids.into_iter().collect()
}

pub fn contains_merge_keyword(message: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|key| !key.is_empty() && message.contains(key.as_str()))
}
