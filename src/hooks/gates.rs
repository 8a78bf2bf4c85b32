//! Metadata gates
//!
//! Each gate inspects one aspect of the pushed commit and either decides the
//! run (`Accept` / `Reject`) or hands over to the next gate (`Continue`).
//! [`default_gates`] is the evaluation order.

use super::context::{ProjectPath, Protocol, PushRequest};
use super::exemption::ExemptionStore;
use crate::config::RuleConfig;
use crate::git::commit::CommitMetadata;

/// Result of a single gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Accept(String),
    Reject(String),
    Continue,
}

/// Everything a gate may read
pub struct GateContext<'a> {
    pub config: &'a RuleConfig,
    pub request: &'a PushRequest,
    pub project: &'a ProjectPath,
    pub commit: &'a CommitMetadata,
    pub exemptions: &'a ExemptionStore,
}

pub trait Gate {
    fn name(&self) -> &'static str;

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateOutcome;

    /// An `Accept` from this gate classifies the push as a merge request
    fn marks_merge_request(&self) -> bool {
        false
    }
}

/// The fixed gate order
pub fn default_gates() -> Vec<Box<dyn Gate>> {
    vec![
        Box::new(WebBranchCreationGate),
        Box::new(EmailDomainGate),
        Box::new(SuperAccountGate),
        Box::new(IgnoreNamespaceGate),
        Box::new(IgnoreRepositoryGate),
        Box::new(CodeExemptionGate),
        Box::new(MergeRequestGate),
        Box::new(ProtectedBranchGate),
        Box::new(JiraIdGate),
        // An exemption code can also waive a missing JIRA id
        Box::new(CodeExemptionGate),
        Box::new(NothingToDiffGate),
    ]
}

/// Branches created from the hosting UI skip every check
pub struct WebBranchCreationGate;

impl Gate for WebBranchCreationGate {
    fn name(&self) -> &'static str {
        "web-branch-creation"
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateOutcome {
        if ctx.request.is_creation() && ctx.request.protocol() == Protocol::Web {
            return GateOutcome::Accept("branch created from the web console".to_string());
        }
        GateOutcome::Continue
    }
}

pub struct EmailDomainGate;

impl Gate for EmailDomainGate {
    fn name(&self) -> &'static str {
        "email-domain"
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateOutcome {
        let allowed = ctx
            .commit
            .email_domain()
            .is_some_and(|domain| ctx.config.allow_email.iter().any(|d| d == domain));
        if allowed {
            return GateOutcome::Continue;
        }
        GateOutcome::Reject(format!(
            "git config user.email was not allowed: '{}', require one of {:?}, fix with: git config user.email $email",
            ctx.commit.author_email, ctx.config.allow_email
        ))
    }
}

pub struct SuperAccountGate;

impl Gate for SuperAccountGate {
    fn name(&self) -> &'static str {
        "super-account"
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateOutcome {
        if ctx.config.super_account.contains(&ctx.commit.author_email) {
            return GateOutcome::Accept("Hey, you commit with a super account!".to_string());
        }
        GateOutcome::Continue
    }
}

pub struct IgnoreNamespaceGate;

impl Gate for IgnoreNamespaceGate {
    fn name(&self) -> &'static str {
        "ignore-namespace"
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateOutcome {
        if ctx.config.ignore_namespace.contains(&ctx.project.namespace) {
            return GateOutcome::Accept(format!("namespace {} is ignored", ctx.project.namespace));
        }
        GateOutcome::Continue
    }
}

pub struct IgnoreRepositoryGate;

impl Gate for IgnoreRepositoryGate {
    fn name(&self) -> &'static str {
        "ignore-repository"
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateOutcome {
        if ctx.config.ignore_repos.contains(&ctx.project.repository) {
            return GateOutcome::Accept(format!("repository {} is ignored", ctx.project.repository));
        }
        GateOutcome::Continue
    }
}

pub struct CodeExemptionGate;

impl Gate for CodeExemptionGate {
    fn name(&self) -> &'static str {
        "code-exemption"
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateOutcome {
        match ctx.exemptions.redeem(&ctx.commit.message) {
            Some(code) => GateOutcome::Accept(format!(
                "congratulations, code exemption {code} triggered!"
            )),
            None => GateOutcome::Continue,
        }
    }
}

/// Web pushes carrying a merge keyword come from an accepted merge request
pub struct MergeRequestGate;

impl Gate for MergeRequestGate {
    fn name(&self) -> &'static str {
        "merge-request"
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateOutcome {
        if ctx.commit.is_merge_commit && ctx.request.protocol() == Protocol::Web {
            return GateOutcome::Accept("merge request".to_string());
        }
        GateOutcome::Continue
    }

    fn marks_merge_request(&self) -> bool {
        true
    }
}

pub struct ProtectedBranchGate;

impl Gate for ProtectedBranchGate {
    fn name(&self) -> &'static str {
        "protected-branch"
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateOutcome {
        if ctx.config.is_protected_ref(ctx.request.ref_name()) {
            return GateOutcome::Reject(format!(
                "{} is protected, can't push directly, open a merge request instead",
                ctx.request.ref_name()
            ));
        }
        GateOutcome::Continue
    }
}

pub struct JiraIdGate;

impl Gate for JiraIdGate {
    fn name(&self) -> &'static str {
        "jira-id"
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateOutcome {
        let pattern = &ctx.config.require_jira_id_regexp;
        if pattern.is_empty() || !ctx.commit.jira_ids.is_empty() {
            return GateOutcome::Continue;
        }
        GateOutcome::Reject(format!(
            "commit message must contain at least one jira ID, rule: {pattern}, use git commit --amend"
        ))
    }
}

/// Metadata rules passed; without two real commits there is nothing to lint
pub struct NothingToDiffGate;

impl Gate for NothingToDiffGate {
    fn name(&self) -> &'static str {
        "nothing-to-diff"
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateOutcome {
        if ctx.request.has_diff() {
            return GateOutcome::Continue;
        }
        GateOutcome::Accept("base rule check passed, commit not changed".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::ZERO_ID;
    use tempfile::TempDir;

    const OLD: &str = "1111111111111111111111111111111111111111";
    const NEW: &str = "2222222222222222222222222222222222222222";

    struct Fixture {
        config: RuleConfig,
        request: PushRequest,
        project: ProjectPath,
        commit: CommitMetadata,
        exemptions: ExemptionStore,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                config: RuleConfig {
                    allow_email: vec!["example.com".to_string()],
                    ..Default::default()
                },
                request: PushRequest::new(OLD, NEW, "refs/heads/feature", Protocol::Ssh),
                project: ProjectPath::parse("backend/api"),
                commit: CommitMetadata {
                    id: NEW.to_string(),
                    author_email: "dev@example.com".to_string(),
                    message: "PA-1 add feature".to_string(),
                    jira_ids: vec!["PA-1".to_string()],
                    is_merge_commit: false,
                },
                exemptions: ExemptionStore::default(),
            }
        }

        fn eval(&self, gate: &dyn Gate) -> GateOutcome {
            gate.evaluate(&GateContext {
                config: &self.config,
                request: &self.request,
                project: &self.project,
                commit: &self.commit,
                exemptions: &self.exemptions,
            })
        }
    }

    #[test]
    fn test_gate_order() {
        let names: Vec<&str> = default_gates().iter().map(|g| g.name()).collect();
        assert_eq!(
            names,
            vec![
                "web-branch-creation",
                "email-domain",
                "super-account",
                "ignore-namespace",
                "ignore-repository",
                "code-exemption",
                "merge-request",
                "protected-branch",
                "jira-id",
                "code-exemption",
                "nothing-to-diff",
            ]
        );
    }

    #[test]
    fn test_web_branch_creation() {
        let mut fx = Fixture::new();
        fx.request = PushRequest::new(ZERO_ID, NEW, "refs/heads/dev", Protocol::Web);
        assert!(matches!(fx.eval(&WebBranchCreationGate), GateOutcome::Accept(_)));

        fx.request = PushRequest::new(ZERO_ID, NEW, "refs/heads/dev", Protocol::Ssh);
        assert_eq!(fx.eval(&WebBranchCreationGate), GateOutcome::Continue);
    }

    #[test]
    fn test_email_domain_gate() {
        let mut fx = Fixture::new();
        assert_eq!(fx.eval(&EmailDomainGate), GateOutcome::Continue);

        fx.commit.author_email = "dev@other.org".to_string();
        match fx.eval(&EmailDomainGate) {
            GateOutcome::Reject(msg) => {
                assert!(msg.contains("dev@other.org"));
                assert!(msg.contains("example.com"));
            }
            other => panic!("expected reject, got {other:?}"),
        }

        fx.commit.author_email = "no-at-sign".to_string();
        assert!(matches!(fx.eval(&EmailDomainGate), GateOutcome::Reject(_)));

        fx.commit.author_email = "dev@sub.example.com".to_string();
        assert!(matches!(fx.eval(&EmailDomainGate), GateOutcome::Reject(_)));
    }

    #[test]
    fn test_super_account_gate() {
        let mut fx = Fixture::new();
        assert_eq!(fx.eval(&SuperAccountGate), GateOutcome::Continue);
        fx.config.super_account = vec!["dev@example.com".to_string()];
        assert!(matches!(fx.eval(&SuperAccountGate), GateOutcome::Accept(_)));
    }

    #[test]
    fn test_ignore_gates() {
        let mut fx = Fixture::new();
        assert_eq!(fx.eval(&IgnoreNamespaceGate), GateOutcome::Continue);
        assert_eq!(fx.eval(&IgnoreRepositoryGate), GateOutcome::Continue);

        fx.config.ignore_namespace = vec!["backend".to_string()];
        fx.config.ignore_repos = vec!["api".to_string()];
        assert!(matches!(fx.eval(&IgnoreNamespaceGate), GateOutcome::Accept(_)));
        assert!(matches!(fx.eval(&IgnoreRepositoryGate), GateOutcome::Accept(_)));
    }

    #[test]
    fn test_code_exemption_gate_consumes_token() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("42"), "").unwrap();
        let mut fx = Fixture::new();
        fx.exemptions = ExemptionStore::new(Some(dir.path().to_path_buf()));
        fx.commit.message = "fix [A]42[/A]".to_string();

        assert!(matches!(fx.eval(&CodeExemptionGate), GateOutcome::Accept(_)));
        assert_eq!(fx.eval(&CodeExemptionGate), GateOutcome::Continue);
    }

    #[test]
    fn test_merge_request_gate_requires_web() {
        let mut fx = Fixture::new();
        fx.commit.is_merge_commit = true;
        assert_eq!(fx.eval(&MergeRequestGate), GateOutcome::Continue);

        fx.request = PushRequest::new(OLD, NEW, "refs/heads/main", Protocol::Web);
        assert!(matches!(fx.eval(&MergeRequestGate), GateOutcome::Accept(_)));
        assert!(MergeRequestGate.marks_merge_request());
        assert!(!EmailDomainGate.marks_merge_request());
    }

    #[test]
    fn test_protected_branch_gate() {
        let mut fx = Fixture::new();
        fx.config.protect_branch = vec!["release".to_string()];

        fx.request = PushRequest::new(OLD, NEW, "refs/heads/release", Protocol::Ssh);
        assert!(matches!(fx.eval(&ProtectedBranchGate), GateOutcome::Reject(_)));

        fx.request = PushRequest::new(OLD, NEW, "refs/heads/release-2", Protocol::Ssh);
        assert_eq!(fx.eval(&ProtectedBranchGate), GateOutcome::Continue);
    }

    #[test]
    fn test_jira_gate() {
        let mut fx = Fixture::new();
        fx.commit.jira_ids.clear();
        assert_eq!(fx.eval(&JiraIdGate), GateOutcome::Continue);

        fx.config.require_jira_id_regexp = "([A-Z]+-[0-9]+)".to_string();
        match fx.eval(&JiraIdGate) {
            GateOutcome::Reject(msg) => assert!(msg.contains("([A-Z]+-[0-9]+)")),
            other => panic!("expected reject, got {other:?}"),
        }

        fx.commit.jira_ids = vec!["PA-1".to_string()];
        assert_eq!(fx.eval(&JiraIdGate), GateOutcome::Continue);
    }

    #[test]
    fn test_nothing_to_diff_gate() {
        let mut fx = Fixture::new();
        assert_eq!(fx.eval(&NothingToDiffGate), GateOutcome::Continue);
        fx.request = PushRequest::new(ZERO_ID, NEW, "refs/heads/dev", Protocol::Ssh);
        assert!(matches!(fx.eval(&NothingToDiffGate), GateOutcome::Accept(_)));
    }
}
