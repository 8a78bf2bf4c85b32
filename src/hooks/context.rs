//! Inputs of one pipeline run

use crate::error::HookError;
use crate::git::is_zero_id;
use serde::Serialize;
use std::fmt;

/// Transport the push arrived through (`GL_PROTOCOL`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Ssh,
    Http,
    Web,
    Unknown,
}

impl Protocol {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ssh" => Protocol::Ssh,
            "http" | "https" => Protocol::Http,
            "web" => Protocol::Web,
            _ => Protocol::Unknown,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Ssh => "ssh",
            Protocol::Http => "http",
            Protocol::Web => "web",
            Protocol::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// `namespace/repository` of the project being pushed to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPath {
    pub namespace: String,
    pub repository: String,
}

impl ProjectPath {
    /// Split on the last `/` so nested groups stay in the namespace
    pub fn parse(path: &str) -> Self {
        let path = path.trim().trim_matches('/');
        match path.rsplit_once('/') {
            Some((namespace, repository)) => Self {
                namespace: namespace.to_string(),
                repository: repository.to_string(),
            },
            None => Self {
                namespace: String::new(),
                repository: path.to_string(),
            },
        }
    }
}

/// Hosting-server environment handed to the hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEnv {
    pub project: ProjectPath,
    pub protocol: Protocol,
}

impl PushEnv {
    pub const PROJECT_PATH_VAR: &'static str = "GL_PROJECT_PATH";
    pub const PROTOCOL_VAR: &'static str = "GL_PROTOCOL";

    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var(Self::PROJECT_PATH_VAR).ok().as_deref(),
            std::env::var(Self::PROTOCOL_VAR).ok().as_deref(),
        )
    }

    pub fn from_vars(project_path: Option<&str>, protocol: Option<&str>) -> Self {
        let project = match project_path {
            Some(path) => ProjectPath::parse(path),
            None => {
                tracing::warn!("{} is not set", Self::PROJECT_PATH_VAR);
                ProjectPath::default()
            }
        };
        Self {
            project,
            protocol: protocol.map(Protocol::parse).unwrap_or(Protocol::Unknown),
        }
    }
}

/// One ref update read from stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRequest {
    old_ref: String,
    new_ref: String,
    ref_name: String,
    protocol: Protocol,
}

impl PushRequest {
    pub fn new(
        old_ref: impl Into<String>,
        new_ref: impl Into<String>,
        ref_name: impl Into<String>,
        protocol: Protocol,
    ) -> Self {
        Self {
            old_ref: old_ref.into(),
            new_ref: new_ref.into(),
            ref_name: ref_name.into(),
            protocol,
        }
    }

    /// Parse `<old> <new> <ref>` as written by git to a pre-receive hook
    pub fn parse_line(line: &str, protocol: Protocol) -> Result<Self, HookError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [old, new, name] = fields.as_slice() else {
            return Err(HookError::InvalidInput(format!(
                "expected '<old> <new> <ref>', got '{}'",
                line.trim()
            )));
        };
        for id in [old, new] {
            if id.len() < 40 || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(HookError::InvalidInput(format!("'{id}' is not an object id")));
            }
        }
        Ok(Self::new(*old, *new, *name, protocol))
    }

    pub fn old_ref(&self) -> &str {
        &self.old_ref
    }

    pub fn new_ref(&self) -> &str {
        &self.new_ref
    }

    pub fn ref_name(&self) -> &str {
        &self.ref_name
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn is_creation(&self) -> bool {
        is_zero_id(&self.old_ref) && !is_zero_id(&self.new_ref)
    }

    pub fn is_deletion(&self) -> bool {
        is_zero_id(&self.new_ref)
    }

    /// Both sides name real commits, so there is a diff to check
    pub fn has_diff(&self) -> bool {
        !is_zero_id(&self.old_ref) && !is_zero_id(&self.new_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::ZERO_ID;

    const A: &str = "1111111111111111111111111111111111111111";
    const B: &str = "2222222222222222222222222222222222222222";

    #[test]
    fn test_parse_line() {
        let req = PushRequest::parse_line(&format!("{A} {B} refs/heads/main\n"), Protocol::Ssh).unwrap();
        assert_eq!(req.old_ref(), A);
        assert_eq!(req.new_ref(), B);
        assert_eq!(req.ref_name(), "refs/heads/main");
        assert!(req.has_diff());
    }

    #[test]
    fn test_parse_line_rejects_malformed_input() {
        assert!(matches!(
            PushRequest::parse_line("only two", Protocol::Ssh),
            Err(HookError::InvalidInput(_))
        ));
        assert!(PushRequest::parse_line(&format!("{A} nothex refs/heads/main"), Protocol::Ssh).is_err());
        assert!(PushRequest::parse_line(&format!("{A} {B} refs/heads/main extra"), Protocol::Ssh).is_err());
    }

    #[test]
    fn test_creation_and_deletion() {
        let created = PushRequest::new(ZERO_ID, B, "refs/heads/dev", Protocol::Web);
        assert!(created.is_creation());
        assert!(!created.is_deletion());
        assert!(!created.has_diff());

        let deleted = PushRequest::new(A, ZERO_ID, "refs/heads/dev", Protocol::Ssh);
        assert!(deleted.is_deletion());
        assert!(!deleted.is_creation());
    }

    #[test]
    fn test_project_path() {
        assert_eq!(
            ProjectPath::parse("backend/api"),
            ProjectPath { namespace: "backend".into(), repository: "api".into() }
        );
        assert_eq!(
            ProjectPath::parse("org/team/api"),
            ProjectPath { namespace: "org/team".into(), repository: "api".into() }
        );
        assert_eq!(ProjectPath::parse("solo").namespace, "");
    }

    #[test]
    fn test_protocol_from_vars() {
        let env = PushEnv::from_vars(Some("backend/api"), Some("web"));
        assert_eq!(env.protocol, Protocol::Web);
        assert_eq!(PushEnv::from_vars(None, Some("carrier-pigeon")).protocol, Protocol::Unknown);
        assert_eq!(PushEnv::from_vars(None, None).project, ProjectPath::default());
    }
}
