//! Operator-facing output
//!
//! Everything the pusher sees goes through [`Output`]. Pushes made from the
//! hosting web UI only surface lines prefixed with `GL-HOOK-ERR:`, so in that
//! mode every line carries the prefix and styling is dropped.

use crate::hooks::{Decision, ProjectPath, Protocol, PushRequest};
use console::style;
use std::path::Path;

/// Prefix the hosting UI looks for in hook output
pub const WEB_PREFIX: &str = "GL-HOOK-ERR: ";

/// Output handler for consistent hook messages
pub struct Output {
    verbose: bool,
    quiet: bool,
    web: bool,
}

impl Output {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            web: false,
        }
    }

    /// Switch to the web UI format when the push came from the browser
    pub fn for_protocol(mut self, protocol: Protocol) -> Self {
        self.web = protocol == Protocol::Web;
        self
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        if self.web {
            println!("{WEB_PREFIX}{message}");
        } else {
            println!("{} {}", style("✔").green(), message);
        }
    }

    /// Print an error message. Errors are shown even in quiet mode.
    pub fn error(&self, message: &str) {
        if self.web {
            eprintln!("{WEB_PREFIX}{message}");
        } else {
            eprintln!("{} {}", style("✖").red(), style(message).red());
        }
    }

    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        if self.web {
            eprintln!("{WEB_PREFIX}{message}");
        } else {
            eprintln!("{} {}", style("⚠").yellow(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        if self.web {
            println!("{WEB_PREFIX}{message}");
        } else {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    /// Only shown with `-v`
    pub fn verbose(&self, message: &str) {
        if !self.verbose || self.quiet {
            return;
        }
        if self.web {
            println!("{WEB_PREFIX}{message}");
        } else {
            println!("{} {}", style("ℹ").dim(), style(message).dim());
        }
    }

    /// Print a key-value pair with consistent styling
    pub fn key_value(&self, key: &str, value: &str) {
        if self.quiet {
            return;
        }
        if self.web {
            println!("{WEB_PREFIX}{key} {value}");
        } else {
            println!("  {:<12} {}", style(key).dim(), value);
        }
    }

    pub fn list_item(&self, item: &str) {
        if self.web {
            eprintln!("{WEB_PREFIX}  - {item}");
        } else {
            eprintln!("  {} {}", style("•").red(), item);
        }
    }

    /// Print a section separator
    pub fn separator(&self) {
        if self.quiet || self.web {
            return;
        }
        println!("{}", style("─".repeat(50)).dim());
    }

    /// Banner printed before each ref update is checked
    pub fn run_header(&self, exemption_dir: Option<&Path>, project: &ProjectPath, request: &PushRequest) {
        if self.quiet {
            return;
        }
        self.separator();
        if exemption_dir.is_some() {
            self.info("Need an exemption? Ask for a code and add [A]<code>[/A] to the commit message");
        }
        self.key_value("repository", &project.repository);
        self.key_value("namespace", &project.namespace);
        self.key_value("old", request.old_ref());
        self.key_value("new", request.new_ref());
        self.key_value("ref", request.ref_name());
        self.key_value("protocol", &request.protocol().to_string());
    }

    /// Where `--keep-staging` left the staged files. Shown even in quiet mode.
    pub fn staging_kept(&self, path: &Path) {
        let message = format!("staged files kept at {}", path.display());
        if self.web {
            println!("{WEB_PREFIX}{message}");
        } else {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    /// Report the outcome of one run
    pub fn decision(&self, decision: &Decision) {
        if decision.is_accept() {
            self.success(&format!("[{}] {}", decision.gate, decision.reason));
        } else {
            self.error(&format!("[{}] {}", decision.gate, decision.reason));
            for detail in &decision.details {
                self.list_item(detail);
            }
        }
    }
}
