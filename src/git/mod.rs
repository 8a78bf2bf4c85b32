//! Git object access for the pre-receive gate
//!
//! The pipeline only talks to [`ObjectSource`]. [`GitRepo`] implements it on
//! top of git2; tests substitute an in-memory source.

pub mod commit;
pub mod operations;

use anyhow::{Context, Result};
use git2::{Oid, Repository};
use serde::Serialize;
use std::path::Path;

/// The conventional "no commit" object id
pub const ZERO_ID: &str = "0000000000000000000000000000000000000000";

/// True for the all-zero id of any hash length
pub fn is_zero_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b == b'0')
}

/// Commit fields the gates read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub id: String,
    pub author_email: String,
    pub message: String,
}

/// Mode of a tree entry on the destination side of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Regular,
    Executable,
    Symlink,
    Submodule,
    Tree,
    Unknown,
}

impl From<git2::FileMode> for FileMode {
    fn from(mode: git2::FileMode) -> Self {
        match mode {
            git2::FileMode::Blob | git2::FileMode::BlobGroupWritable => FileMode::Regular,
            git2::FileMode::BlobExecutable => FileMode::Executable,
            git2::FileMode::Link => FileMode::Symlink,
            git2::FileMode::Commit => FileMode::Submodule,
            git2::FileMode::Tree => FileMode::Tree,
            _ => FileMode::Unknown,
        }
    }
}

/// Destination entry of a change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub mode: FileMode,
    /// Blob id, read back through [`ObjectSource::blob`]
    pub blob: String,
}

/// One entry of a tree diff. `new_file` is `None` for deletions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub new_file: Option<ChangedFile>,
}

/// Per-file line counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStat {
    pub name: String,
    pub addition: usize,
    pub deletion: usize,
}

/// Read access to repository objects
pub trait ObjectSource {
    fn commit(&self, id: &str) -> Result<CommitInfo>;

    /// Tree diff between two commits
    fn diff(&self, old: &str, new: &str) -> Result<Vec<FileChange>>;

    fn blob(&self, id: &str) -> Result<Vec<u8>>;

    /// Line counts between two commits. An all-zero `old` compares `new`
    /// against its first parent.
    fn numstat(&self, old: &str, new: &str) -> Result<Vec<FileStat>>;
}

pub struct GitRepo {
    pub repo: Repository,
}

impl GitRepo {
    /// Open the repository at `path`, bare or not
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path)
            .with_context(|| format!("Failed to open repository at {}", path.display()))?;
        Ok(Self { repo })
    }

    pub fn discover() -> Result<Self> {
        let repo = Repository::discover(".").context("No Git repository found")?;
        Ok(Self { repo })
    }

    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    fn oid(id: &str) -> Result<Oid> {
        Oid::from_str(id).with_context(|| format!("Invalid object id: {id}"))
    }

    /// Resolve `id` to a commit. Annotated tags are peeled to their target.
    fn find_commit(&self, id: &str) -> Result<git2::Commit<'_>> {
        self.repo
            .find_object(Self::oid(id)?, None)
            .and_then(|object| object.peel_to_commit())
            .with_context(|| format!("Failed to get commit object {id}"))
    }
}

impl ObjectSource for GitRepo {
    fn commit(&self, id: &str) -> Result<CommitInfo> {
        let commit = self.find_commit(id)?;
        let author = commit.author();
        Ok(CommitInfo {
            id: id.to_string(),
            author_email: String::from_utf8_lossy(author.email_bytes()).into_owned(),
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
        })
    }

    fn diff(&self, old: &str, new: &str) -> Result<Vec<FileChange>> {
        let old_tree = self.find_commit(old)?.tree().with_context(|| format!("Failed to get tree of {old}"))?;
        let new_tree = self.find_commit(new)?.tree().with_context(|| format!("Failed to get tree of {new}"))?;
        self.tree_changes(Some(&old_tree), &new_tree)
            .with_context(|| format!("Failed to diff {old}...{new}"))
    }

    fn blob(&self, id: &str) -> Result<Vec<u8>> {
        let blob = self
            .repo
            .find_blob(Self::oid(id)?)
            .with_context(|| format!("Failed to read blob {id}"))?;
        Ok(blob.content().to_vec())
    }

    fn numstat(&self, old: &str, new: &str) -> Result<Vec<FileStat>> {
        let new_commit = self.find_commit(new)?;
        let new_tree = new_commit.tree()?;
        let old_tree = if is_zero_id(old) {
            match new_commit.parent(0) {
                Ok(parent) => Some(parent.tree()?),
                Err(_) => None,
            }
        } else {
            // Same as `git diff old...new`: compare against the merge base
            let old_commit = self.find_commit(old)?;
            let base = match self.repo.merge_base(old_commit.id(), new_commit.id()) {
                Ok(base) => self.repo.find_commit(base)?,
                Err(_) => old_commit,
            };
            Some(base.tree()?)
        };
        self.line_stats(old_tree.as_ref(), &new_tree)
            .with_context(|| format!("Failed to compute numstat for {old}...{new}"))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use git2::{Repository, Signature};
    use std::fs;
    use std::path::Path;

    /// Write `files` into the worktree, stage everything and commit.
    /// A `None` content deletes the file.
    pub fn commit_files(repo: &Repository, files: &[(&str, Option<&str>)], message: &str, email: &str) -> String {
        let workdir = repo.workdir().unwrap().to_path_buf();
        let mut index = repo.index().unwrap();
        for (path, content) in files {
            let full = workdir.join(path);
            match content {
                Some(content) => {
                    fs::create_dir_all(full.parent().unwrap()).unwrap();
                    fs::write(&full, content).unwrap();
                    index.add_path(Path::new(path)).unwrap();
                }
                None => {
                    fs::remove_file(&full).unwrap();
                    index.remove_path(Path::new(path)).unwrap();
                }
            }
        }
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("dev", email).unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
            .to_string()
    }
}
