//! Staging area for changed files
//!
//! Files are written under `<root>/<tag>/<relative path>` where `<tag>` is
//! the file extension without its dot. Each tag directory is handed to its
//! checker as one bucket.

use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;

enum Root {
    Temporary(TempDir),
    Kept(PathBuf),
}

pub struct StagingArea {
    root: Root,
    buckets: BTreeMap<String, PathBuf>,
}

/// One checker's share of the staged files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckBucket {
    /// Dotted tag, e.g. `.go`
    pub tag: String,
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
}

impl StagingArea {
    /// Create a fresh directory. It is removed on drop unless `keep` is set.
    pub fn create(keep: bool) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("git-pre-receive-")
            .tempdir()
            .context("Failed to create staging directory")?;
        let root = if keep {
            Root::Kept(dir.keep())
        } else {
            Root::Temporary(dir)
        };
        Ok(Self {
            root,
            buckets: BTreeMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        match &self.root {
            Root::Temporary(dir) => dir.path(),
            Root::Kept(path) => path,
        }
    }

    pub fn is_kept(&self) -> bool {
        matches!(self.root, Root::Kept(_))
    }

    /// Write `content` into the bucket for `tag`
    pub fn stage(&mut self, tag: &str, rel_path: &str, content: &[u8]) -> Result<PathBuf> {
        let rel = safe_relative(rel_path)?;
        let bucket = self.path().join(tag.trim_start_matches('.'));
        let dest = bucket.join(&rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&dest, content).with_context(|| format!("Failed to stage {rel_path}"))?;
        tracing::debug!("staged {} -> {}", rel_path, dest.display());
        self.buckets.entry(tag.to_string()).or_insert(bucket);
        Ok(dest)
    }

    /// Non-empty buckets in tag order
    pub fn buckets(&self) -> Result<Vec<CheckBucket>> {
        let mut out = Vec::with_capacity(self.buckets.len());
        for (tag, root) in &self.buckets {
            let mut files = Vec::new();
            collect_files(root, root, &mut files)?;
            files.sort();
            out.push(CheckBucket {
                tag: tag.clone(),
                root: root.clone(),
                files,
            });
        }
        Ok(out)
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if let Root::Kept(path) = &self.root {
            tracing::debug!("staged files kept at {}", path.display());
        }
    }
}

/// Reject absolute paths and any `..` so staging never escapes the root
fn safe_relative(path: &str) -> Result<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => bail!("Refusing to stage unsafe path '{path}'"),
        }
    }
    if out.as_os_str().is_empty() {
        bail!("Refusing to stage empty path");
    }
    Ok(out)
}

fn collect_files(base: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(base, &path, out)?;
        } else if let Ok(rel) = path.strip_prefix(base) {
            out.push(rel.to_path_buf());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_into_tag_bucket() {
        let mut area = StagingArea::create(false).unwrap();
        let dest = area.stage(".go", "a/b/m.go", b"package b\n").unwrap();
        assert_eq!(dest, area.path().join("go/a/b/m.go"));
        assert_eq!(fs::read(&dest).unwrap(), b"package b\n");

        let buckets = area.buckets().unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].tag, ".go");
        assert_eq!(buckets[0].root, area.path().join("go"));
        assert_eq!(buckets[0].files, vec![PathBuf::from("a/b/m.go")]);
    }

    #[test]
    fn test_unsafe_paths_are_refused() {
        let mut area = StagingArea::create(false).unwrap();
        assert!(area.stage(".go", "../escape.go", b"x").is_err());
        assert!(area.stage(".go", "/etc/passwd.go", b"x").is_err());
        assert!(area.stage(".go", "a/../../b.go", b"x").is_err());
        assert!(area.buckets().unwrap().is_empty());
    }

    #[test]
    fn test_temporary_root_is_removed_on_drop() {
        let area = StagingArea::create(false).unwrap();
        let path = area.path().to_path_buf();
        assert!(path.exists());
        assert!(!area.is_kept());
        drop(area);
        assert!(!path.exists());
    }

    #[test]
    fn test_kept_root_survives_drop() {
        let mut area = StagingArea::create(true).unwrap();
        area.stage(".php", "src/a.php", b"<?php\n").unwrap();
        let path = area.path().to_path_buf();
        assert!(area.is_kept());
        drop(area);
        assert!(path.join("php/src/a.php").exists());
        fs::remove_dir_all(path).unwrap();
    }
}
