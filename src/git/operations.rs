use super::{ChangedFile, FileChange, FileStat, GitRepo};
use anyhow::{Context, Result};
use git2::{Delta, DiffOptions, Patch, Tree};

impl GitRepo {
    /// List changed entries between two trees, destination side only
    pub fn tree_changes(&self, old: Option<&Tree<'_>>, new: &Tree<'_>) -> Result<Vec<FileChange>> {
        let mut diff_opts = DiffOptions::new();
        diff_opts.context_lines(0); // We only need to know which files changed
        let diff = self
            .repo
            .diff_tree_to_tree(old, Some(new), Some(&mut diff_opts))?;

        let mut changes = Vec::with_capacity(diff.deltas().len());
        for delta in diff.deltas() {
            let path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .context("Diff entry without a path")?
                .to_string_lossy()
                .into_owned();

            let new_file = match delta.status() {
                Delta::Deleted => None,
                _ => Some(ChangedFile {
                    mode: delta.new_file().mode().into(),
                    blob: delta.new_file().id().to_string(),
                }),
            };
            changes.push(FileChange { path, new_file });
        }
        Ok(changes)
    }

    /// Added and deleted line counts per file, like `git diff --numstat`
    pub fn line_stats(&self, old: Option<&Tree<'_>>, new: &Tree<'_>) -> Result<Vec<FileStat>> {
        let diff = self.repo.diff_tree_to_tree(old, Some(new), None)?;

        let mut stats = Vec::new();
        for idx in 0..diff.deltas().len() {
            let Some(patch) = Patch::from_diff(&diff, idx)? else {
                continue;
            };
            let delta = patch.delta();
            let name = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            let (_, addition, deletion) = patch.line_stats()?;
            stats.push(FileStat {
                name,
                addition,
                deletion,
            });
        }
        Ok(stats)
    }
}
