//! Thin `git` subprocess wrapper used by `launcher sync-branches`.

use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, instrument, warn};

/// One line of `git status --porcelain=v1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyPath {
    /// Two-character XY status, `??` when untracked.
    pub status: String,
    /// Repository-relative path; the destination for renames.
    pub path: String,
}

impl DirtyPath {
    fn parse(line: &str) -> Result<Self> {
        let (status, rest) = match (line.get(..2), line.get(3..)) {
            (Some(status), Some(rest)) if !rest.trim().is_empty() => (status, rest),
            _ => bail!("unexpected git status line: '{line}'"),
        };
        let path = match rest.rsplit_once(" -> ") {
            Some((_, renamed_to)) => renamed_to,
            None => rest,
        };
        Ok(Self {
            status: status.to_string(),
            path: path.trim().to_string(),
        })
    }
}

impl fmt::Display for DirtyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.path)
    }
}

/// A git working copy rooted at `workdir`.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Name of the checked-out branch. A detached HEAD is an error.
    pub fn current_branch(&self) -> Result<String> {
        let head = self.stdout(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        match head.trim() {
            "HEAD" => Err(anyhow!("HEAD is detached; check out a branch first")),
            name => Ok(name.to_string()),
        }
    }

    /// Path of the working directory relative to the repository root, with a
    /// trailing `/`; empty at the root.
    pub fn show_prefix(&self) -> Result<String> {
        Ok(self.stdout(&["rev-parse", "--show-prefix"])?.trim().to_string())
    }

    /// Modified, staged, and untracked paths, relative to the repository root.
    pub fn dirty_paths(&self) -> Result<Vec<DirtyPath>> {
        self.stdout(&["status", "--porcelain=v1", "--untracked-files=all"])?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(DirtyPath::parse)
            .collect()
    }

    /// Fail unless every dirty path lies under one of `ignored_prefixes`.
    #[instrument(skip_all)]
    pub fn ensure_clean_except_prefixes(&self, ignored_prefixes: &[&str]) -> Result<()> {
        let blocking: Vec<DirtyPath> = self
            .dirty_paths()?
            .into_iter()
            .filter(|dirty| !ignored_prefixes.iter().any(|p| dirty.path.starts_with(p)))
            .collect();
        if blocking.is_empty() {
            return Ok(());
        }
        warn!(count = blocking.len(), "uncommitted changes block sync");
        let listing: Vec<String> = blocking.iter().map(DirtyPath::to_string).collect();
        Err(anyhow!(
            "uncommitted changes; commit or stash them first:\n{}",
            listing.join("\n")
        ))
    }

    pub fn branch_exists(&self, branch: &str) -> Result<bool> {
        let reference = format!("refs/heads/{branch}");
        let output = self.output(&["show-ref", "--verify", "--quiet", &reference])?;
        Ok(output.status.success())
    }

    #[instrument(skip_all, fields(branch))]
    pub fn checkout_branch(&self, branch: &str) -> Result<String> {
        self.checked(&["checkout", branch])
    }

    /// Pull `branch` from `remote` into the current branch with a merge.
    #[instrument(skip_all, fields(remote, branch))]
    pub fn pull(&self, remote: &str, branch: &str) -> Result<String> {
        self.checked(&["pull", "--no-rebase", remote, branch])
    }

    #[instrument(skip_all, fields(branch))]
    pub fn merge(&self, branch: &str) -> Result<String> {
        self.checked(&["merge", "--no-edit", branch])
    }

    /// Run and require success; returns stdout then stderr, where git reports progress.
    fn checked(&self, args: &[&str]) -> Result<String> {
        let output = self.require_success(args)?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text.trim().to_string())
    }

    fn stdout(&self, args: &[&str]) -> Result<String> {
        let output = self.require_success(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn require_success(&self, args: &[&str]) -> Result<Output> {
        let output = self.output(args)?;
        if output.status.success() {
            return Ok(output);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = match stderr.trim() {
            "" => String::from_utf8_lossy(&output.stdout).trim().to_string(),
            text => text.to_string(),
        };
        Err(anyhow!("git {} exited with {}: {detail}", args.join(" "), output.status))
    }

    fn output(&self, args: &[&str]) -> Result<Output> {
        debug!(?args, "running git");
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untracked_environment_file() {
        let dirty = DirtyPath::parse("?? venv/pyvenv.cfg").expect("parse");
        assert_eq!(dirty.status, "??");
        assert_eq!(dirty.path, "venv/pyvenv.cfg");
    }

    #[test]
    fn staged_and_unstaged_codes_keep_their_columns() {
        assert_eq!(
            DirtyPath::parse("M  requirements.txt").expect("parse").status,
            "M "
        );
        let unstaged = DirtyPath::parse(" M app.py").expect("parse");
        assert_eq!(unstaged.status, " M");
        assert_eq!(unstaged.to_string(), " M app.py");
    }

    #[test]
    fn rename_reports_destination() {
        let dirty = DirtyPath::parse("R  app_old.py -> app.py").expect("parse");
        assert_eq!(dirty.path, "app.py");
    }

    #[test]
    fn truncated_lines_are_rejected() {
        assert!(DirtyPath::parse("M").is_err());
        assert!(DirtyPath::parse("?? ").is_err());
    }
}
