//! Orchestration for `launcher sync-branches`.
//!
//! Brings the target branch up to date with the base branch:
//! checkout base, pull it from the remote, checkout target, merge base.
//! Stops at the first failing git command.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, anyhow};
use tracing::{info, instrument};

use crate::io::config::SyncConfig;
use crate::io::git::Git;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub remote: String,
    pub base: String,
    pub target: String,
}

impl From<&SyncConfig> for SyncPlan {
    fn from(cfg: &SyncConfig) -> Self {
        Self {
            remote: cfg.remote.clone(),
            base: cfg.base.clone(),
            target: cfg.target.clone(),
        }
    }
}

impl SyncPlan {
    /// Human-readable list of the steps, shown before asking for confirmation.
    pub fn describe(&self) -> Vec<String> {
        vec![
            format!("switch to {}", self.base),
            format!("pull latest changes from {}/{}", self.remote, self.base),
            format!("switch to {}", self.target),
            format!("merge {} into {}", self.base, self.target),
        ]
    }
}

/// Ask the operator to confirm; only `y`/`yes` (any case) proceeds.
pub fn confirm<R: BufRead, W: Write>(plan: &SyncPlan, mut input: R, mut output: W) -> Result<bool> {
    writeln!(output, "This will:").context("write prompt")?;
    for (idx, step) in plan.describe().iter().enumerate() {
        writeln!(output, "{}. {step}", idx + 1).context("write prompt")?;
    }
    write!(output, "Proceed? (y/N): ").context("write prompt")?;
    output.flush().context("flush prompt")?;

    let mut answer = String::new();
    input.read_line(&mut answer).context("read answer")?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Run the sync.
///
/// `ignored_dirs` are directories relative to the git working directory (for
/// example the environment directory) whose changes do not block the sync.
#[instrument(skip_all, fields(base = %plan.base, target = %plan.target))]
pub fn sync_branches(git: &Git, plan: &SyncPlan, ignored_dirs: &[&str]) -> Result<()> {
    let prefixes = repo_relative_prefixes(&git.show_prefix()?, ignored_dirs);
    let prefixes: Vec<&str> = prefixes.iter().map(String::as_str).collect();
    git.ensure_clean_except_prefixes(&prefixes)?;
    for branch in [&plan.base, &plan.target] {
        if !git.branch_exists(branch)? {
            return Err(anyhow!("local branch '{branch}' does not exist"));
        }
    }

    step(&format!("switching to {}", plan.base), || {
        git.checkout_branch(&plan.base)
    })?;
    step(
        &format!("pulling {}/{}", plan.remote, plan.base),
        || git.pull(&plan.remote, &plan.base),
    )?;
    step(&format!("switching to {}", plan.target), || {
        git.checkout_branch(&plan.target)
    })?;
    step(&format!("merging {} into {}", plan.base, plan.target), || {
        git.merge(&plan.base)
    })
    .context("merge may have conflicts; resolve them and commit the merge manually")?;

    info!("branches synced");
    Ok(())
}

/// `git status` reports paths from the repository root, so `venv` inside a
/// project at `web/` must be matched as `web/venv/`.
fn repo_relative_prefixes(show_prefix: &str, dirs: &[&str]) -> Vec<String> {
    dirs.iter()
        .map(|dir| dir.trim_end_matches(['/', '\\']))
        .filter(|dir| !dir.is_empty())
        .map(|dir| format!("{show_prefix}{dir}/"))
        .collect()
}

fn step(description: &str, action: impl FnOnce() -> Result<String>) -> Result<()> {
    println!("==> {description}");
    let output = action().with_context(|| format!("{description} failed"))?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
