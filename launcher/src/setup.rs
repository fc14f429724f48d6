//! Orchestration for `launcher setup`: prepare the environment, do not launch.
//!
//! This is the "setup" half of a setup/run pair. Afterwards the configured
//! helper scripts are marked executable so they can be double-clicked or run
//! as `./script`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use crate::bootstrap::{BootstrapPlan, PreparedEnvironment, prepare_environment};
use crate::io::paths::ProjectPaths;
use crate::io::permissions::mark_executable;
use crate::io::toolchain::Toolchain;

/// Helper scripts processed by setup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptReport {
    pub marked: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SetupOutcome {
    pub prepared: PreparedEnvironment,
    pub scripts: ScriptReport,
}

pub fn run_setup<T: Toolchain>(
    toolchain: &T,
    paths: &ProjectPaths,
    plan: &BootstrapPlan,
    scripts: &[String],
) -> Result<SetupOutcome> {
    let prepared = prepare_environment(toolchain, paths, plan)?;
    let scripts = mark_helper_scripts(&paths.root, scripts)?;
    info!(
        marked = scripts.marked.len(),
        missing = scripts.missing.len(),
        "setup complete"
    );
    Ok(SetupOutcome { prepared, scripts })
}

/// Mark each existing script under `root` executable; missing ones are reported, not fatal.
pub fn mark_helper_scripts(root: &Path, scripts: &[String]) -> Result<ScriptReport> {
    let mut report = ScriptReport::default();
    for name in scripts {
        let path = root.join(name);
        if !path.is_file() {
            warn!(script = %path.display(), "helper script not found");
            report.missing.push(path);
            continue;
        }
        mark_executable(&path)?;
        report.marked.push(path);
    }
    Ok(report)
}
