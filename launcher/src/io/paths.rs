//! Project directory resolution and the canonical paths inside it.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::io::config::{CONFIG_FILE_NAME, LauncherConfig};

/// Entry file that marks a directory as a project when no config is present.
const DEFAULT_APP_ENTRY: &str = "app.py";

/// All canonical paths for a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub env_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub app_entry: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>, cfg: &LauncherConfig) -> Self {
        let root = root.into();
        Self {
            env_dir: root.join(&cfg.environment.dir),
            manifest_path: root.join(&cfg.environment.manifest),
            app_entry: root.join(&cfg.app.entry),
            root,
        }
    }
}

/// Resolve the project directory independently of how the launcher was invoked.
///
/// Order: an explicit `--dir`; the directory holding the launcher executable
/// when it looks like a project; the current directory.
pub fn locate_project_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        if !dir.is_dir() {
            return Err(anyhow!("project directory {} does not exist", dir.display()));
        }
        return fs::canonicalize(dir).with_context(|| format!("resolve {}", dir.display()));
    }
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let cwd = env::current_dir().context("read current directory")?;
    let root = pick_project_root(exe_dir.as_deref(), &cwd);
    debug!(root = %root.display(), "resolved project directory");
    Ok(root)
}

fn pick_project_root(exe_dir: Option<&Path>, cwd: &Path) -> PathBuf {
    match exe_dir {
        Some(dir) if is_project_dir(dir) => dir.to_path_buf(),
        _ => cwd.to_path_buf(),
    }
}

fn is_project_dir(dir: &Path) -> bool {
    dir.join(CONFIG_FILE_NAME).is_file() || dir.join(DEFAULT_APP_ENTRY).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_config() {
        let mut cfg = LauncherConfig::default();
        cfg.environment.dir = ".venv".to_string();
        let paths = ProjectPaths::new("/srv/app", &cfg);
        assert_eq!(paths.env_dir, PathBuf::from("/srv/app/.venv"));
        assert_eq!(paths.manifest_path, PathBuf::from("/srv/app/requirements.txt"));
        assert_eq!(paths.app_entry, PathBuf::from("/srv/app/app.py"));
    }

    #[test]
    fn executable_dir_wins_when_it_holds_the_app() {
        let exe_dir = tempfile::tempdir().expect("tempdir");
        let cwd = tempfile::tempdir().expect("tempdir");
        fs::write(exe_dir.path().join("app.py"), "").expect("write app");
        assert_eq!(
            pick_project_root(Some(exe_dir.path()), cwd.path()),
            exe_dir.path()
        );
    }

    #[test]
    fn falls_back_to_current_dir() {
        let exe_dir = tempfile::tempdir().expect("tempdir");
        let cwd = tempfile::tempdir().expect("tempdir");
        assert_eq!(pick_project_root(Some(exe_dir.path()), cwd.path()), cwd.path());
        assert_eq!(pick_project_root(None, cwd.path()), cwd.path());
    }

    #[test]
    fn explicit_dir_must_exist() {
        let temp = tempfile::tempdir().expect("tempdir");
        let missing = temp.path().join("nope");
        assert!(locate_project_root(Some(&missing)).is_err());
        let found = locate_project_root(Some(temp.path())).expect("locate");
        assert!(found.is_absolute());
    }
}
