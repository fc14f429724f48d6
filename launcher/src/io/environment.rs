//! The isolated runtime context.
//!
//! Activating an environment never touches the launcher's own process
//! environment. Instead the context is an explicit value, and every command
//! that should run "inside" the environment is built from it.

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::core::layout::{EnvLayout, Platform, prepend_path};

/// Variables that would make the environment's interpreter resolve packages
/// from somewhere other than the environment.
const CLEARED_VARS: [&str; 2] = ["PYTHONHOME", "PYTHONPATH"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeContext {
    env_dir: PathBuf,
    bin_dir: PathBuf,
    python: PathBuf,
    path_var: OsString,
}

impl RuntimeContext {
    /// Build a context for `layout`, prepending its bin dir to the inherited `PATH`.
    pub fn new(layout: &EnvLayout, platform: Platform) -> Self {
        let inherited = env::var_os("PATH");
        Self::with_inherited_path(layout, inherited.as_deref(), platform)
    }

    pub fn with_inherited_path(
        layout: &EnvLayout,
        inherited_path: Option<&OsStr>,
        platform: Platform,
    ) -> Self {
        Self {
            env_dir: layout.root.clone(),
            bin_dir: layout.bin_dir.clone(),
            python: layout.python.clone(),
            path_var: prepend_path(&layout.bin_dir, inherited_path, platform),
        }
    }

    pub fn env_dir(&self) -> &Path {
        &self.env_dir
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    pub fn python(&self) -> &Path {
        &self.python
    }

    pub fn path_var(&self) -> &OsStr {
        &self.path_var
    }

    /// Apply the context to a command: `PATH`, `VIRTUAL_ENV`, cleared overrides.
    pub fn apply(&self, cmd: &mut Command) {
        cmd.env("PATH", &self.path_var).env("VIRTUAL_ENV", &self.env_dir);
        for var in CLEARED_VARS {
            cmd.env_remove(var);
        }
    }

    /// A `python` command inside the environment, running in `workdir`.
    pub fn python_command(&self, workdir: &Path) -> Command {
        let mut cmd = Command::new(&self.python);
        self.apply(&mut cmd);
        cmd.current_dir(workdir);
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_value<'a>(cmd: &'a Command, key: &str) -> Option<Option<&'a OsStr>> {
        cmd.get_envs()
            .find(|(k, _)| *k == OsStr::new(key))
            .map(|(_, v)| v)
    }

    #[test]
    fn python_command_runs_environment_interpreter() {
        let layout = EnvLayout::new("/proj/venv", Platform::Unix);
        let ctx = RuntimeContext::with_inherited_path(
            &layout,
            Some(OsStr::new("/usr/bin")),
            Platform::Unix,
        );
        let cmd = ctx.python_command(Path::new("/proj"));

        assert_eq!(cmd.get_program(), OsStr::new("/proj/venv/bin/python"));
        assert_eq!(cmd.get_current_dir(), Some(Path::new("/proj")));
        assert_eq!(
            env_value(&cmd, "PATH"),
            Some(Some(OsStr::new("/proj/venv/bin:/usr/bin")))
        );
        assert_eq!(
            env_value(&cmd, "VIRTUAL_ENV"),
            Some(Some(OsStr::new("/proj/venv")))
        );
        assert_eq!(env_value(&cmd, "PYTHONHOME"), Some(None));
    }

    #[test]
    fn building_a_context_leaves_process_env_alone() {
        let before = env::var_os("VIRTUAL_ENV");
        let layout = EnvLayout::new("/proj/venv", Platform::current());
        let ctx = RuntimeContext::new(&layout, Platform::current());
        assert_eq!(ctx.env_dir(), Path::new("/proj/venv"));
        assert!(ctx.path_var().len() >= ctx.bin_dir().as_os_str().len());
        assert_eq!(env::var_os("VIRTUAL_ENV"), before);
    }
}
