//! Test-only helpers: throwaway project directories and a scripted toolchain.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::bootstrap::BootstrapPlan;
use crate::core::layout::{EnvLayout, Platform};
use crate::core::version::Version;
use crate::io::config::LauncherConfig;
use crate::io::environment::RuntimeContext;
use crate::io::interrupt::InterruptFlag;
use crate::io::paths::ProjectPaths;
use crate::io::toolchain::{InstallRequest, Interpreter, LaunchRequest, LaunchStatus, Toolchain};

/// A temporary project holding `app.py` and `requirements.txt`.
pub struct TestProject {
    temp: TempDir,
    pub paths: ProjectPaths,
    pub config: LauncherConfig,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        let mut config = LauncherConfig::default();
        // Pin candidates so tests behave the same on every platform.
        config.interpreter.candidates = vec!["python3".to_string(), "python".to_string()];
        let paths = ProjectPaths::new(temp.path(), &config);
        fs::write(&paths.app_entry, "import streamlit as st\nst.title('test')\n")
            .context("write app entry")?;
        fs::write(&paths.manifest_path, "pandas>=2.0\nplotly\n").context("write manifest")?;
        Ok(Self {
            temp,
            paths,
            config,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn plan(&self) -> BootstrapPlan {
        BootstrapPlan {
            candidates: self.config.interpreter.candidates.clone(),
            min_version: Some(Version::new(3, 9, 0)),
            upgrade_installer: self.config.environment.upgrade_installer,
            packages: self.config.environment.packages.clone(),
        }
    }

    pub fn write_manifest(&self, contents: &str) -> Result<()> {
        fs::write(&self.paths.manifest_path, contents).context("write manifest")
    }
}

/// One recorded toolchain invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    Probe(String),
    Create(PathBuf),
    Activate(PathBuf),
    Refresh,
    Install(InstallRequest),
    Launch(LaunchRequest),
}

/// Toolchain that records calls and returns scripted outcomes.
///
/// Environment creation writes a fake interpreter into the environment's bin
/// dir so the directory looks populated to later runs.
pub struct ScriptedToolchain {
    interpreters: HashMap<String, Option<Version>>,
    fail_create: bool,
    fail_activate: bool,
    fail_refresh: bool,
    fail_install: bool,
    launch: Option<LaunchStatus>,
    raise_on_launch: Option<InterruptFlag>,
    calls: RefCell<Vec<ToolCall>>,
}

impl Default for ScriptedToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedToolchain {
    /// `python3` 3.12.1 available, every step succeeds, the app exits with 0.
    pub fn new() -> Self {
        let mut interpreters = HashMap::new();
        interpreters.insert("python3".to_string(), Some(Version::new(3, 12, 1)));
        Self {
            interpreters,
            fail_create: false,
            fail_activate: false,
            fail_refresh: false,
            fail_install: false,
            launch: Some(LaunchStatus::Exited(Some(0))),
            raise_on_launch: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_interpreter(mut self, program: &str, version: Option<Version>) -> Self {
        self.interpreters.insert(program.to_string(), version);
        self
    }

    pub fn without_interpreter(mut self, program: &str) -> Self {
        self.interpreters.remove(program);
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_activate(mut self) -> Self {
        self.fail_activate = true;
        self
    }

    pub fn failing_refresh(mut self) -> Self {
        self.fail_refresh = true;
        self
    }

    pub fn failing_install(mut self) -> Self {
        self.fail_install = true;
        self
    }

    pub fn failing_launch(mut self) -> Self {
        self.launch = None;
        self
    }

    pub fn with_launch_status(mut self, status: LaunchStatus) -> Self {
        self.launch = Some(status);
        self
    }

    /// Simulate Ctrl-C arriving while the app runs: raise `flag` during launch.
    pub fn interrupted_via(mut self, flag: &InterruptFlag) -> Self {
        self.raise_on_launch = Some(flag.clone());
        self
    }

    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, matches: impl Fn(&ToolCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| matches(call)).count()
    }

    fn record(&self, call: ToolCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl Toolchain for ScriptedToolchain {
    fn probe_interpreter(&self, program: &str) -> Result<Interpreter> {
        self.record(ToolCall::Probe(program.to_string()));
        match self.interpreters.get(program) {
            Some(version) => Ok(Interpreter {
                program: program.to_string(),
                version: *version,
            }),
            None => Err(anyhow!("{program}: command not found")),
        }
    }

    fn create_environment(&self, _interpreter: &Interpreter, env_dir: &Path) -> Result<()> {
        self.record(ToolCall::Create(env_dir.to_path_buf()));
        if self.fail_create {
            return Err(anyhow!("No space left on device"));
        }
        let layout = EnvLayout::new(env_dir, Platform::current());
        fs::create_dir_all(&layout.bin_dir).context("create bin dir")?;
        fs::write(&layout.python, "").context("write fake interpreter")?;
        fs::write(env_dir.join("pyvenv.cfg"), "include-system-site-packages = false\n")
            .context("write pyvenv.cfg")?;
        Ok(())
    }

    fn activate(&self, env_dir: &Path) -> Result<RuntimeContext> {
        self.record(ToolCall::Activate(env_dir.to_path_buf()));
        let layout = EnvLayout::new(env_dir, Platform::current());
        if self.fail_activate {
            return Err(anyhow!("running scripts is disabled on this system"));
        }
        if !layout.python.is_file() {
            return Err(anyhow!(
                "environment interpreter missing at {}",
                layout.python.display()
            ));
        }
        Ok(RuntimeContext::new(&layout, Platform::current()))
    }

    fn refresh_installer(&self, _ctx: &RuntimeContext) -> Result<()> {
        self.record(ToolCall::Refresh);
        if self.fail_refresh {
            return Err(anyhow!("Could not fetch URL https://pypi.org/simple/pip/"));
        }
        Ok(())
    }

    fn install(&self, _ctx: &RuntimeContext, request: &InstallRequest) -> Result<()> {
        self.record(ToolCall::Install(request.clone()));
        if self.fail_install {
            return Err(anyhow!(
                "ERROR: No matching distribution found for pandas>=99"
            ));
        }
        Ok(())
    }

    fn launch(
        &self,
        _ctx: &RuntimeContext,
        request: &LaunchRequest,
        interrupt: &InterruptFlag,
    ) -> Result<LaunchStatus> {
        self.record(ToolCall::Launch(request.clone()));
        if let Some(flag) = &self.raise_on_launch {
            flag.raise();
        }
        match self.launch {
            Some(_) if interrupt.is_raised() => Ok(LaunchStatus::Interrupted),
            Some(status) => Ok(status),
            None => Err(anyhow!("No module named {}", request.module)),
        }
    }
}
