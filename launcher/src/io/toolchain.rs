//! Toolchain abstraction for the subprocesses a bootstrap runs.
//!
//! The [`Toolchain`] trait decouples bootstrap orchestration from the real
//! Python tooling (`python -m venv`, `python -m pip`, the launch module).
//! Tests use scripted toolchains that return predetermined outcomes without
//! spawning processes.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::layout::{EnvLayout, Platform};
use crate::core::version::{Version, parse_version_output};
use crate::io::config::LauncherConfig;
use crate::io::environment::RuntimeContext;
use crate::io::interrupt::{InterruptFlag, terminated_by_interrupt};
use crate::io::process::{run_attached, run_command_with_timeout};

/// A Python interpreter found on the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    pub program: String,
    /// `None` when `--version` output could not be parsed.
    pub version: Option<Version>,
}

/// What to install into the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Manifest handed to `pip install -r`; `None` when it declares nothing.
    pub manifest: Option<PathBuf>,
    /// Packages installed after the manifest.
    pub packages: Vec<String>,
}

/// The handoff command: `python -m <module> <args...>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub module: String,
    pub args: Vec<String>,
    /// Port the app will serve on (the override, or the module's default).
    pub port: u16,
}

impl LaunchRequest {
    pub fn from_config(cfg: &LauncherConfig, port: Option<u16>) -> Self {
        let mut args = cfg.app.command.clone();
        args.push(cfg.app.entry.clone());
        if let Some(port) = port {
            args.push(cfg.app.port_flag.clone());
            args.push(port.to_string());
        }
        Self {
            module: cfg.app.module.clone(),
            args,
            port: port.unwrap_or(cfg.app.default_port),
        }
    }

    pub fn display(&self) -> String {
        let mut parts = vec!["python".to_string(), "-m".to_string(), self.module.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// How the handed-off process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStatus {
    /// The target exited on its own; `None` if it was killed by a signal.
    Exited(Option<i32>),
    /// The operator interrupted the target.
    Interrupted,
}

/// Abstraction over the Python tooling used by a bootstrap.
pub trait Toolchain {
    /// Run `<program> --version` and report the interpreter.
    fn probe_interpreter(&self, program: &str) -> Result<Interpreter>;

    /// Create a fresh environment at `env_dir` with `interpreter`.
    fn create_environment(&self, interpreter: &Interpreter, env_dir: &Path) -> Result<()>;

    /// Verify the environment at `env_dir` is usable and build its context.
    fn activate(&self, env_dir: &Path) -> Result<RuntimeContext>;

    /// Upgrade the environment's package installer.
    fn refresh_installer(&self, ctx: &RuntimeContext) -> Result<()>;

    fn install(&self, ctx: &RuntimeContext, request: &InstallRequest) -> Result<()>;

    /// Hand off to the target and block until it ends. `Err` means it never started.
    fn launch(
        &self,
        ctx: &RuntimeContext,
        request: &LaunchRequest,
        interrupt: &InterruptFlag,
    ) -> Result<LaunchStatus>;
}

/// Toolchain backed by the real interpreter and pip.
#[derive(Debug, Clone)]
pub struct SystemToolchain {
    workdir: PathBuf,
    platform: Platform,
    probe_timeout: Duration,
    install_timeout: Duration,
    output_limit_bytes: usize,
}

impl SystemToolchain {
    pub fn new(workdir: impl Into<PathBuf>, cfg: &LauncherConfig) -> Self {
        Self {
            workdir: workdir.into(),
            platform: Platform::current(),
            probe_timeout: Duration::from_secs(cfg.interpreter.probe_timeout_secs),
            install_timeout: Duration::from_secs(cfg.environment.install_timeout_secs),
            output_limit_bytes: cfg.environment.output_limit_bytes,
        }
    }

    fn run_checked(&self, cmd: Command, timeout: Duration, what: &str) -> Result<()> {
        let output = run_command_with_timeout(cmd, timeout, self.output_limit_bytes)?;
        if !output.success() {
            warn!(exit_code = ?output.status.code(), timed_out = output.timed_out, "{what} failed");
            return Err(anyhow!("{what} {}", output.diagnostic(timeout)));
        }
        Ok(())
    }

    fn pip_command(&self, ctx: &RuntimeContext) -> Command {
        let mut cmd = ctx.python_command(&self.workdir);
        cmd.args(["-m", "pip", "install", "--disable-pip-version-check"]);
        cmd
    }
}

impl Toolchain for SystemToolchain {
    #[instrument(skip_all, fields(program))]
    fn probe_interpreter(&self, program: &str) -> Result<Interpreter> {
        let mut cmd = Command::new(program);
        cmd.arg("--version").current_dir(&self.workdir);
        let output = run_command_with_timeout(cmd, self.probe_timeout, self.output_limit_bytes)?;
        if !output.success() {
            return Err(anyhow!(
                "{program} --version {}",
                output.diagnostic(self.probe_timeout)
            ));
        }
        let version = parse_version_output(&output.combined());
        debug!(program, version = ?version, "interpreter found");
        Ok(Interpreter {
            program: program.to_string(),
            version,
        })
    }

    #[instrument(skip_all, fields(env_dir = %env_dir.display()))]
    fn create_environment(&self, interpreter: &Interpreter, env_dir: &Path) -> Result<()> {
        info!(program = %interpreter.program, "creating environment");
        let mut cmd = Command::new(&interpreter.program);
        cmd.args(["-m", "venv"])
            .arg(env_dir)
            .current_dir(&self.workdir);
        self.run_checked(cmd, self.install_timeout, "python -m venv")
    }

    #[instrument(skip_all, fields(env_dir = %env_dir.display()))]
    fn activate(&self, env_dir: &Path) -> Result<RuntimeContext> {
        let layout = EnvLayout::new(env_dir, self.platform);
        if !layout.python.is_file() {
            return Err(anyhow!(
                "environment interpreter missing at {}",
                layout.python.display()
            ));
        }
        let ctx = RuntimeContext::new(&layout, self.platform);
        let mut cmd = ctx.python_command(&self.workdir);
        cmd.arg("--version");
        self.run_checked(cmd, self.probe_timeout, "environment interpreter")?;
        debug!(python = %ctx.python().display(), "environment active");
        Ok(ctx)
    }

    fn refresh_installer(&self, ctx: &RuntimeContext) -> Result<()> {
        let mut cmd = self.pip_command(ctx);
        cmd.args(["--upgrade", "pip"]);
        self.run_checked(cmd, self.install_timeout, "pip upgrade")
    }

    #[instrument(skip_all, fields(packages = request.packages.len(), manifest = request.manifest.is_some()))]
    fn install(&self, ctx: &RuntimeContext, request: &InstallRequest) -> Result<()> {
        if let Some(manifest) = &request.manifest {
            let mut cmd = self.pip_command(ctx);
            cmd.arg("-r").arg(manifest);
            self.run_checked(cmd, self.install_timeout, "pip install -r")?;
        }
        if !request.packages.is_empty() {
            let mut cmd = self.pip_command(ctx);
            cmd.args(&request.packages);
            self.run_checked(cmd, self.install_timeout, "pip install")?;
        }
        Ok(())
    }

    #[instrument(skip_all, fields(module = %request.module))]
    fn launch(
        &self,
        ctx: &RuntimeContext,
        request: &LaunchRequest,
        interrupt: &InterruptFlag,
    ) -> Result<LaunchStatus> {
        let mut cmd = ctx.python_command(&self.workdir);
        cmd.arg("-m").arg(&request.module).args(&request.args);
        let status = run_attached(cmd)?;
        if interrupt.is_raised() || terminated_by_interrupt(&status) {
            info!("app interrupted by operator");
            return Ok(LaunchStatus::Interrupted);
        }
        Ok(LaunchStatus::Exited(status.code()))
    }
}
