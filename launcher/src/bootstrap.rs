//! Orchestration for bootstrapping the environment and handing off to the app.
//!
//! A bootstrap walks the state machine in [`crate::core::state`]: verify the
//! interpreter, create the environment if it is absent, activate it, refresh
//! the installer (best effort), install the manifest, then launch. Each step
//! turns its own failure into a [`BootstrapError`] at the step boundary; a
//! failed step never lets a later step run. The caller gets the error back as
//! a [`BootstrapFailure`] whose trail ends in `ERROR`.

use std::fs;

use anyhow::Result;
use tracing::{debug, error, info, instrument, warn};

use crate::core::failure::{BootstrapError, BootstrapFailure};
use crate::core::manifest::parse_manifest;
use crate::core::state::{BootstrapState, StateTrail, StepResult};
use crate::core::version::Version;
use crate::exit_codes;
use crate::io::config::LauncherConfig;
use crate::io::environment::RuntimeContext;
use crate::io::interrupt::InterruptFlag;
use crate::io::paths::ProjectPaths;
use crate::io::toolchain::{InstallRequest, Interpreter, LaunchRequest, LaunchStatus, Toolchain};

/// Bootstrap settings derived from the launcher configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPlan {
    pub candidates: Vec<String>,
    pub min_version: Option<Version>,
    pub upgrade_installer: bool,
    pub packages: Vec<String>,
}

impl BootstrapPlan {
    pub fn from_config(cfg: &LauncherConfig) -> Result<Self> {
        Ok(Self {
            candidates: cfg.interpreter.candidates.clone(),
            min_version: cfg.min_version()?,
            upgrade_installer: cfg.environment.upgrade_installer,
            packages: cfg.environment.packages.clone(),
        })
    }
}

/// An environment that reached `READY`.
#[derive(Debug, Clone)]
pub struct PreparedEnvironment {
    pub trail: StateTrail,
    pub interpreter: Interpreter,
    pub context: RuntimeContext,
    /// `Continue` if the environment was created by this run, `Skipped` if it existed.
    pub creation: StepResult,
    pub refresh: StepResult,
    /// Package lines declared by the manifest.
    pub declared_packages: usize,
}

/// Result of a full run that reached the handoff.
#[derive(Debug, Clone)]
pub struct BootstrapOutcome {
    pub trail: StateTrail,
    pub created: bool,
    pub refresh: StepResult,
    pub launch: LaunchStatus,
}

impl BootstrapOutcome {
    pub fn exit_code(&self) -> i32 {
        match self.launch {
            LaunchStatus::Exited(Some(0)) => exit_codes::OK,
            LaunchStatus::Exited(_) => exit_codes::APP_FAILED,
            LaunchStatus::Interrupted => exit_codes::INTERRUPTED,
        }
    }
}

/// What the steps up to `READY` produced.
struct ReadySteps {
    interpreter: Interpreter,
    context: RuntimeContext,
    creation: StepResult,
    refresh: StepResult,
    declared_packages: usize,
}

/// Bring the environment from unknown to `READY` without launching anything.
#[instrument(skip_all, fields(env_dir = %paths.env_dir.display()))]
pub fn prepare_environment<T: Toolchain>(
    toolchain: &T,
    paths: &ProjectPaths,
    plan: &BootstrapPlan,
) -> Result<PreparedEnvironment, BootstrapFailure> {
    let mut trail = StateTrail::default();
    let result = prepare_steps(toolchain, paths, plan, &mut trail);
    let (trail, ready) = conclude(trail, result)?;
    info!(declared_packages = ready.declared_packages, "environment ready");
    Ok(PreparedEnvironment {
        trail,
        interpreter: ready.interpreter,
        context: ready.context,
        creation: ready.creation,
        refresh: ready.refresh,
        declared_packages: ready.declared_packages,
    })
}

/// Hand off to the target app and block until it exits or is interrupted.
#[instrument(skip_all, fields(module = %request.module))]
pub fn launch_app<T: Toolchain>(
    toolchain: &T,
    paths: &ProjectPaths,
    prepared: PreparedEnvironment,
    request: &LaunchRequest,
    interrupt: &InterruptFlag,
) -> Result<BootstrapOutcome, BootstrapFailure> {
    let PreparedEnvironment {
        mut trail,
        context,
        creation,
        refresh,
        ..
    } = prepared;

    let result = handoff(toolchain, paths, &context, request, interrupt, &mut trail);
    let (trail, status) = conclude(trail, result)?;
    info!(status = ?status, "app stopped");
    Ok(BootstrapOutcome {
        trail,
        created: creation == StepResult::Continue,
        refresh,
        launch: status,
    })
}

/// Prepare the environment, then launch.
pub fn run_bootstrap<T: Toolchain>(
    toolchain: &T,
    paths: &ProjectPaths,
    plan: &BootstrapPlan,
    request: &LaunchRequest,
    interrupt: &InterruptFlag,
) -> Result<BootstrapOutcome, BootstrapFailure> {
    let prepared = prepare_environment(toolchain, paths, plan)?;
    launch_app(toolchain, paths, prepared, request, interrupt)
}

fn prepare_steps<T: Toolchain>(
    toolchain: &T,
    paths: &ProjectPaths,
    plan: &BootstrapPlan,
    trail: &mut StateTrail,
) -> Result<ReadySteps, BootstrapError> {
    let interpreter = find_interpreter(toolchain, plan)?;
    info!(program = %interpreter.program, version = ?interpreter.version, "using interpreter");

    let creation = if paths.env_dir.exists() {
        debug!("environment exists, skipping creation");
        StepResult::Skipped
    } else {
        trail.advance(BootstrapState::Creating)?;
        println!("Creating virtual environment at {}...", paths.env_dir.display());
        toolchain
            .create_environment(&interpreter, &paths.env_dir)
            .map_err(|err| BootstrapError::EnvironmentCreation {
                path: paths.env_dir.clone(),
                detail: format!("{err:#}"),
            })?;
        trail.advance(BootstrapState::Created)?;
        StepResult::Continue
    };

    trail.advance(BootstrapState::Activating)?;
    let context = toolchain
        .activate(&paths.env_dir)
        .map_err(|err| BootstrapError::Activation {
            path: paths.env_dir.clone(),
            detail: format!("{err:#}"),
        })?;
    trail.advance(BootstrapState::Active)?;

    let refresh = if plan.upgrade_installer {
        match toolchain.refresh_installer(&context) {
            Ok(()) => StepResult::Continue,
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(err = %reason, "installer refresh failed, continuing");
                eprintln!("warning: could not upgrade pip, continuing: {reason}");
                StepResult::Tolerated(reason)
            }
        }
    } else {
        StepResult::Skipped
    };

    trail.advance(BootstrapState::Installing)?;
    let (request, declared_packages) = install_request(paths, plan)?;
    println!("Installing requirements...");
    toolchain
        .install(&context, &request)
        .map_err(|err| BootstrapError::Install {
            detail: format!("{err:#}"),
        })?;
    trail.advance(BootstrapState::Ready)?;

    Ok(ReadySteps {
        interpreter,
        context,
        creation,
        refresh,
        declared_packages,
    })
}

fn handoff<T: Toolchain>(
    toolchain: &T,
    paths: &ProjectPaths,
    context: &RuntimeContext,
    request: &LaunchRequest,
    interrupt: &InterruptFlag,
    trail: &mut StateTrail,
) -> Result<LaunchStatus, BootstrapError> {
    if !paths.app_entry.is_file() {
        return Err(BootstrapError::Launch {
            command: request.display(),
            detail: format!("app entry {} not found", paths.app_entry.display()),
        });
    }

    println!(
        "Starting app on http://localhost:{} (Ctrl-C to stop)...",
        request.port
    );
    let status = toolchain
        .launch(context, request, interrupt)
        .map_err(|err| BootstrapError::Launch {
            command: request.display(),
            detail: format!("{err:#}"),
        })?;
    trail.advance(BootstrapState::Running)?;
    match status {
        LaunchStatus::Interrupted => trail.advance(BootstrapState::Interrupted)?,
        LaunchStatus::Exited(_) => trail.advance(BootstrapState::Exited)?,
    }
    Ok(status)
}

/// On failure, move the trail to `ERROR` and pair it with the error.
fn conclude<T>(
    mut trail: StateTrail,
    result: Result<T, BootstrapError>,
) -> Result<(StateTrail, T), BootstrapFailure> {
    let error = match result {
        Ok(value) => return Ok((trail, value)),
        Err(error) => error,
    };
    error!(state = %trail.current(), err = %error, "bootstrap step failed");
    if let Err(illegal) = trail.advance(BootstrapState::Error) {
        warn!(%illegal, "failure raised outside a fatal step");
    }
    Err(BootstrapFailure { trail, error })
}

/// Try each candidate in order; the first that runs and is new enough wins.
fn find_interpreter<T: Toolchain>(
    toolchain: &T,
    plan: &BootstrapPlan,
) -> Result<Interpreter, BootstrapError> {
    let mut rejected = Vec::new();
    for program in &plan.candidates {
        let interpreter = match toolchain.probe_interpreter(program) {
            Ok(interpreter) => interpreter,
            Err(err) => {
                debug!(program = %program, err = %format!("{err:#}"), "interpreter candidate unusable");
                rejected.push(format!("{program}: {err:#}"));
                continue;
            }
        };
        match (plan.min_version, interpreter.version) {
            (None, _) => return Ok(interpreter),
            (Some(min), Some(found)) if found >= min => return Ok(interpreter),
            (Some(min), Some(found)) => {
                rejected.push(format!("{program}: version {found} is older than {min}"));
            }
            (Some(_), None) => {
                rejected.push(format!("{program}: could not determine version"));
            }
        }
    }
    Err(BootstrapError::MissingDependency {
        detail: rejected.join("; "),
    })
}

fn install_request(
    paths: &ProjectPaths,
    plan: &BootstrapPlan,
) -> Result<(InstallRequest, usize), BootstrapError> {
    let raw = fs::read_to_string(&paths.manifest_path).map_err(|err| BootstrapError::Install {
        detail: format!("read manifest {}: {err}", paths.manifest_path.display()),
    })?;
    let manifest = parse_manifest(&raw);
    if manifest.is_empty() {
        debug!("manifest declares nothing, skipping manifest install");
    }
    let request = InstallRequest {
        manifest: (!manifest.is_empty()).then(|| paths.manifest_path.clone()),
        packages: plan.packages.clone(),
    };
    Ok((request, manifest.package_count()))
}
