//! Fatal bootstrap failures and how each one is reported to the operator.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::layout::Platform;
use crate::core::state::{IllegalTransition, StateTrail};
use crate::exit_codes;

pub const PYTHON_DOWNLOAD_URL: &str = "https://www.python.org/downloads/";

/// A step failure that aborts the run. Each variant maps to its own exit code.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Python interpreter not available: {detail}")]
    MissingDependency { detail: String },

    #[error("could not create environment at {}: {detail}", path.display())]
    EnvironmentCreation { path: PathBuf, detail: String },

    #[error("could not activate environment at {}: {detail}", path.display())]
    Activation { path: PathBuf, detail: String },

    #[error("dependency installation failed: {detail}")]
    Install { detail: String },

    #[error("could not launch {command}: {detail}")]
    Launch { command: String, detail: String },

    #[error(transparent)]
    Transition(#[from] IllegalTransition),
}

impl BootstrapError {
    pub fn exit_code(&self) -> i32 {
        match self {
            BootstrapError::MissingDependency { .. } => exit_codes::MISSING_DEPENDENCY,
            BootstrapError::EnvironmentCreation { .. } => exit_codes::ENV_CREATION,
            BootstrapError::Activation { .. } => exit_codes::ACTIVATION,
            BootstrapError::Install { .. } => exit_codes::INSTALL,
            BootstrapError::Launch { .. } => exit_codes::LAUNCH,
            BootstrapError::Transition(_) => exit_codes::INVALID,
        }
    }

    /// Operator-facing next step for this failure.
    pub fn remediation(&self, platform: Platform) -> String {
        match self {
            BootstrapError::MissingDependency { .. } => format!(
                "install Python from {PYTHON_DOWNLOAD_URL} and make sure it is on PATH, then re-run"
            ),
            BootstrapError::EnvironmentCreation { .. } => {
                "check free disk space and write permissions in the project directory, then re-run"
                    .to_string()
            }
            BootstrapError::Activation { path, .. } => match platform {
                Platform::Windows => format!(
                    "script execution may be blocked by the PowerShell execution policy; run \
                     `Set-ExecutionPolicy -Scope CurrentUser RemoteSigned` or use the batch \
                     launcher instead. If the environment is corrupted, delete {} and re-run",
                    path.display()
                ),
                Platform::Unix => format!(
                    "the environment may be corrupted; delete {} and re-run to recreate it",
                    path.display()
                ),
            },
            BootstrapError::Install { .. } => {
                "check the dependency manifest and network access, then re-run".to_string()
            }
            BootstrapError::Launch { .. } => {
                "make sure the launch module is listed in the manifest or in \
                 environment.packages, then re-run to reinstall"
                    .to_string()
            }
            BootstrapError::Transition(_) => "this is a launcher bug; please report it".to_string(),
        }
    }
}

/// A fatal failure together with the states the run visited, ending in `ERROR`.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct BootstrapFailure {
    pub trail: StateTrail,
    pub error: BootstrapError,
}

impl BootstrapFailure {
    pub fn exit_code(&self) -> i32 {
        self.error.exit_code()
    }

    pub fn remediation(&self, platform: Platform) -> String {
        self.error.remediation(platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_fatal_step_has_a_distinct_exit_code() {
        let errors = [
            BootstrapError::MissingDependency {
                detail: "x".to_string(),
            },
            BootstrapError::EnvironmentCreation {
                path: PathBuf::from("venv"),
                detail: "x".to_string(),
            },
            BootstrapError::Activation {
                path: PathBuf::from("venv"),
                detail: "x".to_string(),
            },
            BootstrapError::Install {
                detail: "x".to_string(),
            },
            BootstrapError::Launch {
                command: "streamlit".to_string(),
                detail: "x".to_string(),
            },
        ];
        let mut codes: Vec<i32> = errors.iter().map(BootstrapError::exit_code).collect();
        assert!(codes.iter().all(|code| *code != exit_codes::OK));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn activation_hint_depends_on_platform() {
        let err = BootstrapError::Activation {
            path: PathBuf::from("venv"),
            detail: "blocked".to_string(),
        };
        assert!(err.remediation(Platform::Windows).contains("execution policy"));
        assert!(err.remediation(Platform::Windows).contains("batch launcher"));
        assert!(!err.remediation(Platform::Unix).contains("execution policy"));
        assert!(err.remediation(Platform::Unix).contains("delete venv"));
    }

    #[test]
    fn failure_reports_like_its_error() {
        let mut trail = StateTrail::default();
        trail
            .advance(crate::core::state::BootstrapState::Error)
            .expect("absent -> error");
        let failure = BootstrapFailure {
            trail,
            error: BootstrapError::Install {
                detail: "resolver conflict".to_string(),
            },
        };
        assert_eq!(failure.exit_code(), exit_codes::INSTALL);
        assert_eq!(
            failure.to_string(),
            "dependency installation failed: resolver conflict"
        );
        assert!(failure.remediation(Platform::Unix).contains("manifest"));
    }

    #[test]
    fn missing_interpreter_hint_links_download_page() {
        let err = BootstrapError::MissingDependency {
            detail: "python3: not found".to_string(),
        };
        assert!(err.remediation(Platform::Unix).contains(PYTHON_DOWNLOAD_URL));
        assert_eq!(err.exit_code(), exit_codes::MISSING_DEPENDENCY);
    }
}
