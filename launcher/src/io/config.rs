//! Launcher configuration stored in `launcher.toml` next to the app.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::version::Version;

pub const CONFIG_FILE_NAME: &str = "launcher.toml";

/// Launcher configuration (TOML).
///
/// Every field is optional; missing fields fall back to the conventions of a
/// Streamlit project (`venv/`, `requirements.txt`, `app.py`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct LauncherConfig {
    pub interpreter: InterpreterConfig,
    pub environment: EnvironmentConfig,
    pub app: AppConfig,
    pub setup: SetupConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Programs tried in order; the first one that runs and is new enough wins.
    pub candidates: Vec<String>,

    /// Minimum accepted version (`3.9`, `3.10.2`). Empty accepts any version.
    pub min_version: String,

    pub probe_timeout_secs: u64,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        let candidates = if cfg!(windows) {
            vec!["python".to_string(), "py".to_string()]
        } else {
            vec!["python3".to_string(), "python".to_string()]
        };
        Self {
            candidates,
            min_version: "3.9".to_string(),
            probe_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Environment directory, relative to the project directory.
    pub dir: String,

    /// Dependency manifest, relative to the project directory.
    pub manifest: String,

    /// Upgrade pip inside the environment before installing (best effort).
    pub upgrade_installer: bool,

    /// Packages installed after the manifest on every run.
    pub packages: Vec<String>,

    /// Wall-clock budget for each installer invocation.
    pub install_timeout_secs: u64,

    /// Truncate captured installer output beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            dir: "venv".to_string(),
            manifest: "requirements.txt".to_string(),
            upgrade_installer: true,
            packages: vec!["streamlit".to_string()],
            install_timeout_secs: 30 * 60,
            output_limit_bytes: 100_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Entry file passed to the launch module.
    pub entry: String,

    /// Module run with `python -m` for the handoff.
    pub module: String,

    /// Arguments placed between the module and the entry file.
    pub command: Vec<String>,

    /// Flag used to pass a port override to the launch module.
    pub port_flag: String,

    /// Port the launch module binds when no override is given.
    pub default_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            entry: "app.py".to_string(),
            module: "streamlit".to_string(),
            command: vec!["run".to_string()],
            port_flag: "--server.port".to_string(),
            default_port: 8501,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SetupConfig {
    /// Helper scripts marked executable by `launcher setup`.
    pub scripts: Vec<String>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            scripts: vec!["run_app.py".to_string(), "sync_branches.py".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    pub remote: String,
    /// Branch pulled from the remote and merged into `target`.
    pub base: String,
    pub target: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            base: "main".to_string(),
            target: "Development".to_string(),
        }
    }
}

impl LauncherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interpreter.candidates.is_empty()
            || self
                .interpreter
                .candidates
                .iter()
                .any(|c| c.trim().is_empty())
        {
            return Err(anyhow!(
                "interpreter.candidates must be a non-empty array of program names"
            ));
        }
        self.min_version()?;
        if self.interpreter.probe_timeout_secs == 0 {
            return Err(anyhow!("interpreter.probe_timeout_secs must be > 0"));
        }
        if self.environment.dir.trim().is_empty() {
            return Err(anyhow!("environment.dir must not be empty"));
        }
        if Path::new(&self.environment.dir).is_absolute() {
            return Err(anyhow!(
                "environment.dir must be relative to the project directory"
            ));
        }
        if self.environment.manifest.trim().is_empty() {
            return Err(anyhow!("environment.manifest must not be empty"));
        }
        if self.environment.install_timeout_secs == 0 {
            return Err(anyhow!("environment.install_timeout_secs must be > 0"));
        }
        if self.environment.output_limit_bytes == 0 {
            return Err(anyhow!("environment.output_limit_bytes must be > 0"));
        }
        if self.app.entry.trim().is_empty() {
            return Err(anyhow!("app.entry must not be empty"));
        }
        if self.app.module.trim().is_empty() {
            return Err(anyhow!("app.module must not be empty"));
        }
        if self.app.port_flag.trim().is_empty() {
            return Err(anyhow!("app.port_flag must not be empty"));
        }
        if self.app.default_port == 0 {
            return Err(anyhow!("app.default_port must be > 0"));
        }
        for (name, value) in [
            ("sync.remote", &self.sync.remote),
            ("sync.base", &self.sync.base),
            ("sync.target", &self.sync.target),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("{name} must not be empty"));
            }
        }
        if self.sync.base == self.sync.target {
            return Err(anyhow!("sync.base and sync.target must differ"));
        }
        Ok(())
    }

    /// Parsed `interpreter.min_version`; `None` when the check is disabled.
    pub fn min_version(&self) -> Result<Option<Version>> {
        let raw = self.interpreter.min_version.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<Version>()
            .map(Some)
            .with_context(|| format!("interpreter.min_version '{raw}'"))
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `LauncherConfig::default()`.
pub fn load_config(path: &Path) -> Result<LauncherConfig> {
    if !path.exists() {
        let cfg = LauncherConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: LauncherConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid {}", path.display()))?;
    Ok(cfg)
}
