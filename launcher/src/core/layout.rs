//! Platform-specific layout of an isolated Python environment.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    /// Directory inside the environment that holds its executables.
    pub fn bin_dir_name(self) -> &'static str {
        match self {
            Platform::Unix => "bin",
            Platform::Windows => "Scripts",
        }
    }

    pub fn executable_name(self, stem: &str) -> String {
        match self {
            Platform::Unix => stem.to_string(),
            Platform::Windows => format!("{stem}.exe"),
        }
    }

    pub fn path_list_separator(self) -> &'static str {
        match self {
            Platform::Unix => ":",
            Platform::Windows => ";",
        }
    }
}

/// Resolved locations inside an environment directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvLayout {
    pub root: PathBuf,
    pub bin_dir: PathBuf,
    pub python: PathBuf,
}

impl EnvLayout {
    pub fn new(root: impl Into<PathBuf>, platform: Platform) -> Self {
        let root = root.into();
        let bin_dir = root.join(platform.bin_dir_name());
        let python = bin_dir.join(platform.executable_name("python"));
        Self {
            root,
            bin_dir,
            python,
        }
    }
}

/// Build a `PATH` value with `bin_dir` first, followed by the inherited entries.
pub fn prepend_path(bin_dir: &Path, inherited: Option<&OsStr>, platform: Platform) -> OsString {
    let mut value = OsString::from(bin_dir.as_os_str());
    if let Some(rest) = inherited.filter(|rest| !rest.is_empty()) {
        value.push(platform.path_list_separator());
        value.push(rest);
    }
    value
}
