//! Interpreter version parsing and comparison.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::{Result, anyhow};
use regex::Regex;

static VERSION_OUTPUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Python\s+(\d+)\.(\d+)(?:\.(\d+))?").expect("valid version regex")
});

/// `major.minor.patch`; ordering is lexicographic over the fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = anyhow::Error;

    /// Accepts `3`, `3.9` or `3.9.1`.
    fn from_str(raw: &str) -> Result<Self> {
        let mut parts = raw.trim().split('.');
        let mut next = |name: &str, required: bool| -> Result<u32> {
            match parts.next() {
                Some(part) => part
                    .parse::<u32>()
                    .map_err(|_| anyhow!("invalid {name} component '{part}' in version '{raw}'")),
                None if required => Err(anyhow!("empty version")),
                None => Ok(0),
            }
        };
        let major = next("major", true)?;
        let minor = next("minor", false)?;
        let patch = next("patch", false)?;
        if parts.next().is_some() {
            return Err(anyhow!("too many components in version '{raw}'"));
        }
        Ok(Version::new(major, minor, patch))
    }
}

/// Extract the version from `python --version` output.
///
/// Older interpreters print to stderr, so callers pass both streams joined.
pub fn parse_version_output(output: &str) -> Option<Version> {
    let caps = VERSION_OUTPUT_RE.captures(output)?;
    let major = caps.get(1)?.as_str().parse().ok()?;
    let minor = caps.get(2)?.as_str().parse().ok()?;
    let patch = caps
        .get(3)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    Some(Version::new(major, minor, patch))
}
