//! Marking helper scripts executable.

use std::path::Path;

use anyhow::Result;

/// Add execute permission for user, group and other (`chmod +x`).
///
/// Windows has no execute bit; the call succeeds without changes there.
#[cfg(unix)]
pub fn mark_executable(path: &Path) -> Result<()> {
    use anyhow::Context;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)
        .with_context(|| format!("stat {}", path.display()))?
        .permissions();
    perms.set_mode(perms.mode() | 0o111);
    fs::set_permissions(path, perms).with_context(|| format!("chmod {}", path.display()))
}

#[cfg(not(unix))]
pub fn mark_executable(path: &Path) -> Result<()> {
    tracing::debug!(path = %path.display(), "no execute bit on this platform");
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn adds_execute_bits_and_keeps_existing_mode() {
        let temp = tempfile::tempdir().expect("tempdir");
        let script = temp.path().join("run_app.py");
        fs::write(&script, "print('hi')\n").expect("write");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o640)).expect("chmod");

        mark_executable(&script).expect("mark");
        let mode = fs::metadata(&script).expect("metadata").permissions().mode() & 0o777;
        assert_eq!(mode, 0o751);
    }

    #[test]
    fn missing_file_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(mark_executable(&temp.path().join("missing.py")).is_err());
    }
}
