//! Operator cancellation (Ctrl-C) during the blocking handoff.

use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tracing::info;

/// Shared flag set when the operator interrupts the launcher.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    raised: Arc<AtomicBool>,
}

impl InterruptFlag {
    /// Install the process-wide Ctrl-C handler. Call once, from `main`.
    ///
    /// The handler only records the interrupt; the attached child receives the
    /// same console signal and decides how to exit.
    pub fn install() -> Result<Self> {
        let flag = Self::default();
        let raised = flag.raised.clone();
        ctrlc::set_handler(move || {
            info!("received Ctrl-C, waiting for the app to stop");
            raised.store(true, Ordering::SeqCst);
        })
        .context("install Ctrl-C handler")?;
        Ok(flag)
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

/// True if the child's exit status says it died from a console interrupt.
pub fn terminated_by_interrupt(status: &ExitStatus) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        const SIGINT: i32 = 2;
        status.signal() == Some(SIGINT)
    }
    #[cfg(windows)]
    {
        // STATUS_CONTROL_C_EXIT
        status.code() == Some(0xC000_013Au32 as i32)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = status;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raise_is_visible_through_clones() {
        let flag = InterruptFlag::default();
        let observer = flag.clone();
        assert!(!observer.is_raised());
        flag.raise();
        assert!(observer.is_raised());
    }

    #[cfg(unix)]
    #[test]
    fn sigint_exit_counts_as_interrupt() {
        use std::os::unix::process::ExitStatusExt;
        assert!(terminated_by_interrupt(&ExitStatus::from_raw(2)));
        assert!(!terminated_by_interrupt(&ExitStatus::from_raw(0)));
        assert!(!terminated_by_interrupt(&ExitStatus::from_raw(1 << 8)));
    }
}
