//! Bootstrap state machine.
//!
//! ```text
//! ABSENT -> CREATING -> CREATED -> ACTIVATING -> ACTIVE -> INSTALLING -> READY -> RUNNING
//!    \_____________________________^                                              |
//!                                                                  EXITED | INTERRUPTED
//! ```
//!
//! `ABSENT -> ACTIVATING` is taken when the environment already exists. Every
//! state that runs a fatal step has an edge to `ERROR`.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapState {
    Absent,
    Creating,
    Created,
    Activating,
    Active,
    Installing,
    Ready,
    Running,
    Exited,
    Interrupted,
    Error,
}

impl BootstrapState {
    /// True if `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: BootstrapState) -> bool {
        use BootstrapState as S;
        if next == S::Error {
            return self.has_fatal_edge();
        }
        matches!(
            (self, next),
            (S::Absent, S::Creating)
                | (S::Absent, S::Activating)
                | (S::Creating, S::Created)
                | (S::Created, S::Activating)
                | (S::Activating, S::Active)
                | (S::Active, S::Installing)
                | (S::Installing, S::Ready)
                | (S::Ready, S::Running)
                | (S::Running, S::Exited)
                | (S::Running, S::Interrupted)
        )
    }

    /// States whose outgoing step can abort the run.
    ///
    /// `Created` and `Active` have no fatal edge: leaving them runs nothing
    /// that can fail, or only the tolerated installer refresh.
    pub fn has_fatal_edge(self) -> bool {
        matches!(
            self,
            BootstrapState::Absent
                | BootstrapState::Creating
                | BootstrapState::Activating
                | BootstrapState::Installing
                | BootstrapState::Ready
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BootstrapState::Absent => "ABSENT",
            BootstrapState::Creating => "CREATING",
            BootstrapState::Created => "CREATED",
            BootstrapState::Activating => "ACTIVATING",
            BootstrapState::Active => "ACTIVE",
            BootstrapState::Installing => "INSTALLING",
            BootstrapState::Ready => "READY",
            BootstrapState::Running => "RUNNING",
            BootstrapState::Exited => "EXITED",
            BootstrapState::Interrupted => "INTERRUPTED",
            BootstrapState::Error => "ERROR",
        }
    }
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal bootstrap transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: BootstrapState,
    pub to: BootstrapState,
}

/// Ordered record of the states a run has visited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTrail {
    visited: Vec<BootstrapState>,
}

impl Default for StateTrail {
    fn default() -> Self {
        Self {
            visited: vec![BootstrapState::Absent],
        }
    }
}

impl StateTrail {
    pub fn current(&self) -> BootstrapState {
        self.visited
            .last()
            .copied()
            .unwrap_or(BootstrapState::Absent)
    }

    pub fn advance(&mut self, next: BootstrapState) -> Result<(), IllegalTransition> {
        let from = self.current();
        if !from.can_advance_to(next) {
            return Err(IllegalTransition { from, to: next });
        }
        self.visited.push(next);
        Ok(())
    }

    pub fn visited(&self) -> &[BootstrapState] {
        &self.visited
    }

    pub fn contains(&self, state: BootstrapState) -> bool {
        self.visited.contains(&state)
    }
}

/// Result of a step that did not abort the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Continue,
    /// Step had nothing to do (e.g. the environment already existed).
    Skipped,
    /// Step failed but is not required for correctness.
    Tolerated(String),
}
