//! Job lifecycle state machine.
//!
//! ```text
//! queued --activate--> active --complete--> completed
//!                            \--fail------> failed
//! ```
//!
//! A job may also fail straight from `queued` (for example when the worker
//! cannot start it). Every accepted transition yields exactly one
//! [`Transition`], which the queue turns into one status event. Rejected
//! transitions yield nothing, so no job can report `success` twice or
//! `loading` after a terminal status.

use serde::Serialize;
use serde_json::Value;

/// Where a job currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Active,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// An accepted state change, carrying what the status event needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Activated,
    Completed(Value),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid job transition from {from:?} to {to:?}")]
pub struct TransitionError {
    pub from: JobState,
    pub to: JobState,
}

/// Per-job state holder enforcing legal transitions.
#[derive(Debug)]
pub struct JobLifecycle {
    state: JobState,
}

impl JobLifecycle {
    pub fn new() -> Self {
        Self {
            state: JobState::Queued,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn activate(&mut self) -> Result<Transition, TransitionError> {
        self.advance(JobState::Active, |from| from == JobState::Queued)?;
        Ok(Transition::Activated)
    }

    pub fn complete(&mut self, result: Value) -> Result<Transition, TransitionError> {
        self.advance(JobState::Completed, |from| from == JobState::Active)?;
        Ok(Transition::Completed(result))
    }

    pub fn fail(&mut self) -> Result<Transition, TransitionError> {
        self.advance(JobState::Failed, |from| !from.is_terminal())?;
        Ok(Transition::Failed)
    }

    fn advance(
        &mut self,
        to: JobState,
        allowed_from: impl Fn(JobState) -> bool,
    ) -> Result<(), TransitionError> {
        if !allowed_from(self.state) {
            return Err(TransitionError {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}

impl Default for JobLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
