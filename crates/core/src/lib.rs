//! nJinn core domain logic.
//!
//! Everything that does not need the HTTP layer or the job queue lives here:
//!
//! - [`scripting`] — script persistence, the generation-tracked
//!   [`ScriptRegistry`](scripting::registry::ScriptRegistry), out-of-process
//!   runtimes and the [`ExecutionEngine`](scripting::engine::ExecutionEngine).
//! - [`packages`] — the dependency reconciler and its npm adapter.
//! - [`job`] — job descriptors and webhook destinations.
//! - [`lifecycle`] — the per-job `queued → active → completed/failed`
//!   state machine.

pub mod error;
pub mod job;
pub mod lifecycle;
pub mod packages;
pub mod scripting;
