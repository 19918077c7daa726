//! Script storage and execution.
//!
//! Scripts are persisted through a [`ScriptStore`](store::ScriptStore),
//! loaded into [`Executable`](registry::Executable)s by the
//! [`ScriptRegistry`](registry::ScriptRegistry) and run out of process by a
//! [`ScriptRuntime`](executor::ScriptRuntime). The
//! [`ExecutionEngine`](engine::ExecutionEngine) ties registry and runtime
//! together for both the synchronous API path and the job queue.

pub mod engine;
pub mod executor;
pub mod node;
pub mod registry;
pub mod store;
pub mod subprocess;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;
