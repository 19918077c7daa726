//! nJinn background job queue.
//!
//! [`JobQueue`] accepts [`Job`](njinn_core::job::Job)s without waiting for
//! them to run, dispatches them in FIFO order to at most `concurrency`
//! concurrent workers, and reports each job's `loading` / `success` /
//! `fail` transitions to its webhook through a dedicated per-job reporter.

pub mod queue;
mod reporter;

pub use queue::{JobQueue, QueueConfig, QueueError, QueueStats};
