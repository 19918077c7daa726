//! In-process job queue with bounded concurrency.
//!
//! [`JobQueue::start`] spawns a single dispatcher task. The dispatcher
//! waits for a free concurrency permit *before* taking the next job off the
//! channel, so jobs start in the order they were enqueued. Each dispatched
//! job runs on its own worker task, which drives the job's
//! [`JobLifecycle`] and hands every resulting status event to a per-job
//! reporter for in-order delivery.
//!
//! Shutdown stops dispatching, drops jobs that never started and gives
//! in-flight jobs a grace period to finish.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use njinn_core::job::Job;
use njinn_core::lifecycle::{JobLifecycle, Transition, TransitionError};
use njinn_core::scripting::engine::ExecutionEngine;
use njinn_events::{EventClock, StatusNotifier, WebhookEvent};

use crate::reporter;

/// Default number of jobs executing at once.
pub const DEFAULT_CONCURRENCY: usize = 100;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum number of concurrently executing jobs (at least 1).
    pub concurrency: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Job queue is shut down")]
    Closed,
}

/// Point-in-time queue occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Accepted jobs not yet dispatched.
    pub queued: usize,
    /// Jobs currently executing.
    pub active: usize,
    pub concurrency: usize,
}

#[derive(Default)]
struct Counters {
    queued: AtomicUsize,
    active: AtomicUsize,
}

/// Decrements the active counter when a worker finishes, however it exits.
struct ActiveGuard(Arc<Counters>);

impl ActiveGuard {
    fn new(counters: &Arc<Counters>) -> Self {
        counters.active.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counters))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handle to a running queue.
pub struct JobQueue {
    sender: mpsc::UnboundedSender<Job>,
    counters: Arc<Counters>,
    concurrency: usize,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl JobQueue {
    /// Spawn the dispatcher and return a handle for enqueueing jobs.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        config: QueueConfig,
        engine: Arc<ExecutionEngine>,
        notifier: Arc<dyn StatusNotifier>,
    ) -> Self {
        let concurrency = config.concurrency.max(1);
        let (sender, receiver) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();

        let dispatcher = Dispatcher {
            receiver,
            permits: Arc::new(Semaphore::new(concurrency)),
            worker: Worker {
                engine,
                notifier,
                counters: Arc::clone(&counters),
                clock: *EventClock::global(),
                tracker: tracker.clone(),
            },
        };
        tracker.spawn(dispatcher.run(cancel.clone()));

        tracing::info!(concurrency, "Job queue started");

        Self {
            sender,
            counters,
            concurrency,
            cancel,
            tracker,
        }
    }

    /// Accept `job` for background execution. Never waits for the job to run.
    pub fn enqueue(&self, job: Job) -> Result<(), QueueError> {
        if self.cancel.is_cancelled() {
            return Err(QueueError::Closed);
        }
        self.counters.queued.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(job).is_err() {
            self.counters.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Closed);
        }
        Ok(())
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            queued: self.counters.queued.load(Ordering::SeqCst),
            active: self.counters.active.load(Ordering::SeqCst),
            concurrency: self.concurrency,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop dispatching and wait up to `grace` for in-flight jobs and their
    /// pending status events.
    ///
    /// Jobs that were accepted but never started are dropped without any
    /// event. Returns `true` if everything finished within `grace`; work
    /// still running afterwards is abandoned.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.cancel.cancel();
        self.tracker.close();

        let drained = tokio::time::timeout(grace, self.tracker.wait())
            .await
            .is_ok();
        if drained {
            tracing::info!("Job queue drained");
        } else {
            tracing::warn!(
                grace_secs = grace.as_secs_f64(),
                active = self.counters.active.load(Ordering::SeqCst),
                "Job queue shutdown grace period elapsed, abandoning in-flight jobs",
            );
        }
        drained
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

struct Dispatcher {
    receiver: mpsc::UnboundedReceiver<Job>,
    permits: Arc<Semaphore>,
    worker: Worker,
}

impl Dispatcher {
    async fn run(mut self, cancel: CancellationToken) {
        loop {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let job = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                job = self.receiver.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            self.worker.counters.queued.fetch_sub(1, Ordering::SeqCst);
            self.worker.spawn(job, permit);
        }

        self.receiver.close();
        let mut dropped = 0usize;
        while let Ok(job) = self.receiver.try_recv() {
            self.worker.counters.queued.fetch_sub(1, Ordering::SeqCst);
            tracing::debug!(job_id = %job.id, "Dropping queued job on shutdown");
            dropped += 1;
        }
        tracing::info!(dropped, "Job dispatcher shutting down");
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct Worker {
    engine: Arc<ExecutionEngine>,
    notifier: Arc<dyn StatusNotifier>,
    counters: Arc<Counters>,
    clock: EventClock,
    tracker: TaskTracker,
}

impl Worker {
    fn spawn(&self, job: Job, permit: OwnedSemaphorePermit) {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("job", job_id = %job.id, script = %job.script, %run_id);
        let worker = self.clone();
        self.tracker
            .spawn(async move { worker.run(job, permit).await }.instrument(span));
    }

    async fn run(self, job: Job, permit: OwnedSemaphorePermit) {
        let Job {
            id,
            script,
            context,
            webhook,
        } = job;

        let (events, receiver) = mpsc::unbounded_channel();
        self.tracker.spawn(
            reporter::run(Arc::clone(&self.notifier), webhook, receiver).in_current_span(),
        );

        let mut lifecycle = JobLifecycle::new();
        {
            let _active = ActiveGuard::new(&self.counters);
            let _permit = permit;

            self.emit(&events, &id, lifecycle.activate());
            tracing::debug!("Job started");

            match self.engine.execute(&script, context).await {
                Ok(result) => {
                    tracing::info!("Job completed");
                    self.emit(&events, &id, lifecycle.complete(result));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Job failed");
                    self.emit(&events, &id, lifecycle.fail());
                }
            }
        }
        tracing::debug!(state = ?lifecycle.state(), "Job released its slot");
        // Dropping the sender lets the reporter finish once it has
        // delivered everything.
        drop(events);
    }

    fn emit(
        &self,
        events: &mpsc::UnboundedSender<WebhookEvent>,
        id: &str,
        transition: Result<Transition, TransitionError>,
    ) {
        match transition {
            Ok(transition) => {
                let event = WebhookEvent::for_transition(id, transition, self.clock.now_ms());
                // The reporter only stops after the sender is dropped.
                let _ = events.send(event);
            }
            Err(e) => tracing::error!(error = %e, "Rejected job transition"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
