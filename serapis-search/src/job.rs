//! Fork-join jobs: spawn work, then join with or without a deadline.
//!
//! A [`Job`] wraps one tokio task. The task writes its result exactly once
//! and then raises the completion flag; the owner of the handle only reads.
//! A panic inside the work is caught in the task and leaves the value empty,
//! so joiners never observe a crash.
//!
//! There is no per-job cancel in the join API. Abandoning a job means the
//! joiner stops waiting for it; the handle then cancels the task's token so
//! the underlying work is torn down instead of running on untracked.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio_util::sync::CancellationToken;

/// Upper bound on how late a deadline join may return past its deadline.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Write-once result slot shared between a worker and its handle.
struct Slot<T> {
    completed: AtomicBool,
    value: Mutex<Option<T>>,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            completed: AtomicBool::new(false),
            value: Mutex::new(None),
        }
    }

    fn fill(&self, value: Option<T>) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = value;
        self.completed.store(true, Ordering::Release);
    }

    fn take(&self) -> Option<T> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Handle to a scheduled unit of work.
///
/// Dropping the handle before the work finishes cancels it.
pub struct Job<T> {
    slot: Arc<Slot<T>>,
    done: watch::Receiver<bool>,
    cancel: CancellationToken,
}

impl<T> Job<T> {
    /// Whether the work has finished (successfully or not).
    pub fn is_completed(&self) -> bool {
        self.slot.completed.load(Ordering::Acquire)
    }

    /// Take the result out of a completed job.
    ///
    /// Returns `None` while the job is running, if the work panicked or was
    /// cancelled, or if the value was already taken.
    pub fn take_value(&self) -> Option<T> {
        if !self.is_completed() {
            return None;
        }
        self.slot.take()
    }

    /// Wait until the job completes.
    pub async fn wait(&self) {
        let mut done = self.done.clone();
        // A closed channel means the worker is gone; nothing left to wait for.
        let _ = done.wait_for(|completed| *completed).await;
    }

    fn abandon(&self) {
        self.cancel.cancel();
    }
}

impl<T> Drop for Job<T> {
    fn drop(&mut self) {
        if !self.is_completed() {
            self.cancel.cancel();
        }
    }
}

/// Optional cap on how many job bodies run at once.
///
/// Jobs scheduled beyond the cap are spawned immediately but wait for a
/// permit before starting their work.
#[derive(Debug, Clone, Default)]
pub struct JobLimiter {
    permits: Option<Arc<Semaphore>>,
}

impl JobLimiter {
    /// A limiter that lets every job run immediately.
    pub fn unbounded() -> Self {
        Self { permits: None }
    }

    /// A limiter allowing `max_running` concurrent bodies; `0` is unbounded.
    pub fn new(max_running: usize) -> Self {
        if max_running == 0 {
            return Self::unbounded();
        }
        Self {
            permits: Some(Arc::new(Semaphore::new(max_running))),
        }
    }

    /// Start `work` on its own task and return its handle immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F, T>(&self, work: F) -> Job<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let slot = Arc::new(Slot::new());
        let (done_tx, done_rx) = watch::channel(false);
        let cancel = CancellationToken::new();

        let worker_slot = Arc::clone(&slot);
        let token = cancel.clone();
        let permits = self.permits.clone();

        tokio::spawn(async move {
            let run = async move {
                let _permit = match permits {
                    Some(semaphore) => match semaphore.acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(_) => return None,
                    },
                    None => None,
                };
                match AssertUnwindSafe(work).catch_unwind().await {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("scheduled job panicked; its result is discarded");
                        None
                    }
                }
            };

            let outcome = tokio::select! {
                _ = token.cancelled() => None,
                outcome = run => outcome,
            };

            worker_slot.fill(outcome);
            let _ = done_tx.send(true);
        });

        Job {
            slot,
            done: done_rx,
            cancel,
        }
    }
}

/// Start `work` on its own task without a concurrency cap.
pub fn schedule<F, T>(work: F) -> Job<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    JobLimiter::unbounded().schedule(work)
}

/// Wait for every job, however long it takes, and return their values in
/// scheduling order. Jobs whose work panicked yield `None`.
pub async fn join_all<T>(jobs: Vec<Job<T>>) -> Vec<Option<T>> {
    futures::future::join_all(jobs.iter().map(Job::wait)).await;
    jobs.iter().map(Job::take_value).collect()
}

/// Values gathered by a deadline join.
#[derive(Debug)]
pub struct JoinOutcome<T> {
    /// Values of jobs that finished in time, in scheduling order.
    pub completed: Vec<T>,
    /// Jobs still running at the deadline. Their work was cancelled.
    pub abandoned: usize,
}

/// Wait until all jobs complete or `max_duration` has elapsed, whichever
/// comes first.
///
/// Jobs still running at the deadline are abandoned: they are left out of
/// the outcome, counted, and cancelled. A completed job whose work panicked
/// contributes no value and is not counted as abandoned.
pub async fn join_until<T>(jobs: Vec<Job<T>>, max_duration: Duration) -> JoinOutcome<T> {
    let all = futures::future::join_all(jobs.iter().map(Job::wait));
    if tokio::time::timeout(max_duration, all).await.is_err() {
        tracing::debug!(
            max_ms = max_duration.as_millis() as u64,
            "join deadline reached"
        );
    }

    let mut completed = Vec::with_capacity(jobs.len());
    let mut abandoned = 0;
    for job in &jobs {
        if job.is_completed() {
            completed.extend(job.take_value());
        } else {
            job.abandon();
            abandoned += 1;
        }
    }

    JoinOutcome {
        completed,
        abandoned,
    }
}
