//! Fixed-size worker pool for fork-join expansion.
//!
//! Jobs go through a bounded queue. When the queue is full the job runs on
//! the submitting thread instead, so fan-out never grows the queue without
//! bound. A thread waiting on a [`Scope`] keeps draining the queue while it
//! waits, which lets nested joins make progress with any number of workers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender, TrySendError};
use tracing::warn;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Stop,
}

/// A group of jobs that can be waited on together.
pub struct Scope {
    pending: AtomicUsize,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
}

impl Scope {
    #[must_use]
    pub fn new() -> Arc<Self> {
        let (done_tx, done_rx) = unbounded();
        Arc::new(Self {
            pending: AtomicUsize::new(0),
            done_tx,
            done_rx,
        })
    }

    /// Jobs spawned into this scope that have not finished.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    fn complete(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _ = self.done_tx.send(());
        }
    }
}

/// Marks a scope job finished even if the job unwinds.
struct Completion(Arc<Scope>);

impl Drop for Completion {
    fn drop(&mut self) {
        self.0.complete();
    }
}

/// Bounded pool of named worker threads.
///
/// A pool with zero workers runs every job inline at spawn time.
pub struct WorkerPool {
    tx: Sender<Message>,
    rx: Receiver<Message>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
    queue_capacity: usize,
    saturated: AtomicBool,
    inline_runs: AtomicUsize,
}

impl WorkerPool {
    /// Start `workers` threads sharing a queue of `queue_capacity` jobs.
    pub fn start(workers: usize, queue_capacity: usize) -> std::io::Result<Self> {
        let (tx, rx) = bounded::<Message>(queue_capacity.max(1));

        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let rx = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("rotation-search-{idx}"))
                .spawn(move || loop {
                    match rx.recv() {
                        Ok(Message::Run(job)) => job(),
                        Ok(Message::Stop) | Err(_) => break,
                    }
                })?;
            handles.push(handle);
        }

        Ok(Self {
            tx,
            rx,
            workers: Mutex::new(handles),
            worker_count: workers,
            queue_capacity: queue_capacity.max(1),
            saturated: AtomicBool::new(false),
            inline_runs: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Jobs that ran on the submitting thread because the queue was full.
    #[must_use]
    pub fn inline_runs(&self) -> usize {
        self.inline_runs.load(Ordering::Relaxed)
    }

    /// Run `job` as part of `scope`.
    pub fn spawn<F>(&self, scope: &Arc<Scope>, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        scope.pending.fetch_add(1, Ordering::AcqRel);
        let done = Completion(Arc::clone(scope));
        let wrapped: Job = Box::new(move || {
            let _done = done;
            job();
        });

        if self.worker_count == 0 {
            wrapped();
            return;
        }

        match self.tx.try_send(Message::Run(wrapped)) {
            Ok(()) => {}
            Err(TrySendError::Full(Message::Run(job)))
            | Err(TrySendError::Disconnected(Message::Run(job))) => {
                if !self.saturated.swap(true, Ordering::Relaxed) {
                    warn!(
                        capacity = self.queue_capacity,
                        "Job queue saturated; running jobs on the submitting thread"
                    );
                }
                self.inline_runs.fetch_add(1, Ordering::Relaxed);
                job();
            }
            Err(TrySendError::Full(Message::Stop))
            | Err(TrySendError::Disconnected(Message::Stop)) => {}
        }
    }

    /// Block until every job in `scope` has finished, running queued jobs
    /// in the meantime.
    pub fn join(&self, scope: &Scope) {
        while scope.pending() > 0 {
            select! {
                recv(scope.done_rx) -> _ => {}
                recv(self.rx) -> message => match message {
                    Ok(Message::Run(job)) => job(),
                    Ok(Message::Stop) => {
                        // Not ours to consume; hand it back to the workers.
                        let _ = self.tx.send(Message::Stop);
                    }
                    Err(_) => {}
                },
            }
        }
    }

    /// Stop every worker and wait for them to exit.
    ///
    /// Only call once all scopes have been joined.
    pub fn shutdown(&self) {
        let handles = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for _ in 0..handles.len() {
            let _ = self.tx.send(Message::Stop);
        }
        for handle in handles {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn test_serial_pool_runs_inline() {
        let pool = WorkerPool::start(0, 4).unwrap();
        let scope = Scope::new();
        let hits = Arc::new(AtomicU64::new(0));

        for _ in 0..5 {
            let hits = Arc::clone(&hits);
            pool.spawn(&scope, move || {
                hits.fetch_add(1, Ordering::Relaxed);
            });
            assert_eq!(scope.pending(), 0);
        }
        pool.join(&scope);

        assert_eq!(hits.load(Ordering::Relaxed), 5);
        assert_eq!(pool.worker_count(), 0);
    }

    #[test]
    fn test_join_waits_for_all_jobs() {
        let pool = WorkerPool::start(3, 16).unwrap();
        let scope = Scope::new();
        let total = Arc::new(AtomicU64::new(0));

        for i in 1..=100u64 {
            let total = Arc::clone(&total);
            pool.spawn(&scope, move || {
                total.fetch_add(i, Ordering::Relaxed);
            });
        }
        pool.join(&scope);

        assert_eq!(scope.pending(), 0);
        assert_eq!(total.load(Ordering::Relaxed), 5050);
    }

    /// Each job spawns two children into its own scope and joins them.
    fn fan_out(pool: &Arc<WorkerPool>, depth: u32, leaves: &Arc<AtomicU64>) {
        if depth == 0 {
            leaves.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let scope = Scope::new();
        for _ in 0..2 {
            let pool_ref = Arc::clone(pool);
            let leaves = Arc::clone(leaves);
            pool.spawn(&scope, move || fan_out(&pool_ref, depth - 1, &leaves));
        }
        pool.join(&scope);
    }

    #[test]
    fn test_nested_joins_with_tiny_queue() {
        let pool = Arc::new(WorkerPool::start(2, 1).unwrap());
        let leaves = Arc::new(AtomicU64::new(0));

        fan_out(&pool, 8, &leaves);

        assert_eq!(leaves.load(Ordering::Relaxed), 256);
        pool.shutdown();
    }

    #[test]
    fn test_panicking_job_still_completes_scope() {
        let pool = WorkerPool::start(0, 1).unwrap();
        let scope = Scope::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pool.spawn(&scope, || panic!("boom"));
        }));

        assert!(result.is_err());
        assert_eq!(scope.pending(), 0);
        pool.join(&scope);
    }
}
