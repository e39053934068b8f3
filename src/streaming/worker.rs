//! Fixed-size worker pool for chunk regeneration
//!
//! The main loop never blocks on this pool: it asks whether a thread is free
//! and drops the request otherwise, so streaming work cannot pile up.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use crate::core::error::Error;
use crate::core::types::Result;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct QueueState {
    jobs: VecDeque<Job>,
    /// Threads waiting for work
    idle: usize,
    /// Jobs currently executing
    running: usize,
    shutdown: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    work_available: Condvar,
    drained: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Thread pool pulling boxed jobs from a FIFO queue
pub struct WorldWorker {
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
}

impl WorldWorker {
    /// Spawn `thread_count` worker threads
    pub fn new(thread_count: usize) -> Result<Self> {
        if thread_count == 0 {
            return Err(Error::Worker("worker pool needs at least one thread".into()));
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                idle: thread_count,
                running: 0,
                shutdown: false,
            }),
            work_available: Condvar::new(),
            drained: Condvar::new(),
        });

        let mut worker = Self {
            shared: Arc::clone(&shared),
            threads: Vec::with_capacity(thread_count),
        };
        for i in 0..thread_count {
            let shared = Arc::clone(&shared);
            let handle = std::thread::Builder::new()
                .name(format!("world-worker-{i}"))
                .spawn(move || Self::worker_loop(&shared))
                .map_err(|e| Error::Worker(format!("failed to spawn worker thread: {e}")))?;
            worker.threads.push(handle);
        }

        log::debug!("WorldWorker started with {} thread(s)", thread_count);
        Ok(worker)
    }

    fn worker_loop(shared: &Shared) {
        let mut state = shared.lock();
        loop {
            if let Some(job) = state.jobs.pop_front() {
                state.idle -= 1;
                state.running += 1;
                drop(state);

                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    log::error!("World worker job panicked");
                }

                state = shared.lock();
                state.running -= 1;
                state.idle += 1;
                if state.jobs.is_empty() && state.running == 0 {
                    shared.drained.notify_all();
                }
            } else if state.shutdown {
                return;
            } else {
                state = shared
                    .work_available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// True when an idle thread would pick up a new job right away
    pub fn are_any_threads_available(&self) -> bool {
        let state = self.shared.lock();
        state.idle > state.jobs.len()
    }

    /// Queue a job only if a thread is free. Returns whether it was queued.
    pub fn try_enqueue(&self, job: impl FnOnce() + Send + 'static) -> bool {
        let mut state = self.shared.lock();
        if state.idle <= state.jobs.len() {
            return false;
        }
        state.jobs.push_back(Box::new(job));
        self.shared.work_available.notify_one();
        true
    }

    /// Jobs queued or running
    pub fn pending_jobs(&self) -> usize {
        let state = self.shared.lock();
        state.jobs.len() + state.running
    }

    /// Block until every queued job has finished
    pub fn wait_idle(&self) {
        let mut state = self.shared.lock();
        while !state.jobs.is_empty() || state.running > 0 {
            state = self
                .shared
                .drained
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Drop for WorldWorker {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.work_available.notify_all();
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                log::warn!("World worker thread exited with a panic");
            }
        }
    }
}
