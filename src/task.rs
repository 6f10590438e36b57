//! Background task pool and single-assignment result handles.
//!
//! Shader loads, mesh loads, pipeline creation and frame building all run
//! as closures on one dedicated [`TaskPool`]. Each spawn returns a [`Task`]
//! whose result is delivered through a channel, so it can be polled without
//! blocking or waited on from any thread.
//!
//! [`AsyncLoad`] wraps a [`TaskCell`] behind a lock so a handle can be shared
//! between the thread that starts a load and the tasks that consume it. The
//! first consumer to wait caches the result and later consumers get the
//! cached value. Waiting happens outside the lock.
//!
//! # Panics on workers
//!
//! The pool installs no panic handler, so a panic inside a spawned closure
//! aborts the process. Fatal renderer errors raised on a worker rely on this.

use std::sync::mpsc;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::error::{RendererError, RendererResult};

/// Dedicated worker pool for renderer background work.
///
/// Clone is cheap (Arc-wrapped).
#[derive(Clone)]
pub struct TaskPool {
    pool: Arc<rayon::ThreadPool>,
}

impl TaskPool {
    /// Build a pool with `num_threads` named workers.
    pub fn new(num_threads: usize) -> RendererResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|index| format!("renderer-worker-{index}"))
            .build()
            .map_err(|e| RendererError::TaskPool(e.to_string()))?;

        log::debug!("Task pool started with {} workers", num_threads);

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Number of worker threads.
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `job` on a worker and return a handle to its result.
    pub fn spawn<T, F>(&self, name: &'static str, job: F) -> Task<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();

        self.pool.spawn(move || {
            log::trace!("Task `{name}` started");
            let result = job();
            // The receiver may already be gone if nobody cares about the result.
            let _ = sender.send(result);
            log::trace!("Task `{name}` finished");
        });

        Task {
            name,
            receiver,
            result: None,
        }
    }
}

/// Handle to one spawned job.
pub struct Task<T> {
    name: &'static str,
    receiver: mpsc::Receiver<T>,
    result: Option<T>,
}

impl<T> Task<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check for the result without blocking.
    pub fn poll(&mut self) -> Option<&T> {
        if self.result.is_none() {
            if let Ok(value) = self.receiver.try_recv() {
                self.result = Some(value);
            }
        }
        self.result.as_ref()
    }

    pub fn is_finished(&mut self) -> bool {
        self.poll().is_some()
    }

    /// Block until the job completes and return its result.
    ///
    /// Returns `None` if the job was dropped without producing a value.
    pub fn wait(mut self) -> Option<T> {
        if let Some(value) = self.result.take() {
            return Some(value);
        }
        self.receiver.recv().ok()
    }
}

impl<T> std::fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("received", &self.result.is_some())
            .finish()
    }
}

/// Tri-state result cell, plus the transient state of a consumer waiting on
/// the in-flight task.
#[derive(Debug)]
pub enum TaskCell<T> {
    Unstarted,
    InFlight(Task<T>),
    /// A consumer took the task out and is blocked on it without the lock
    Waiting,
    Resolved(T),
}

impl<T> Default for TaskCell<T> {
    fn default() -> Self {
        TaskCell::Unstarted
    }
}

struct LoadShared<T> {
    cell: Mutex<TaskCell<T>>,
    settled: Condvar,
}

/// Shareable asynchronous load handle.
///
/// At most one load is in flight per handle: starting a new load first
/// settles the previous one and hands its value back to the caller.
///
/// A blocking consumer waits with the cell unlocked, so [`AsyncLoad::try_get`]
/// and the other non-blocking queries stay responsive while a load runs.
pub struct AsyncLoad<T> {
    shared: Arc<LoadShared<T>>,
}

impl<T> Clone for AsyncLoad<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for AsyncLoad<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AsyncLoad<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(LoadShared {
                cell: Mutex::new(TaskCell::Unstarted),
                settled: Condvar::new(),
            }),
        }
    }

    /// Wait for any in-flight task and move its result into the cell.
    ///
    /// The lock is released while blocked on the task. Other consumers that
    /// arrive meanwhile park on the condvar until the result is stored.
    fn settle(&self, cell: &mut MutexGuard<'_, TaskCell<T>>) {
        loop {
            match std::mem::take(&mut **cell) {
                TaskCell::InFlight(task) => {
                    **cell = TaskCell::Waiting;
                    let name = task.name();
                    let value = MutexGuard::unlocked(cell, || task.wait());
                    **cell = match value {
                        Some(value) => TaskCell::Resolved(value),
                        None => {
                            log::warn!("Task `{name}` ended without a result");
                            TaskCell::Unstarted
                        }
                    };
                    self.shared.settled.notify_all();
                    return;
                }
                TaskCell::Waiting => {
                    **cell = TaskCell::Waiting;
                    self.shared.settled.wait(cell);
                }
                other => {
                    **cell = other;
                    return;
                }
            }
        }
    }

    /// Start `job` on `pool`.
    ///
    /// Returns the value of the previous load, if any, so the caller can
    /// release whatever it owns.
    pub fn start<F>(&self, pool: &TaskPool, name: &'static str, job: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let mut cell = self.shared.cell.lock();
        self.settle(&mut cell);
        let previous = std::mem::replace(&mut *cell, TaskCell::InFlight(pool.spawn(name, job)));
        match previous {
            TaskCell::Resolved(value) => Some(value),
            _ => None,
        }
    }

    /// Discard the handle's state, returning the previously loaded value.
    ///
    /// An in-flight load is waited on first.
    pub fn reset(&self) -> Option<T> {
        let mut cell = self.shared.cell.lock();
        self.settle(&mut cell);
        match std::mem::take(&mut *cell) {
            TaskCell::Resolved(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_started(&self) -> bool {
        !matches!(*self.shared.cell.lock(), TaskCell::Unstarted)
    }

    /// True if a result has been observed and cached.
    pub fn is_resolved(&self) -> bool {
        matches!(*self.shared.cell.lock(), TaskCell::Resolved(_))
    }
}

impl<T: Clone> AsyncLoad<T> {
    /// The loaded value, blocking on an in-flight load.
    ///
    /// Returns `None` if nothing was started.
    pub fn get(&self) -> Option<T> {
        let mut cell = self.shared.cell.lock();
        self.settle(&mut cell);
        match &*cell {
            TaskCell::Resolved(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// The loaded value if the load has already finished. Never blocks.
    ///
    /// Returns `None` while another consumer is still waiting on the task.
    pub fn try_get(&self) -> Option<T> {
        let mut cell = self.shared.cell.lock();
        let finished = match &mut *cell {
            TaskCell::InFlight(task) => task.is_finished(),
            TaskCell::Waiting => false,
            _ => true,
        };
        if !finished {
            return None;
        }
        self.settle(&mut cell);
        match &*cell {
            TaskCell::Resolved(value) => Some(value.clone()),
            _ => None,
        }
    }
}
