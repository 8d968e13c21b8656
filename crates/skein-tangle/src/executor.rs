//! Timed keyed executor
//!
//! A timer service that manages scheduled callbacks as tasks with a unique
//! identifier, allowing a pending task to be replaced or cancelled under the
//! same key. Tip admission uses it to give every tip an "ages out at time T"
//! eviction.
//!
//! Guarantees:
//! - at most one callback is pending per key; scheduling under an existing
//!   key cancels the previous callback before installing the new one
//! - the table entry is removed before the callback runs, so the entry is
//!   gone even if the callback panics
//! - all table mutations happen under a single lock; callbacks execute
//!   outside the lock

use hashbrown::HashMap;
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

/// Keys usable with the executor.
pub trait TaskKey: Eq + Hash + Clone + Send + 'static {}
impl<T: Eq + Hash + Clone + Send + 'static> TaskKey for T {}

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// What happens to pending tasks on shutdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Pending tasks are dropped without running.
    CancelPending,
    /// Pending tasks run immediately, ignoring their deadlines.
    RunPending,
}

struct QueuedTask<K> {
    fire_at: Instant,
    seq: u64,
    generation: u64,
    key: K,
    callback: Callback,
}

impl<K> PartialEq for QueuedTask<K> {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl<K> Eq for QueuedTask<K> {}

impl<K> PartialOrd for QueuedTask<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for QueuedTask<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed so the BinaryHeap pops the earliest deadline first
        other
            .fire_at
            .cmp(&self.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct State<K> {
    queue: BinaryHeap<QueuedTask<K>>,
    /// Live generation per key. A queued task whose generation no longer
    /// matches was replaced or cancelled and is dropped on pop.
    generations: HashMap<K, u64>,
    next_seq: u64,
    next_generation: u64,
    shutdown: Option<ShutdownMode>,
}

struct Inner<K> {
    state: Mutex<State<K>>,
    task_ready: Condvar,
}

/// Executor that schedules callbacks under unique, replaceable keys.
pub struct TimedTaskExecutor<K: TaskKey> {
    inner: Arc<Inner<K>>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl<K: TaskKey> TimedTaskExecutor<K> {
    /// Create an executor with a fixed number of worker threads.
    pub fn new(worker_count: usize) -> Self {
        let inner = Arc::new(Inner {
            state: Mutex::new(State {
                queue: BinaryHeap::new(),
                generations: HashMap::new(),
                next_seq: 0,
                next_generation: 0,
                shutdown: None,
            }),
            task_ready: Condvar::new(),
        });

        let workers = (0..worker_count.max(1))
            .map(|_| {
                let inner = Arc::clone(&inner);
                thread::spawn(move || worker_loop(&inner))
            })
            .collect();

        Self {
            inner,
            workers: Mutex::new(workers),
        }
    }

    /// Run `callback` after `delay`, replacing any task pending under `key`.
    pub fn execute_after(&self, key: K, delay: Duration, callback: impl FnOnce() + Send + 'static) {
        self.schedule(key, Instant::now() + delay, Box::new(callback));
    }

    /// Run `callback` at the wall-clock instant `at`, replacing any task
    /// pending under `key`. Instants in the past fire immediately.
    pub fn execute_at(&self, key: K, at: SystemTime, callback: impl FnOnce() + Send + 'static) {
        let delay = at
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO);
        self.schedule(key, Instant::now() + delay, Box::new(callback));
    }

    fn schedule(&self, key: K, fire_at: Instant, callback: Callback) {
        {
            let mut state = self.inner.state.lock();
            if state.shutdown.is_some() {
                debug!("executor is shutting down, dropping scheduled task");
                return;
            }
            state.next_generation += 1;
            let generation = state.next_generation;
            state.next_seq += 1;
            let seq = state.next_seq;
            // replaces the live generation; the old queued task turns stale
            state.generations.insert(key.clone(), generation);
            state.queue.push(QueuedTask {
                fire_at,
                seq,
                generation,
                key,
                callback,
            });
        }
        self.inner.task_ready.notify_all();
    }

    /// Cancel the task pending under `key`. Returns true iff one was pending.
    pub fn cancel(&self, key: &K) -> bool {
        self.inner.state.lock().generations.remove(key).is_some()
    }

    /// Number of keys with a pending task.
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().generations.len()
    }

    /// Stop the workers. Pending tasks are cancelled or run to completion
    /// depending on `mode`. Idempotent.
    pub fn shutdown(&self, mode: ShutdownMode) {
        {
            let mut state = self.inner.state.lock();
            if state.shutdown.is_some() {
                return;
            }
            if mode == ShutdownMode::CancelPending {
                state.queue.clear();
                state.generations.clear();
            }
            state.shutdown = Some(mode);
        }
        self.inner.task_ready.notify_all();

        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            let _ = worker.join();
        }
    }
}

impl<K: TaskKey> Drop for TimedTaskExecutor<K> {
    fn drop(&mut self) {
        self.shutdown(ShutdownMode::CancelPending);
    }
}

fn worker_loop<K: TaskKey>(inner: &Inner<K>) {
    loop {
        let task = {
            let mut state = inner.state.lock();
            loop {
                if state.shutdown == Some(ShutdownMode::CancelPending) {
                    return;
                }
                let draining = state.shutdown.is_some();
                let now = Instant::now();
                match state.queue.peek() {
                    None => {
                        if draining {
                            return;
                        }
                        inner.task_ready.wait(&mut state);
                    }
                    Some(next) if next.fire_at > now && !draining => {
                        let timeout = next.fire_at - now;
                        inner.task_ready.wait_for(&mut state, timeout);
                    }
                    Some(_) => {
                        let task = state.queue.pop().expect("queue was just peeked");
                        if state.generations.get(&task.key) == Some(&task.generation) {
                            // entry leaves the table before the callback runs
                            state.generations.remove(&task.key);
                            break task;
                        }
                        // stale: replaced or cancelled since it was queued
                    }
                }
            }
        };

        if catch_unwind(AssertUnwindSafe(task.callback)).is_err() {
            warn!("scheduled task panicked");
        }
    }
}
