use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// A deferred unit of work handed to a [`Scheduler`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Abstraction for getting the current time.
pub trait Clock: Send + Sync {
    /// Current UTC timestamp in milliseconds.
    fn now_ms(&self) -> u64;
}

/// Abstraction for running a callback after a delay.
///
/// Dispatch never blocks on completions; it registers them here and returns.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Task);
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Production scheduler backed by the tokio timer.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Default)]
pub struct TokioScheduler;

impl TokioScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}

/// Deterministic scheduler for tests: time only moves when `advance` is
/// called, and due tasks run in (fire time, submission order).
///
/// Tasks may schedule further tasks while running; those are placed relative
/// to the virtual instant at which the running task fired.
#[derive(Default)]
pub struct VirtualScheduler {
    inner: Mutex<VirtualState>,
}

#[derive(Default)]
struct VirtualState {
    now_ms: u64,
    next_seq: u64,
    queue: BinaryHeap<QueuedTask>,
}

struct QueuedTask {
    fire_at_ms: u64,
    seq: u64,
    task: Task,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at_ms == other.fire_at_ms && self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the earliest task surfaces.
        (other.fire_at_ms, other.seq).cmp(&(self.fire_at_ms, self.seq))
    }
}

impl VirtualScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Moves virtual time forward, running every task due on the way.
    pub fn advance(&self, delta: Duration) {
        let target = self.now_ms().saturating_add(delta.as_millis() as u64);
        loop {
            let due = {
                let mut state = self.guard();
                let ready = state
                    .queue
                    .peek()
                    .is_some_and(|next| next.fire_at_ms <= target);
                if ready {
                    state.queue.pop().map(|entry| {
                        state.now_ms = entry.fire_at_ms;
                        entry.task
                    })
                } else {
                    state.now_ms = target;
                    None
                }
            };
            // Run outside the lock so the task can schedule follow-ups.
            match due {
                Some(task) => task(),
                None => break,
            }
        }
    }

    /// Number of tasks not yet fired.
    pub fn pending(&self) -> usize {
        self.guard().queue.len()
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, VirtualState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        let mut state = self.guard();
        let fire_at_ms = state.now_ms.saturating_add(delay.as_millis() as u64);
        let seq = state.next_seq;
        state.next_seq += 1;
        state.queue.push(QueuedTask {
            fire_at_ms,
            seq,
            task,
        });
    }
}

impl Clock for VirtualScheduler {
    fn now_ms(&self) -> u64 {
        self.guard().now_ms
    }
}
