//! Single-threaded deferred task queue
//!
//! Multi-source push windows defer their reconciliation passes onto a
//! [`TaskQueue`]. Tasks never run inside the call that scheduled them; they
//! run when the owner of the queue calls [`TaskQueue::run_due`] (or awaits
//! [`TaskQueue::drive`]) and the queue's [`Clock`] says they are due.

use log::trace;
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Time source for a [`TaskQueue`]
///
/// `now` is measured from an arbitrary per-clock origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`]
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Virtual clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

struct Scheduled {
    due: Duration,
    seq: u64,
    task: Box<dyn FnOnce()>,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // BinaryHeap is a max-heap: earliest due (then earliest scheduled) first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct QueueInner {
    clock: Rc<dyn Clock>,
    tasks: RefCell<BinaryHeap<Scheduled>>,
    seq: Cell<u64>,
}

/// Cooperative task queue shared by every root on a thread
#[derive(Clone)]
pub struct TaskQueue {
    inner: Rc<QueueInner>,
}

thread_local! {
    static CURRENT: TaskQueue = TaskQueue::system();
}

impl TaskQueue {
    /// Create a queue driven by the given clock
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            inner: Rc::new(QueueInner {
                clock,
                tasks: RefCell::new(BinaryHeap::new()),
                seq: Cell::new(0),
            }),
        }
    }

    /// Create a queue on the wall clock
    pub fn system() -> Self {
        Self::new(Rc::new(SystemClock::new()))
    }

    /// Create a queue on a virtual clock, returning both
    pub fn manual() -> (Self, Rc<ManualClock>) {
        let clock = Rc::new(ManualClock::new());
        (Self::new(clock.clone()), clock)
    }

    /// The thread's default queue
    pub fn current() -> Self {
        CURRENT.with(Clone::clone)
    }

    /// Current time on this queue's clock
    pub fn now(&self) -> Duration {
        self.inner.clock.now()
    }

    /// Schedule `task` to run once `delay` has elapsed
    pub fn defer<F>(&self, delay: Duration, task: F)
    where
        F: FnOnce() + 'static,
    {
        let seq = self.inner.seq.get();
        self.inner.seq.set(seq + 1);
        let due = self.now() + delay;
        trace!("Deferring task #{seq} by {delay:?}");
        self.inner.tasks.borrow_mut().push(Scheduled {
            due,
            seq,
            task: Box::new(task),
        });
    }

    /// Number of tasks waiting to run
    pub fn pending(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// When the earliest waiting task becomes due
    pub fn next_due(&self) -> Option<Duration> {
        self.inner.tasks.borrow().peek().map(|scheduled| scheduled.due)
    }

    /// Run every task that is due now, including tasks they schedule that
    /// are also already due. Returns the number of tasks run.
    pub fn run_due(&self) -> usize {
        let mut ran = 0;
        loop {
            let now = self.now();
            let next = {
                let mut tasks = self.inner.tasks.borrow_mut();
                match tasks.peek() {
                    Some(scheduled) if scheduled.due <= now => tasks.pop(),
                    _ => None,
                }
            };

            match next {
                Some(scheduled) => {
                    (scheduled.task)();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Run tasks as they fall due until the queue is empty, sleeping on the
    /// tokio timer in between. Only meaningful for wall-clock queues.
    pub async fn drive(&self) {
        loop {
            self.run_due();
            let Some(due) = self.next_due() else {
                return;
            };
            let now = self.now();
            if due > now {
                tokio::time::sleep(due - now).await;
            }
        }
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.pending())
            .field("now", &self.now())
            .finish()
    }
}
