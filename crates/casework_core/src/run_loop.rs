//! Host scheduler abstraction used by the cooperative waiter.
//!
//! A [`RunLoop`] is the hosting environment's event-processing facility. The waiter hands it short slices of time
//! so that pending callbacks (timers, completions) can run and fulfill expectations on the same execution context.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::thread;
use std::time::{Duration, Instant};

/// A unit of deferred work. Runs on the run loop's own context, so it need not be `Send`.
pub type Task = Box<dyn FnOnce() + 'static>;

/// The hosting environment's event-processing facility.
pub trait RunLoop {
    /// Run ready callbacks for up to `slice`, returning once the slice has elapsed.
    fn process_pending_work(&self, slice: Duration);

    /// Schedule `task` to run on this run loop once `delay` has elapsed.
    fn dispatch_after(&self, delay: Duration, task: Task);

    /// Schedule `task` to run during the next slice.
    fn dispatch(&self, task: Task) {
        self.dispatch_after(Duration::ZERO, task);
    }

    /// Drop every scheduled task that has not run yet, returning how many were dropped.
    ///
    /// The runner calls this between units so work left behind by one test never runs during the next.
    fn discard_pending(&self) -> usize;
}

struct Scheduled {
    due: Instant,
    seq: u64,
    task: Task,
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
    // Reversed so the max-heap pops the earliest task first; ties run in dispatch order.
    fn cmp(&self, other: &Self) -> Ordering {
        other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Single-threaded timer queue standing in for a host main loop.
#[derive(Default)]
pub struct MainQueue {
    tasks: RefCell<BinaryHeap<Scheduled>>,
    next_seq: Cell<u64>,
}

impl MainQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scheduled tasks that have not run yet.
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Pop the earliest task if it is due at `now`.
    fn pop_due(&self, now: Instant) -> Option<Task> {
        let mut tasks = self.tasks.borrow_mut();
        if tasks.peek().is_some_and(|next| next.due <= now) {
            tasks.pop().map(|scheduled| scheduled.task)
        } else {
            None
        }
    }

    fn next_due(&self) -> Option<Instant> {
        self.tasks.borrow().peek().map(|next| next.due)
    }
}

impl RunLoop for MainQueue {
    fn process_pending_work(&self, slice: Duration) {
        // An unrepresentable slice has no end: run until the queue drains.
        let end = Instant::now().checked_add(slice);
        loop {
            // The borrow is released before each task runs; tasks may dispatch more work.
            while let Some(task) = self.pop_due(Instant::now()) {
                task();
            }
            let now = Instant::now();
            if end.is_some_and(|end| now >= end) {
                return;
            }
            let wake = match (self.next_due(), end) {
                (Some(due), Some(end)) => due.min(end),
                (Some(due), None) => due,
                (None, Some(end)) => end,
                (None, None) => return,
            };
            thread::sleep(wake.saturating_duration_since(now));
        }
    }

    fn dispatch_after(&self, delay: Duration, task: Task) {
        let Some(due) = Instant::now().checked_add(delay) else {
            // Could never become due.
            tracing::debug!(?delay, "dropping task scheduled beyond the representable future");
            return;
        };
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.tasks.borrow_mut().push(Scheduled { due, seq, task });
    }

    fn discard_pending(&self) -> usize {
        // Taken out first so tasks are dropped without the queue borrowed.
        let discarded = std::mem::take(&mut *self.tasks.borrow_mut());
        discarded.len()
    }
}

#[cfg(feature = "tokio")]
pub use self::tokio_host::TokioRunLoop;

#[cfg(feature = "tokio")]
mod tokio_host {
    use std::cell::RefCell;
    use std::io;
    use std::time::Duration;

    use tokio::runtime::{Builder, Runtime};
    use tokio::task::{JoinHandle, LocalSet};

    use super::{RunLoop, Task};

    /// Run loop backed by a current-thread tokio runtime.
    ///
    /// Dispatched tasks are spawned on a [`LocalSet`], so they may capture `!Send` handles such as expectations.
    pub struct TokioRunLoop {
        runtime: Runtime,
        local: LocalSet,
        spawned: RefCell<Vec<JoinHandle<()>>>,
    }

    impl TokioRunLoop {
        pub fn new() -> io::Result<Self> {
            let runtime = Builder::new_current_thread().enable_time().build()?;
            Ok(Self {
                runtime,
                local: LocalSet::new(),
                spawned: RefCell::new(Vec::new()),
            })
        }

        /// Spawn an arbitrary local future, e.g. one that awaits I/O before fulfilling an expectation.
        pub fn spawn_local<F>(&self, future: F)
        where
            F: std::future::Future<Output = ()> + 'static,
        {
            let handle = self.local.spawn_local(future);
            let mut spawned = self.spawned.borrow_mut();
            spawned.retain(|handle| !handle.is_finished());
            spawned.push(handle);
        }
    }

    impl RunLoop for TokioRunLoop {
        fn process_pending_work(&self, slice: Duration) {
            self.local
                .block_on(&self.runtime, async move { tokio::time::sleep(slice).await });
        }

        fn dispatch_after(&self, delay: Duration, task: Task) {
            self.spawn_local(async move {
                tokio::time::sleep(delay).await;
                task();
            });
        }

        fn discard_pending(&self) -> usize {
            let spawned = std::mem::take(&mut *self.spawned.borrow_mut());
            let mut discarded = 0;
            for handle in spawned.into_iter().filter(|handle| !handle.is_finished()) {
                handle.abort();
                discarded += 1;
            }
            discarded
        }
    }
}
