use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::models::error::RoutingError;

/// Work run once after a delay.
pub type DeferredTask = Box<dyn FnOnce() + Send + 'static>;

/// Cancellation signal shared by every task of one scheduler.
struct Signal {
    cancelled: Mutex<bool>,
    wake: Condvar,
    skipped: AtomicUsize,
}

struct Slots {
    closed: bool,
    handles: Vec<thread::JoinHandle<()>>,
}

/// One-shot delayed tasks that are all cancelled together.
///
/// Each task waits on its own thread. [`DeferredScheduler::shutdown`] closes
/// the scheduler, wakes pending tasks so they exit without running, then
/// joins every thread. Once it returns no task can run, and any later
/// `schedule` fails with `SchedulingFailed`.
pub struct DeferredScheduler {
    signal: Arc<Signal>,
    slots: Mutex<Slots>,
}

impl DeferredScheduler {
    pub fn new() -> Self {
        Self {
            signal: Arc::new(Signal {
                cancelled: Mutex::new(false),
                wake: Condvar::new(),
                skipped: AtomicUsize::new(0),
            }),
            slots: Mutex::new(Slots {
                closed: false,
                handles: Vec::new(),
            }),
        }
    }

    /// Run `task` once after `delay` unless the scheduler shuts down first.
    pub fn schedule(&self, label: &str, delay: Duration, task: DeferredTask) -> Result<(), RoutingError> {
        // Held across the spawn so shutdown sees every thread it must join.
        let mut slots = self.slots.lock();
        if slots.closed {
            return Err(RoutingError::SchedulingFailed(format!(
                "scheduler is shut down; {} task dropped",
                label
            )));
        }

        let signal = Arc::clone(&self.signal);
        let deadline = Instant::now() + delay;
        let handle = thread::Builder::new()
            .name(format!("splitroute-{}", label))
            .spawn(move || {
                {
                    let mut cancelled = signal.cancelled.lock();
                    while !*cancelled {
                        if signal.wake.wait_until(&mut cancelled, deadline).timed_out() {
                            break;
                        }
                    }
                    if *cancelled {
                        signal.skipped.fetch_add(1, Ordering::SeqCst);
                        return;
                    }
                }
                task();
            })
            .map_err(|e| RoutingError::SchedulingFailed(format!("failed to spawn {} timer: {}", label, e)))?;

        slots.handles.retain(|h| !h.is_finished());
        slots.handles.push(handle);
        Ok(())
    }

    /// Number of tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        self.slots.lock().handles.iter().filter(|h| !h.is_finished()).count()
    }

    pub fn is_shut_down(&self) -> bool {
        self.slots.lock().closed
    }

    /// Block until every scheduled task has finished or `timeout` elapses.
    /// Returns whether the scheduler went idle in time.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.pending() == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(2));
        }
    }

    /// Close the scheduler, cancel every waiting task and join any task
    /// already running.
    ///
    /// Returns how many tasks were cancelled before they ran. Tasks that
    /// were already running finish and are not counted.
    pub fn shutdown(&self) -> usize {
        let handles = {
            let mut slots = self.slots.lock();
            slots.closed = true;
            std::mem::take(&mut slots.handles)
        };
        *self.signal.cancelled.lock() = true;
        self.signal.wake.notify_all();

        let current = thread::current().id();
        for handle in handles {
            // A task that tears the plugin down cannot join itself.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                log::error!("Deferred task panicked");
            }
        }
        self.signal.skipped.swap(0, Ordering::SeqCst)
    }
}

impl Default for DeferredScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DeferredScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
