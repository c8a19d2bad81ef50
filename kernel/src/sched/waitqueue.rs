//! Generic wait-queue primitive.
//!
//! A `WaitQueue` is a FIFO of blocked threads plus a counter of pending
//! wakeups. The counter exists so that a `wakeup()` racing a concurrent
//! `sleep()` is never lost: if the wakeup arrives before the sleeper has
//! queued itself, the sleeper observes the pending count and returns
//! immediately instead of blocking forever.
//!
//! A thread is on at most one wait-queue at a time; the queue this thread
//! is blocked on is also recorded on the `Task` itself (`blocked_on`) so a
//! timeout can remove it without searching every queue in the system.

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::collections::VecDeque;
use core::{
    ptr::NonNull,
    sync::atomic::{AtomicU32, Ordering},
};

use spin::Mutex;

use super::{task::Task, task_ptr::TaskPtr};

/// Outcome of a `sleep` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepResult {
    /// Woken by a matching `wakeup` call.
    Woken,
    /// The timeout elapsed before any wakeup arrived.
    TimedOut,
    /// `sleep` returned immediately because a wakeup was already pending.
    AlreadyPending,
    /// Woken by a signal while `interruptible` was set.
    Interrupted,
}

/// Which threads a `wakeup` call should release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeupMode {
    /// Release only the thread that has waited longest.
    First,
    /// Release every thread currently queued.
    All,
}

struct Inner {
    /// FIFO of blocked threads, oldest first.
    waiters: VecDeque<TaskPtr>,
    /// Wakeups delivered while nothing was waiting. Consumed one-for-one
    /// by the next `sleep` call so that `wakeup()` before `sleep()` is not
    /// lost (the classic missed-wakeup race).
    pending: u32,
}

/// FIFO wait-queue with pending-wakeup tracking.
///
/// Grounded in the kernel's existing IPC blocking map
/// (`sched::ipc_blocking`), generalized into a standalone reusable
/// primitive usable by mutexes, semaphores, and IPC call/answer blocking
/// alike.
pub struct WaitQueue {
    inner: Mutex<Inner>,
    len_hint: AtomicU32,
}

impl WaitQueue {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                waiters: VecDeque::new(),
                pending: 0,
            }),
            len_hint: AtomicU32::new(0),
        }
    }

    /// Approximate number of threads currently queued. Racy by design —
    /// intended for diagnostics, not for synchronization decisions.
    pub fn len(&self) -> usize {
        self.len_hint.load(Ordering::Relaxed) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enqueue `task` onto this wait-queue. If a wakeup is already
    /// pending, consume it and return `SleepResult::AlreadyPending`
    /// without ever placing the thread in the queue — this is what
    /// prevents the timeout-vs-wakeup race from stranding a sleeper.
    ///
    /// Returns `None` when the thread was actually queued (the caller
    /// must then mark the task Sleeping, release its own lock, and
    /// invoke the scheduler; the eventual `wakeup`/timeout path removes
    /// the thread from `waiters` and re-readies it).
    pub fn sleep(&self, task: NonNull<Task>) -> Option<SleepResult> {
        let mut inner = self.inner.lock();
        if inner.pending > 0 {
            inner.pending -= 1;
            return Some(SleepResult::AlreadyPending);
        }
        inner.waiters.push_back(TaskPtr::new(task));
        self.len_hint.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Release waiters per `mode`. Returns the tasks that were released
    /// so the caller can re-enqueue them onto a run-queue. If nobody was
    /// waiting, the wakeup is banked in `pending` so a subsequent
    /// `sleep()` returns immediately instead of blocking.
    #[cfg(feature = "alloc")]
    pub fn wakeup(&self, mode: WakeupMode) -> alloc::vec::Vec<NonNull<Task>> {
        let mut inner = self.inner.lock();
        let mut woken = alloc::vec::Vec::new();
        match mode {
            WakeupMode::First => {
                if let Some(t) = inner.waiters.pop_front() {
                    self.len_hint.fetch_sub(1, Ordering::Relaxed);
                    woken.push(t.as_ptr());
                } else {
                    inner.pending += 1;
                }
            }
            WakeupMode::All => {
                let n = inner.waiters.len() as u32;
                if n == 0 {
                    inner.pending += 1;
                } else {
                    self.len_hint.fetch_sub(n, Ordering::Relaxed);
                    woken.extend(inner.waiters.drain(..).map(|t| t.as_ptr()));
                }
            }
        }
        woken
    }

    /// Called by the timeout path: if `task` is still queued, remove it
    /// and report `TimedOut`. If a concurrent `wakeup` already removed it
    /// (it won the race for `inner`'s lock first), this is a no-op and the
    /// caller should trust the wakeup path's `Woken` result instead —
    /// the pending-wakeup counter is never consulted here, since consuming
    /// it would wrongly cancel a wakeup meant for a different, later
    /// sleeper.
    pub fn cancel(&self, task: NonNull<Task>) -> bool {
        let mut inner = self.inner.lock();
        if let Some(pos) = inner.waiters.iter().position(|t| t.as_ptr() == task) {
            inner.waiters.remove(pos);
            self.len_hint.fetch_sub(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, feature = "alloc"))]
mod tests {
    use super::*;

    fn fake_task() -> NonNull<Task> {
        // Tests only exercise queue bookkeeping, never dereference the
        // pointer, so a dangling-but-non-null value is sufficient.
        NonNull::new(0x1000 as *mut Task).unwrap()
    }

    #[test]
    fn wakeup_before_sleep_is_not_lost() {
        let wq = WaitQueue::new();
        let woken = wq.wakeup(WakeupMode::First);
        assert!(woken.is_empty());
        let result = wq.sleep(fake_task());
        assert_eq!(result, Some(SleepResult::AlreadyPending));
    }

    #[test]
    fn sleep_then_wakeup_releases_fifo_order() {
        let wq = WaitQueue::new();
        let a = NonNull::new(0x1000 as *mut Task).unwrap();
        let b = NonNull::new(0x2000 as *mut Task).unwrap();
        assert!(wq.sleep(a).is_none());
        assert!(wq.sleep(b).is_none());
        let woken = wq.wakeup(WakeupMode::First);
        assert_eq!(woken, alloc::vec![a]);
        assert_eq!(wq.len(), 1);
    }

    #[test]
    fn cancel_removes_timed_out_sleeper_without_losing_queue() {
        let wq = WaitQueue::new();
        let a = fake_task();
        wq.sleep(a);
        assert!(wq.cancel(a));
        assert!(wq.is_empty());
        // A wakeup after cancellation finds nobody and is banked.
        let woken = wq.wakeup(WakeupMode::All);
        assert!(woken.is_empty());
    }
}
