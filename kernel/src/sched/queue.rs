//! Per-CPU flat priority run-queues.
//!
//! Each CPU owns `N_QUEUES` FIFO queues indexed by priority, queue 0 being
//! the highest. A task's queue index is derived from its effective
//! priority (`Task::effective_priority`, 0..=99) scaled down into
//! `0..N_QUEUES`. `nrdy` is tracked both per-CPU and globally so the load
//! balancer (`sched::load_balance::kcpulb`) can compute a fair target
//! without scanning every queue on every CPU.

#[cfg(feature = "alloc")]
extern crate alloc;

use core::{
    ptr::NonNull,
    sync::atomic::{AtomicU32, Ordering},
};

use spin::Mutex;

use super::{task::Task, task_ptr::TaskPtr};

/// Number of priority levels per CPU run-queue.
pub const N_QUEUES: usize = 16;

/// Maximum tasks held in a single priority level before `enqueue` fails.
const MAX_TASKS_PER_QUEUE: usize = 256;

/// Number of `relink_rq` calls with nothing promoted before a splice fires.
///
/// Chosen so that a steadily busy CPU promotes stale low-priority tasks
/// roughly once per timer-tick burst rather than every single schedule
/// decision (which would defeat priority scheduling entirely).
pub const NEEDS_RELINK_MAX: u32 = 10;

/// Global count of ready tasks across all CPUs.
pub static GLOBAL_NRDY: AtomicU32 = AtomicU32::new(0);

/// Fixed-capacity circular FIFO for one priority level.
pub struct PriorityQueue {
    tasks: [Option<TaskPtr>; MAX_TASKS_PER_QUEUE],
    head: usize,
    tail: usize,
    count: usize,
}

impl PriorityQueue {
    pub const fn new() -> Self {
        Self {
            tasks: [None; MAX_TASKS_PER_QUEUE],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn is_full(&self) -> bool {
        self.count == MAX_TASKS_PER_QUEUE
    }

    fn push_back(&mut self, task: NonNull<Task>) -> bool {
        if self.is_full() {
            return false;
        }
        self.tasks[self.tail] = Some(TaskPtr::new(task));
        self.tail = (self.tail + 1) % MAX_TASKS_PER_QUEUE;
        self.count += 1;
        true
    }

    fn pop_front(&mut self) -> Option<NonNull<Task>> {
        if self.is_empty() {
            return None;
        }
        let task = self.tasks[self.head].take();
        self.head = (self.head + 1) % MAX_TASKS_PER_QUEUE;
        self.count -= 1;
        task.map(|t| t.as_ptr())
    }

    /// Drain this queue and append it, in order, to `head_first ++ self`
    /// onto `dst`. Used by `relink_rq` to splice queue *k+1* onto *k*.
    fn drain_into(&mut self, dst: &mut PriorityQueue) -> usize {
        let mut moved = 0;
        while let Some(task) = self.pop_front() {
            // dst is never full in practice (relink only runs under light
            // load); drop silently on the pathological case rather than
            // lose the pointer.
            if dst.push_back(task) {
                moved += 1;
            }
        }
        moved
    }

    fn remove(&mut self, target: NonNull<Task>) -> bool {
        if self.is_empty() {
            return false;
        }
        let mut new_tasks = [None; MAX_TASKS_PER_QUEUE];
        let mut new_count = 0;
        let mut found = false;
        let mut idx = self.head;
        for _ in 0..self.count {
            if let Some(task) = self.tasks[idx] {
                if task.as_ptr() != target {
                    new_tasks[new_count] = Some(task);
                    new_count += 1;
                } else {
                    found = true;
                }
            }
            idx = (idx + 1) % MAX_TASKS_PER_QUEUE;
        }
        if found {
            self.tasks = new_tasks;
            self.head = 0;
            self.tail = new_count;
            self.count = new_count;
        }
        found
    }
}

impl Default for PriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a task's effective priority (0 = highest, 99 = lowest) onto a
/// run-queue index in `0..N_QUEUES`.
pub fn priority_to_queue_index(effective_priority: u8) -> usize {
    ((effective_priority as usize) * N_QUEUES / 100).min(N_QUEUES - 1)
}

/// One CPU's flat set of run-queues, plus the per-CPU ready count and the
/// anti-starvation relink counter.
pub struct RunQueue {
    queues: [Mutex<PriorityQueue>; N_QUEUES],
    bitmap: AtomicU32,
    nrdy: AtomicU32,
    needs_relink: AtomicU32,
}

impl RunQueue {
    pub const fn new() -> Self {
        Self {
            queues: [const { Mutex::new(PriorityQueue::new()) }; N_QUEUES],
            bitmap: AtomicU32::new(0),
            nrdy: AtomicU32::new(0),
            needs_relink: AtomicU32::new(0),
        }
    }

    pub fn nrdy(&self) -> u32 {
        self.nrdy.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.bitmap.load(Ordering::Relaxed) == 0
    }

    /// Enqueue `task` at the run-queue index derived from its effective
    /// priority. Returns false if that level's queue is full.
    pub fn enqueue(&self, task: NonNull<Task>) -> bool {
        let idx = unsafe { priority_to_queue_index(task.as_ref().effective_priority()) };
        self.enqueue_at(task, idx)
    }

    /// Enqueue at an explicit level. `waitq_wakeup` uses this to place a
    /// freshly woken thread at priority −1 relative to its class (queue 0
    /// if nothing higher is defined) so it runs promptly after a wakeup.
    pub fn enqueue_at(&self, task: NonNull<Task>, idx: usize) -> bool {
        let idx = idx.min(N_QUEUES - 1);
        let mut q = self.queues[idx].lock();
        if q.push_back(task) {
            self.bitmap.fetch_or(1 << idx, Ordering::Relaxed);
            self.nrdy.fetch_add(1, Ordering::Relaxed);
            GLOBAL_NRDY.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// `find_best_thread`: lowest-index non-empty queue wins, FIFO within
    /// it. Returns the dequeued task and the queue index it came from (the
    /// caller uses the index to assign `ticks = (priority+1) × slice` and
    /// to drive `relink_rq`).
    pub fn dequeue(&self) -> Option<(NonNull<Task>, usize)> {
        loop {
            let bitmap = self.bitmap.load(Ordering::Relaxed);
            if bitmap == 0 {
                return None;
            }
            let idx = bitmap.trailing_zeros() as usize;
            let mut q = self.queues[idx].lock();
            if let Some(task) = q.pop_front() {
                if q.is_empty() {
                    self.bitmap.fetch_and(!(1 << idx), Ordering::Relaxed);
                }
                drop(q);
                self.nrdy.fetch_sub(1, Ordering::Relaxed);
                GLOBAL_NRDY.fetch_sub(1, Ordering::Relaxed);
                return Some((task, idx));
            }
            // Bitmap said non-empty but a racing dequeue got there first;
            // clear the stale bit and retry.
            if q.is_empty() {
                self.bitmap.fetch_and(!(1 << idx), Ordering::Relaxed);
            }
        }
    }

    /// Remove a specific task regardless of which level it sits at (used
    /// when migrating threads or reaping an Exiting thread still queued).
    pub fn remove(&self, task: NonNull<Task>, idx: usize) -> bool {
        let idx = idx.min(N_QUEUES - 1);
        let mut q = self.queues[idx].lock();
        let removed = q.remove(task);
        if removed {
            if q.is_empty() {
                self.bitmap.fetch_and(!(1 << idx), Ordering::Relaxed);
            }
            self.nrdy.fetch_sub(1, Ordering::Relaxed);
            GLOBAL_NRDY.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    /// Steal one task from the lowest-priority non-empty queue, skipping
    /// any task for which `skip` returns true (wired or already-stolen
    /// threads). Used by `kcpulb`.
    pub fn steal(&self, skip: impl Fn(NonNull<Task>) -> bool) -> Option<NonNull<Task>> {
        for idx in (0..N_QUEUES).rev() {
            let mut q = self.queues[idx].lock();
            if q.is_empty() {
                continue;
            }
            // Scan from the back (longest-waiting at this level are at the
            // front and should be left to run locally first).
            let mut idx_in_q = q.head;
            for _ in 0..q.count {
                if let Some(t) = q.tasks[idx_in_q] {
                    if !skip(t.as_ptr()) {
                        q.remove(t.as_ptr());
                        if q.is_empty() {
                            self.bitmap.fetch_and(!(1 << idx), Ordering::Relaxed);
                        }
                        self.nrdy.fetch_sub(1, Ordering::Relaxed);
                        GLOBAL_NRDY.fetch_sub(1, Ordering::Relaxed);
                        return Some(t.as_ptr());
                    }
                }
                idx_in_q = (idx_in_q + 1) % MAX_TASKS_PER_QUEUE;
            }
        }
        None
    }

    /// Anti-starvation splice: once `needs_relink` exceeds
    /// `NEEDS_RELINK_MAX`, queue *k+1* is spliced onto queue *k* for every
    /// *k* from `start` up to `N_QUEUES - 2`, promoting threads that have
    /// waited behind higher-priority work. Only fires forward from the
    /// just-picked priority, never backward into higher-priority queues.
    pub fn relink_rq(&self, start: usize) {
        if self.needs_relink.load(Ordering::Relaxed) <= NEEDS_RELINK_MAX {
            return;
        }
        for i in start..N_QUEUES.saturating_sub(1) {
            let (lo, hi) = self.queues.split_at(i + 1);
            let mut lower = lo[i].lock();
            let mut higher = hi[0].lock();
            let moved = higher.drain_into(&mut lower);
            if moved > 0 {
                self.bitmap.fetch_or(1 << i, Ordering::Relaxed);
            }
            if higher.is_empty() {
                self.bitmap.fetch_and(!(1 << (i + 1)), Ordering::Relaxed);
            }
        }
        self.needs_relink.store(0, Ordering::Relaxed);
    }

    /// Bump the relink counter; called once per `schedule()` invocation.
    pub fn tick_relink(&self) {
        self.needs_relink.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for RunQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Maximum number of CPUs supported by the per-CPU run-queue table.
pub const MAX_CPUS: usize = 64;

/// Per-CPU run-queues.
pub static PER_CPU_QUEUES: [RunQueue; MAX_CPUS] = [const { RunQueue::new() }; MAX_CPUS];

/// Borrow the run-queue belonging to `cpu_id`.
pub fn run_queue(cpu_id: usize) -> &'static RunQueue {
    &PER_CPU_QUEUES[cpu_id % MAX_CPUS]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_maps_into_range() {
        assert_eq!(priority_to_queue_index(0), 0);
        assert_eq!(priority_to_queue_index(99), N_QUEUES - 1);
        assert!(priority_to_queue_index(50) < N_QUEUES);
    }
}
