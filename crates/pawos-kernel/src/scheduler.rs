//! [`Scheduler`] – cooperative periodic task dispatcher.
//!
//! Each registered task has a fixed period. Every call to
//! [`Scheduler::wait_until_next_task`] picks the task with the earliest
//! absolute deadline, sleeps until that deadline through the injected
//! [`Clock`], and returns the task's [`TaskId`]. Task identity is the
//! registration order.
//!
//! A task that is dispatched late (its deadline had already passed when the
//! scheduler looked) is rescheduled one period from *now*, so an overrun
//! shifts that task's phase instead of producing a burst of catch-up
//! dispatches.
//!
//! # Example
//!
//! ```
//! use pawos_hal::sim::SimClock;
//! use pawos_kernel::scheduler::Scheduler;
//!
//! let mut clock = SimClock::new();
//! let mut scheduler = Scheduler::<2>::new();
//! let fast = scheduler.register_task(5_000).unwrap();
//! let slow = scheduler.register_task(15_000).unwrap();
//!
//! let order: Vec<_> = (0..4)
//!     .map(|_| scheduler.wait_until_next_task(&mut clock).unwrap())
//!     .collect();
//! assert_eq!(order, vec![fast, fast, fast, slow]);
//! ```

use pawos_hal::Clock;
use pawos_types::PawError;
use tracing::debug;

/// Index of a registered task.
pub type TaskId = usize;

#[derive(Debug, Clone, Copy)]
struct TaskSlot {
    period_us: u64,
    deadline_us: u64,
}

impl TaskSlot {
    const EMPTY: Self = Self {
        period_us: 0,
        deadline_us: 0,
    };
}

#[derive(Debug)]
pub struct Scheduler<const N: usize> {
    slots: [TaskSlot; N],
    len: usize,
    started: bool,
}

impl<const N: usize> Scheduler<N> {
    pub const fn new() -> Self {
        Self {
            slots: [TaskSlot::EMPTY; N],
            len: 0,
            started: false,
        }
    }

    /// Register a task with the given period.
    ///
    /// # Errors
    ///
    /// - [`PawError::TaskCapacityExceeded`] when `N` tasks are already registered.
    /// - [`PawError::SchedulerStarted`] after the first call to
    ///   [`wait_until_next_task`](Self::wait_until_next_task).
    pub fn register_task(&mut self, period_us: u64) -> Result<TaskId, PawError> {
        if self.started {
            return Err(PawError::SchedulerStarted);
        }
        if self.len == N {
            return Err(PawError::TaskCapacityExceeded { capacity: N });
        }
        let id = self.len;
        self.slots[id].period_us = period_us.max(1);
        self.len += 1;
        debug!(task = id, period_us, "task registered");
        Ok(id)
    }

    /// Block until the next task is due and return its id.
    ///
    /// # Errors
    ///
    /// [`PawError::NoTasksRegistered`] if no task was ever registered.
    pub fn wait_until_next_task(&mut self, clock: &mut dyn Clock) -> Result<TaskId, PawError> {
        if self.len == 0 {
            return Err(PawError::NoTasksRegistered);
        }
        if !self.started {
            let start = clock.now_us();
            for slot in &mut self.slots[..self.len] {
                slot.deadline_us = start + slot.period_us;
            }
            self.started = true;
        }

        // Strict `<` keeps the lowest index on ties.
        let mut next = 0;
        for (id, slot) in self.slots[..self.len].iter().enumerate().skip(1) {
            if slot.deadline_us < self.slots[next].deadline_us {
                next = id;
            }
        }

        let now = clock.now_us();
        let slot = &mut self.slots[next];
        if slot.deadline_us > now {
            clock.sleep_us(slot.deadline_us - now);
            slot.deadline_us += slot.period_us;
        } else if slot.deadline_us == now {
            slot.deadline_us += slot.period_us;
        } else {
            debug!(task = next, late_us = now - slot.deadline_us, "task dispatched late");
            slot.deadline_us = now + slot.period_us;
        }
        Ok(next)
    }

    pub fn task_count(&self) -> usize {
        self.len
    }

    pub fn period_us(&self, id: TaskId) -> Option<u64> {
        (id < self.len).then(|| self.slots[id].period_us)
    }

    /// Absolute deadline of the task's next dispatch, once started.
    pub fn next_deadline_us(&self, id: TaskId) -> Option<u64> {
        (self.started && id < self.len).then(|| self.slots[id].deadline_us)
    }
}

impl<const N: usize> Default for Scheduler<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
