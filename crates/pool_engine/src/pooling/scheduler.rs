//! Cooperative delay scheduling
//!
//! Suspensions are data, not threads: a task is queued with a due time and the
//! host loop later drains everything that has come due. Both the maintenance
//! loop and deferred despawns go through the same [`Scheduler`].

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

/// Identifier of a scheduled task, in scheduling order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

/// Work the registry schedules for later
#[derive(Debug, Clone, PartialEq)]
pub enum PoolTask<I> {
    /// Return an instance to its pool
    Despawn(I),
    /// Run a cull pass over every pool, then reschedule
    Maintenance,
}

struct ScheduledEntry<T> {
    due: Duration,
    id: TaskId,
    task: T,
}

impl<T> PartialEq for ScheduledEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.id == other.id
    }
}

impl<T> Eq for ScheduledEntry<T> {}

impl<T> PartialOrd for ScheduledEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for ScheduledEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Equal due times run in scheduling order
        self.due.cmp(&other.due).then(self.id.cmp(&other.id))
    }
}

/// Due-time ordered task queue
pub struct Scheduler<T> {
    queue: BinaryHeap<Reverse<ScheduledEntry<T>>>,
    next_id: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            next_id: 0,
        }
    }

    /// Queue `task` to run once `delay` has passed since `now`
    pub fn after(&mut self, now: Duration, delay: Duration, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.queue.push(Reverse(ScheduledEntry {
            due: now.saturating_add(delay),
            id,
            task,
        }));
        id
    }

    /// Remove and return every task due at or before `now`, earliest first
    pub fn take_due(&mut self, now: Duration) -> Vec<T> {
        let mut due = Vec::new();
        while self.queue.peek().is_some_and(|Reverse(entry)| entry.due <= now) {
            if let Some(Reverse(entry)) = self.queue.pop() {
                due.push(entry.task);
            }
        }
        due
    }

    /// Due time of the earliest pending task
    pub fn next_due(&self) -> Option<Duration> {
        self.queue.peek().map(|Reverse(entry)| entry.due)
    }

    /// Number of pending tasks
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop every pending task
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(value: u64) -> Duration {
        Duration::from_secs(value)
    }

    #[test]
    fn test_tasks_run_in_due_order() {
        let mut scheduler = Scheduler::new();
        scheduler.after(secs(0), secs(3), "late");
        scheduler.after(secs(0), secs(1), "early");
        scheduler.after(secs(1), secs(1), "middle");

        assert_eq!(scheduler.next_due(), Some(secs(1)));
        assert!(scheduler.take_due(Duration::from_millis(999)).is_empty());
        assert_eq!(scheduler.take_due(secs(2)), vec!["early", "middle"]);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.take_due(secs(10)), vec!["late"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_equal_due_times_keep_scheduling_order() {
        let mut scheduler = Scheduler::new();
        for value in 0..5 {
            scheduler.after(secs(0), secs(2), value);
        }
        assert_eq!(scheduler.take_due(secs(2)), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_zero_delay_is_due_immediately() {
        let mut scheduler = Scheduler::new();
        let first = scheduler.after(secs(5), Duration::ZERO, 'a');
        let second = scheduler.after(secs(5), Duration::ZERO, 'b');
        assert!(first < second);
        assert_eq!(scheduler.take_due(secs(5)), vec!['a', 'b']);
    }

    #[test]
    fn test_clear_drops_pending_tasks() {
        let mut scheduler = Scheduler::new();
        scheduler.after(secs(0), secs(1), PoolTask::<u32>::Maintenance);
        scheduler.after(secs(0), secs(1), PoolTask::Despawn(7));
        scheduler.clear();
        assert!(scheduler.take_due(secs(100)).is_empty());
        assert_eq!(scheduler.next_due(), None);
    }
}
