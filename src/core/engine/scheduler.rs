//! Deferred task queue for one engine.
//!
//! Runtime worker threads post tasks with an absolute deadline; the
//! embedder thread drains everything due on each loop turn. Push and
//! drain share one mutex, so posting is safe from any thread while
//! execution stays on the embedder thread.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Mutex;

use crate::core::engine::api::RuntimeTask;

#[derive(PartialEq, Eq)]
struct ScheduledTask {
    target_time_nanos: u64,
    // Tie-break so same-deadline tasks drain in posting order.
    seq: u64,
    task: RuntimeTask,
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.target_time_nanos, self.seq).cmp(&(other.target_time_nanos, other.seq))
    }
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
pub struct TaskScheduler {
    heap: Mutex<(BinaryHeap<Reverse<ScheduledTask>>, u64)>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `task` to run at or after `target_time_nanos`.
    pub fn post(&self, task: RuntimeTask, target_time_nanos: u64) {
        let mut guard = self.heap.lock().unwrap();
        let seq = guard.1;
        guard.1 += 1;
        guard.0.push(Reverse(ScheduledTask { target_time_nanos, seq, task }));
    }

    /// Removes and returns every task due at `now_nanos`, soonest first.
    /// Same-deadline tasks come out in the order they were posted.
    pub fn take_due(&self, now_nanos: u64) -> Vec<RuntimeTask> {
        let mut guard = self.heap.lock().unwrap();
        let mut due = Vec::new();
        while let Some(Reverse(top)) = guard.0.peek() {
            if top.target_time_nanos > now_nanos {
                break;
            }
            let Reverse(entry) = guard.0.pop().unwrap();
            due.push(entry.task);
        }
        due
    }

    pub fn len(&self) -> usize {
        self.heap.lock().unwrap().0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_tasks_drain_in_deadline_order() {
        let scheduler = TaskScheduler::new();
        scheduler.post(RuntimeTask::synthetic(3), 300);
        scheduler.post(RuntimeTask::synthetic(1), 100);
        scheduler.post(RuntimeTask::synthetic(2), 200);

        let due = scheduler.take_due(300);
        let ids: Vec<u64> = due.iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn not_yet_due_tasks_stay_queued() {
        let scheduler = TaskScheduler::new();
        scheduler.post(RuntimeTask::synthetic(1), 100);
        scheduler.post(RuntimeTask::synthetic(2), 500);

        let due = scheduler.take_due(200);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id(), 1);
        assert_eq!(scheduler.len(), 1);

        let rest = scheduler.take_due(500);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id(), 2);
    }

    #[test]
    fn same_deadline_keeps_posting_order() {
        let scheduler = TaskScheduler::new();
        for id in 0..8 {
            scheduler.post(RuntimeTask::synthetic(id), 42);
        }
        let ids: Vec<u64> = scheduler.take_due(42).iter().map(|t| t.id()).collect();
        assert_eq!(ids, (0..8).collect::<Vec<u64>>());
    }

    #[test]
    fn empty_heap_drains_nothing() {
        let scheduler = TaskScheduler::new();
        assert!(scheduler.take_due(u64::MAX).is_empty());
    }

    #[test]
    fn multiple_due_tasks_all_drain_in_one_turn() {
        let scheduler = TaskScheduler::new();
        scheduler.post(RuntimeTask::synthetic(10), 50);
        scheduler.post(RuntimeTask::synthetic(11), 60);
        scheduler.post(RuntimeTask::synthetic(12), 999);

        let due = scheduler.take_due(100);
        let ids: Vec<u64> = due.iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec![10, 11]);
        assert_eq!(scheduler.len(), 1);
    }
}
