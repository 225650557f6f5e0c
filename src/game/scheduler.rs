//! Deferred work for the session.
//!
//! The session never sleeps or spawns; it hands [`ScheduledTask`]s to a
//! [`Scheduler`] and the host pops whatever is due and feeds it back.

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use crate::player::ai::TaskId;

/// A unit of deferred session work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledTask {
    /// Start the machine's turn if it is still due.
    RobotTurn,
    /// Advance search `TaskId` by one column.
    SearchStep(TaskId),
}

pub trait Scheduler {
    /// Queues `task` to run after `delay`.
    fn schedule(&mut self, delay: Duration, task: ScheduledTask);

    /// Drops every pending unit and returns how many were dropped.
    fn cancel_all(&mut self) -> usize;

    /// Removes and returns the earliest unit due at `now`.
    fn pop_due(&mut self, now: Instant) -> Option<ScheduledTask>;

    /// Time until the earliest pending unit is due, `None` when idle.
    fn next_due_in(&self, now: Instant) -> Option<Duration>;

    fn pending(&self) -> usize;
}

/// Real-time queue ordered by due instant, FIFO among equal instants.
#[derive(Debug, Default)]
pub struct TimerQueue {
    queue: BTreeMap<(Instant, u64), ScheduledTask>,
    seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for TimerQueue {
    fn schedule(&mut self, delay: Duration, task: ScheduledTask) {
        self.seq += 1;
        self.queue.insert((Instant::now() + delay, self.seq), task);
    }

    fn cancel_all(&mut self) -> usize {
        let n = self.queue.len();
        self.queue.clear();
        n
    }

    fn pop_due(&mut self, now: Instant) -> Option<ScheduledTask> {
        let (&key, _) = self.queue.iter().next()?;
        if key.0 > now {
            return None;
        }
        self.queue.remove(&key)
    }

    fn next_due_in(&self, now: Instant) -> Option<Duration> {
        self.queue
            .keys()
            .next()
            .map(|(due, _)| due.saturating_duration_since(now))
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Ignores delays and runs units in submission order. Used by tests and
/// headless playback.
#[derive(Debug, Default)]
pub struct ImmediateQueue {
    queue: VecDeque<ScheduledTask>,
}

impl ImmediateQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for ImmediateQueue {
    fn schedule(&mut self, _delay: Duration, task: ScheduledTask) {
        self.queue.push_back(task);
    }

    fn cancel_all(&mut self) -> usize {
        let n = self.queue.len();
        self.queue.clear();
        n
    }

    fn pop_due(&mut self, _now: Instant) -> Option<ScheduledTask> {
        self.queue.pop_front()
    }

    fn next_due_in(&self, _now: Instant) -> Option<Duration> {
        (!self.queue.is_empty()).then_some(Duration::ZERO)
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_queue_respects_due_time() {
        let mut q = TimerQueue::new();
        q.schedule(Duration::from_secs(60), ScheduledTask::RobotTurn);
        q.schedule(Duration::ZERO, ScheduledTask::SearchStep(1));
        let now = Instant::now();
        assert_eq!(q.pop_due(now), Some(ScheduledTask::SearchStep(1)));
        assert_eq!(q.pop_due(now), None);
        assert!(q.next_due_in(now).unwrap() > Duration::from_secs(50));
        assert_eq!(q.pop_due(now + Duration::from_secs(61)), Some(ScheduledTask::RobotTurn));
        assert_eq!(q.next_due_in(now), None);
    }

    #[test]
    fn timer_queue_is_fifo_for_equal_delays() {
        let mut q = TimerQueue::new();
        q.schedule(Duration::ZERO, ScheduledTask::SearchStep(1));
        q.schedule(Duration::ZERO, ScheduledTask::SearchStep(2));
        let later = Instant::now() + Duration::from_millis(5);
        assert_eq!(q.pop_due(later), Some(ScheduledTask::SearchStep(1)));
        assert_eq!(q.pop_due(later), Some(ScheduledTask::SearchStep(2)));
    }

    #[test]
    fn cancel_all_drains() {
        let mut q = ImmediateQueue::new();
        q.schedule(Duration::from_secs(5), ScheduledTask::RobotTurn);
        q.schedule(Duration::ZERO, ScheduledTask::SearchStep(3));
        assert_eq!(q.pending(), 2);
        assert_eq!(q.cancel_all(), 2);
        assert_eq!(q.pop_due(Instant::now()), None);
        assert_eq!(q.next_due_in(Instant::now()), None);
    }
}
