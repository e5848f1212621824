//! Scheduler
//!
//! Single-threaded virtual-time event loop with macrotask timers and
//! next-frame callbacks. Time only moves when the owner pops due tasks,
//! which keeps every delay deterministic under test.
//!
//! There is no cancellation: a task whose node went away re-checks the
//! node itself and returns early.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Deferred callback run against the scheduler's owner
pub type Task<C> = Box<dyn FnOnce(&mut C)>;

/// Timer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

struct Timer<C> {
    id: TimerId,
    due: Duration,
    task: Task<C>,
}

/// Virtual-time task queue
pub struct Scheduler<C> {
    now: Duration,
    frame: Duration,
    timers: Vec<Timer<C>>,
    /// Callbacks waiting for the next frame boundary
    frames: Vec<Task<C>>,
    /// Frame callbacks of the frame currently being run
    frame_batch: VecDeque<Task<C>>,
    next_timer_id: u64,
}

impl<C> Scheduler<C> {
    pub fn new(frame: Duration) -> Self {
        Self {
            now: Duration::ZERO,
            frame: frame.max(Duration::from_millis(1)),
            timers: Vec::new(),
            frames: Vec::new(),
            frame_batch: VecDeque::new(),
            next_timer_id: 1,
        }
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Run `task` after `delay`. A zero delay still waits for the next pop.
    pub fn set_timeout(&mut self, delay: Duration, task: Task<C>) -> TimerId {
        let id = TimerId(self.next_timer_id);
        self.next_timer_id += 1;
        self.timers.push(Timer {
            id,
            due: self.now + delay,
            task,
        });
        id
    }

    /// Run `task` at the next frame boundary
    pub fn request_frame(&mut self, task: Task<C>) {
        self.frames.push(task);
    }

    /// First frame boundary strictly after now
    pub fn next_frame_at(&self) -> Duration {
        let frame = self.frame.as_nanos();
        let ticks = self.now.as_nanos() / frame + 1;
        Duration::from_nanos((ticks * frame) as u64)
    }

    /// When the next task becomes runnable
    pub fn next_due(&self) -> Option<Duration> {
        if !self.frame_batch.is_empty() {
            return Some(self.now);
        }
        let timer = self.timers.iter().map(|t| t.due).min();
        let frame = (!self.frames.is_empty()).then(|| self.next_frame_at());
        match (timer, frame) {
            (Some(t), Some(f)) => Some(t.min(f)),
            (t, f) => t.or(f),
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.timers.is_empty() || !self.frames.is_empty() || !self.frame_batch.is_empty()
    }

    /// Number of queued timers and frame callbacks
    pub fn pending(&self) -> usize {
        self.timers.len() + self.frames.len() + self.frame_batch.len()
    }

    /// Take the earliest task due no later than `until`, moving the clock
    /// to its due time. Timers due at a frame boundary run before it.
    pub fn pop_due(&mut self, until: Duration) -> Option<Task<C>> {
        if let Some(task) = self.frame_batch.pop_front() {
            return Some(task);
        }

        let timer = self.timers.iter()
            .enumerate()
            .min_by_key(|(_, t)| (t.due, t.id))
            .map(|(i, t)| (i, t.due));
        let frame_at = (!self.frames.is_empty()).then(|| self.next_frame_at());

        match (timer, frame_at) {
            (Some((index, due)), frame_at) if due <= until && frame_at.is_none_or(|f| due <= f) => {
                let timer = self.timers.swap_remove(index);
                self.now = self.now.max(timer.due);
                Some(timer.task)
            }
            (_, Some(frame_at)) if frame_at <= until => {
                self.now = frame_at;
                self.frame_batch.extend(self.frames.drain(..));
                self.frame_batch.pop_front()
            }
            _ => None,
        }
    }

    /// Move the clock forward without running anything
    pub fn advance_to(&mut self, time: Duration) {
        self.now = self.now.max(time);
    }
}

impl<C> fmt::Debug for Scheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now)
            .field("frame", &self.frame)
            .field("timers", &self.timers.len())
            .field("frames", &(self.frames.len() + self.frame_batch.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<&'static str>;

    fn push(label: &'static str) -> Task<Log> {
        Box::new(move |log: &mut Log| log.push(label))
    }

    fn drain(scheduler: &mut Scheduler<Log>, log: &mut Log, until: Duration) {
        while let Some(task) = scheduler.pop_due(until) {
            task(log);
        }
        scheduler.advance_to(until);
    }

    #[test]
    fn test_timers_in_due_order() {
        let mut scheduler = Scheduler::new(Duration::from_millis(16));
        let mut log = Log::new();
        scheduler.set_timeout(Duration::from_millis(100), push("late"));
        scheduler.set_timeout(Duration::ZERO, push("zero"));
        scheduler.set_timeout(Duration::ZERO, push("zero-2"));

        // Zero delay never runs synchronously
        assert!(log.is_empty());
        drain(&mut scheduler, &mut log, Duration::from_millis(50));
        assert_eq!(log, ["zero", "zero-2"]);

        drain(&mut scheduler, &mut log, Duration::from_millis(100));
        assert_eq!(log, ["zero", "zero-2", "late"]);
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn test_frames_wait_for_boundary() {
        let mut scheduler = Scheduler::new(Duration::from_millis(16));
        let mut log = Log::new();
        scheduler.advance_to(Duration::from_millis(5));
        scheduler.request_frame(push("frame"));
        scheduler.set_timeout(Duration::from_millis(20), push("timer"));

        assert_eq!(scheduler.next_due(), Some(Duration::from_millis(16)));
        drain(&mut scheduler, &mut log, Duration::from_millis(15));
        assert!(log.is_empty());

        drain(&mut scheduler, &mut log, Duration::from_millis(30));
        assert_eq!(log, ["frame", "timer"]);
        assert_eq!(scheduler.now(), Duration::from_millis(30));
    }

    #[test]
    fn test_frame_requested_inside_frame_runs_next_frame() {
        let mut scheduler = Scheduler::new(Duration::from_millis(16));
        let mut log = Log::new();
        scheduler.request_frame(push("first"));

        let task = scheduler.pop_due(Duration::from_millis(16)).unwrap();
        task(&mut log);
        scheduler.request_frame(push("second"));
        assert_eq!(scheduler.now(), Duration::from_millis(16));
        assert!(scheduler.pop_due(Duration::from_millis(16)).is_none());
        assert_eq!(scheduler.next_due(), Some(Duration::from_millis(32)));

        drain(&mut scheduler, &mut log, Duration::from_millis(32));
        assert_eq!(log, ["first", "second"]);
    }
}
