use std::collections::{HashSet, VecDeque};
use std::fmt;

use crate::error::Result;
use crate::runtime::Runtime;

/// Callback run when a timer fires. Receives the runtime so it can register
/// more timers, enqueue continuations, or mutate the scene graph; every
/// effect is visible immediately.
pub type TimerCallback = Box<dyn FnMut(&mut Runtime) -> Result<()>>;

/// Zero-argument continuation representing an already-settled asynchronous
/// completion. Consumed exactly once, in FIFO order.
pub type DeferredCallback = Box<dyn FnOnce(&mut Runtime) -> Result<()>>;

/// Opaque timer handle. Unique for the runtime's lifetime; cancelling a
/// handle that was never issued (or already fired) is a silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub(crate) i64);

pub(crate) struct ScheduledTimer {
    pub(crate) id: i64,
    pub(crate) due_at: i64,
    pub(crate) order: i64,
    pub(crate) interval_ms: Option<i64>,
    pub(crate) callback: TimerCallback,
}

impl fmt::Debug for ScheduledTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTimer")
            .field("id", &self.id)
            .field("due_at", &self.due_at)
            .field("order", &self.order)
            .field("interval_ms", &self.interval_ms)
            .finish_non_exhaustive()
    }
}

/// Host-visible snapshot of a pending timer, sorted by `(due_at, order)` in
/// [`Runtime::pending_timers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub handle: TimerHandle,
    pub due_at: i64,
    pub order: i64,
    pub interval_ms: Option<i64>,
}

pub(crate) struct SchedulerState {
    pub(crate) timer_queue: Vec<ScheduledTimer>,
    pub(crate) microtask_queue: VecDeque<DeferredCallback>,
    pub(crate) now_ms: i64,
    pub(crate) step_limit: usize,
    pub(crate) next_timer_id: i64,
    pub(crate) next_timer_order: i64,
    /// Stack of timer ids whose callbacks are currently on the call stack.
    /// Callbacks may re-enter the scheduler (`run_next_timer` and friends), so
    /// a single slot is not enough: cancellation must be able to reach every
    /// suspended frame, not just the innermost one.
    pub(crate) running_timers: Vec<i64>,
    pub(crate) canceled_running: HashSet<i64>,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self {
            timer_queue: Vec::new(),
            microtask_queue: VecDeque::new(),
            now_ms: 0,
            step_limit: 10_000,
            next_timer_id: 1,
            next_timer_order: 0,
            running_timers: Vec::new(),
            canceled_running: HashSet::new(),
        }
    }
}

impl SchedulerState {
    pub(crate) fn allocate_timer_id(&mut self) -> i64 {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        id
    }

    pub(crate) fn allocate_timer_order(&mut self) -> i64 {
        let order = self.next_timer_order;
        self.next_timer_order += 1;
        order
    }
}

impl fmt::Debug for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerState")
            .field("timer_queue", &self.timer_queue)
            .field("microtask_queue_len", &self.microtask_queue.len())
            .field("now_ms", &self.now_ms)
            .field("step_limit", &self.step_limit)
            .field("next_timer_id", &self.next_timer_id)
            .field("next_timer_order", &self.next_timer_order)
            .field("running_timers", &self.running_timers)
            .field("canceled_running", &self.canceled_running)
            .finish()
    }
}

#[derive(Debug)]
pub(crate) struct TraceState {
    pub(crate) enabled: bool,
    pub(crate) timers: bool,
    pub(crate) microtasks: bool,
    pub(crate) events: bool,
    pub(crate) layout: bool,
    pub(crate) logs: VecDeque<String>,
    pub(crate) log_limit: usize,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: false,
            timers: true,
            microtasks: true,
            events: true,
            layout: true,
            logs: VecDeque::new(),
            log_limit: 10_000,
        }
    }
}
