use crate::error::{Error, Result};
use crate::runtime::Runtime;
use crate::runtime_state::{PendingTimer, ScheduledTimer, TimerHandle};

impl Runtime {
    /// The logical clock. Starts at zero and only moves when a timer fires or
    /// the host advances it explicitly.
    pub fn now_ms(&self) -> i64 {
        self.scheduler.now_ms
    }

    /// Registers a one-shot (`repeating = false`) or repeating timer. Equal
    /// due times fire in registration order.
    pub fn register_timer(
        &mut self,
        delay_ms: i64,
        repeating: bool,
        callback: impl FnMut(&mut Runtime) -> Result<()> + 'static,
    ) -> Result<TimerHandle> {
        if delay_ms < 0 {
            return Err(Error::InvalidDelay { delay_ms });
        }
        let id = self.scheduler.allocate_timer_id();
        let order = self.scheduler.allocate_timer_order();
        let due_at = self.scheduler.now_ms.saturating_add(delay_ms);
        let interval_ms = repeating.then_some(delay_ms);
        self.scheduler.timer_queue.push(ScheduledTimer {
            id,
            due_at,
            order,
            interval_ms,
            callback: Box::new(callback),
        });
        self.trace_timer_line(format!(
            "[timer] register id={id} due_at={due_at} repeating={repeating}"
        ));
        Ok(TimerHandle(id))
    }

    /// Cancels a pending timer. Idempotent: cancelling an already-fired
    /// one-shot, an already-cancelled timer, or a handle this runtime never
    /// issued is a no-op that returns `false`. Cancelling a timer whose
    /// callback is currently on the call stack (its own, or any outer frame
    /// of a nested turn) prevents its rescheduling but does not abort the
    /// in-progress call.
    pub fn cancel_timer(&mut self, handle: TimerHandle) -> bool {
        if self.scheduler.running_timers.contains(&handle.0) {
            self.scheduler.canceled_running.insert(handle.0);
            self.trace_timer_line(format!("[timer] cancel id={} (running)", handle.0));
            return true;
        }
        let before = self.scheduler.timer_queue.len();
        self.scheduler.timer_queue.retain(|timer| timer.id != handle.0);
        let existed = self.scheduler.timer_queue.len() != before;
        self.trace_timer_line(format!("[timer] cancel id={} existed={existed}", handle.0));
        existed
    }

    pub fn clear_all_timers(&mut self) -> usize {
        let cleared = self.scheduler.timer_queue.len();
        self.scheduler.timer_queue.clear();
        self.scheduler
            .canceled_running
            .extend(self.scheduler.running_timers.iter().copied());
        self.trace_timer_line(format!("[timer] clear_all cleared={cleared}"));
        cleared
    }

    /// Appends a deferred continuation. Never fails; continuations are not
    /// cancellable and run in strict FIFO order before the next timer fires.
    pub fn enqueue_deferred(&mut self, callback: impl FnOnce(&mut Runtime) -> Result<()> + 'static) {
        self.scheduler.microtask_queue.push_back(Box::new(callback));
        self.trace_microtask_line(format!(
            "[microtask] enqueue pending={}",
            self.scheduler.microtask_queue.len()
        ));
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        let mut timers = self
            .scheduler
            .timer_queue
            .iter()
            .map(|timer| PendingTimer {
                handle: TimerHandle(timer.id),
                due_at: timer.due_at,
                order: timer.order,
                interval_ms: timer.interval_ms,
            })
            .collect::<Vec<_>>();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }

    /// Drains the deferred-continuation queue to quiescence: continuations
    /// enqueued while draining run in the same drain. A failing continuation
    /// is reported to the host and the drain keeps going.
    pub fn drain_microtasks(&mut self) -> Result<usize> {
        let mut steps = 0usize;
        while let Some(callback) = self.scheduler.microtask_queue.pop_front() {
            steps += 1;
            if steps > self.scheduler.step_limit {
                return Err(self.step_limit_error("drain_microtasks", steps));
            }
            if let Err(error) = callback(self) {
                self.report_callback_failure("deferred continuation".to_string(), error);
            }
        }
        if steps > 0 {
            self.trace_microtask_line(format!("[microtask] drained steps={steps}"));
        }
        Ok(steps)
    }

    /// Runs the event loop until no timers remain. Each turn drains the
    /// deferred queue to quiescence, advances the clock to the earliest
    /// pending timer, and fires it; equal due times fire in registration
    /// order. Callback errors are caught per turn and never stop the loop.
    /// Only a runaway queue (more than the step limit of turns) aborts.
    pub fn run(&mut self) -> Result<()> {
        let from = self.scheduler.now_ms;
        let mut steps = 0usize;
        loop {
            self.drain_microtasks()?;
            let Some(index) = self.next_timer_index(None) else {
                break;
            };
            steps += 1;
            if steps > self.scheduler.step_limit {
                return Err(self.step_limit_error("run", steps));
            }
            let timer = self.scheduler.timer_queue.remove(index);
            if timer.due_at > self.scheduler.now_ms {
                self.scheduler.now_ms = timer.due_at;
            }
            self.execute_timer(timer);
        }
        self.trace_timer_line(format!(
            "[timer] run from={from} to={} steps={steps}",
            self.scheduler.now_ms
        ));
        Ok(())
    }

    /// Alias of [`Runtime::run`] kept for step-debugging hosts.
    pub fn flush(&mut self) -> Result<()> {
        self.run()
    }

    /// Moves the clock forward by `delta_ms` and runs everything that became
    /// due, microtasks first.
    pub fn advance_time(&mut self, delta_ms: i64) -> Result<usize> {
        if delta_ms < 0 {
            return Err(Error::InvalidConfig(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let from = self.scheduler.now_ms;
        self.scheduler.now_ms = self.scheduler.now_ms.saturating_add(delta_ms);
        let ran = self.run_due_timers()?;
        self.trace_timer_line(format!(
            "[timer] advance delta_ms={delta_ms} from={from} to={} ran_due={ran}",
            self.scheduler.now_ms
        ));
        Ok(ran)
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<usize> {
        if target_ms < self.scheduler.now_ms {
            return Err(Error::InvalidConfig(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={})",
                self.scheduler.now_ms
            )));
        }
        let from = self.scheduler.now_ms;
        self.scheduler.now_ms = target_ms;
        let ran = self.run_due_timers()?;
        self.trace_timer_line(format!(
            "[timer] advance_to from={from} to={target_ms} ran_due={ran}"
        ));
        Ok(ran)
    }

    /// Runs exactly one timer (the earliest pending one), advancing the clock
    /// to it. Microtasks drain before and after, per the turn protocol.
    /// Returns `false` when no timer is pending.
    pub fn run_next_timer(&mut self) -> Result<bool> {
        self.drain_microtasks()?;
        let Some(index) = self.next_timer_index(None) else {
            self.trace_timer_line("[timer] run_next none".into());
            return Ok(false);
        };
        let timer = self.scheduler.timer_queue.remove(index);
        if timer.due_at > self.scheduler.now_ms {
            self.scheduler.now_ms = timer.due_at;
        }
        self.execute_timer(timer);
        self.drain_microtasks()?;
        Ok(true)
    }

    /// Runs every timer already due at the current clock without advancing
    /// it, interleaving microtask drains per the turn protocol.
    pub fn run_due_timers(&mut self) -> Result<usize> {
        let mut steps = 0usize;
        loop {
            self.drain_microtasks()?;
            let Some(index) = self.next_timer_index(Some(self.scheduler.now_ms)) else {
                break;
            };
            steps += 1;
            if steps > self.scheduler.step_limit {
                return Err(self.step_limit_error("run_due_timers", steps));
            }
            let timer = self.scheduler.timer_queue.remove(index);
            self.execute_timer(timer);
        }
        Ok(steps)
    }

    fn next_timer_index(&self, due_limit: Option<i64>) -> Option<usize> {
        self.scheduler
            .timer_queue
            .iter()
            .enumerate()
            .filter(|(_, timer)| due_limit.is_none_or(|limit| timer.due_at <= limit))
            .min_by_key(|(_, timer)| (timer.due_at, timer.order))
            .map(|(index, _)| index)
    }

    fn execute_timer(&mut self, mut timer: ScheduledTimer) {
        let interval_desc = timer
            .interval_ms
            .map(|value| value.to_string())
            .unwrap_or_else(|| "none".into());
        self.trace_timer_line(format!(
            "[timer] fire id={} due_at={} interval_ms={} now_ms={}",
            timer.id, timer.due_at, interval_desc, self.scheduler.now_ms
        ));

        self.scheduler.running_timers.push(timer.id);
        let result = (timer.callback)(self);
        self.scheduler.running_timers.pop();
        let canceled = self.scheduler.canceled_running.remove(&timer.id);

        if let Err(error) = result {
            self.report_callback_failure(format!("timer id={}", timer.id), error);
        }

        if let Some(interval_ms) = timer.interval_ms {
            if !canceled {
                let due_at = self.scheduler.now_ms.saturating_add(interval_ms);
                let order = self.scheduler.allocate_timer_order();
                self.scheduler.timer_queue.push(ScheduledTimer {
                    id: timer.id,
                    due_at,
                    order,
                    interval_ms: Some(interval_ms),
                    callback: timer.callback,
                });
                self.trace_timer_line(format!(
                    "[timer] requeue id={} due_at={due_at} interval_ms={interval_ms}",
                    timer.id
                ));
            }
        }
    }

    fn step_limit_error(&self, op: &'static str, steps: usize) -> Error {
        Error::StepLimitExceeded {
            op,
            limit: self.scheduler.step_limit,
            steps,
            now_ms: self.scheduler.now_ms,
            pending: self.scheduler.timer_queue.len(),
        }
    }
}
