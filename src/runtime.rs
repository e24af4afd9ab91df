use crate::error::{Error, Result};
use crate::events::ListenerStore;
use crate::layout::LayoutState;
use crate::runtime_state::{SchedulerState, TraceState};
use crate::scene::SceneGraph;

/// The host runtime context: logical clock, timer queue, deferred-continuation
/// queue, scene graph, listeners, and layout cache in one explicit object.
/// Everything is single-threaded and cooperative; exactly one callback runs
/// at a time and runs to completion.
pub struct Runtime {
    pub(crate) scene: SceneGraph,
    pub(crate) listeners: ListenerStore,
    pub(crate) scheduler: SchedulerState,
    pub(crate) layout: LayoutState,
    pub(crate) trace: TraceState,
    pub(crate) callback_failures: Vec<Error>,
    pub(crate) output: Vec<String>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("scene", &self.scene)
            .field("listeners", &self.listeners)
            .field("scheduler", &self.scheduler)
            .field("layout", &self.layout)
            .field("callback_failures", &self.callback_failures.len())
            .field("output_lines", &self.output.len())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            scene: SceneGraph::new(),
            listeners: ListenerStore::default(),
            scheduler: SchedulerState::default(),
            layout: LayoutState::default(),
            trace: TraceState::default(),
            callback_failures: Vec::new(),
            output: Vec::new(),
        }
    }

    pub fn with_viewport(width: f64, height: f64) -> Result<Self> {
        let mut runtime = Self::new();
        runtime.set_viewport(width, height)?;
        Ok(runtime)
    }

    /// Output primitive scripts use to assert observable ordering. Lines are
    /// kept in emission order until [`Runtime::take_output`] drains them.
    pub fn print(&mut self, line: impl Into<String>) {
        let line = line.into();
        log::debug!(target: "scene_host::output", "{line}");
        self.output.push(line);
    }

    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    /// Callback errors caught at turn boundaries. The loop never stops for
    /// them; the host reads them here.
    pub fn take_callback_failures(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.callback_failures)
    }

    pub fn set_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::InvalidConfig(
                "set_step_limit requires at least 1 step".into(),
            ));
        }
        self.scheduler.step_limit = max_steps;
        Ok(())
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace.enabled = enabled;
    }

    pub fn set_trace_timers(&mut self, enabled: bool) {
        self.trace.timers = enabled;
    }

    pub fn set_trace_microtasks(&mut self, enabled: bool) {
        self.trace.microtasks = enabled;
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace.events = enabled;
    }

    pub fn set_trace_layout(&mut self, enabled: bool) {
        self.trace.layout = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::InvalidConfig(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace.log_limit = max_entries;
        while self.trace.logs.len() > self.trace.log_limit {
            self.trace.logs.pop_front();
        }
        Ok(())
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.trace.logs).into()
    }

    pub(crate) fn trace_timer_line(&mut self, line: String) {
        if self.trace.enabled && self.trace.timers {
            self.push_trace_line(line);
        }
    }

    pub(crate) fn trace_microtask_line(&mut self, line: String) {
        if self.trace.enabled && self.trace.microtasks {
            self.push_trace_line(line);
        }
    }

    pub(crate) fn trace_event_line(&mut self, line: String) {
        if self.trace.enabled && self.trace.events {
            self.push_trace_line(line);
        }
    }

    pub(crate) fn trace_layout_line(&mut self, line: String) {
        if self.trace.enabled && self.trace.layout {
            self.push_trace_line(line);
        }
    }

    fn push_trace_line(&mut self, line: String) {
        log::trace!(target: "scene_host::trace", "{line}");
        self.trace.logs.push_back(line);
        while self.trace.logs.len() > self.trace.log_limit {
            self.trace.logs.pop_front();
        }
    }

    /// Turn-boundary error sink: the failure is wrapped with its context,
    /// logged, and recorded for the host. The scheduler loop continues.
    pub(crate) fn report_callback_failure(&mut self, context: String, error: Error) {
        let failure = Error::CallbackFailure {
            context,
            message: error.to_string(),
        };
        log::error!(target: "scene_host", "{failure}");
        self.trace_timer_line(format!("[failure] {failure}"));
        self.callback_failures.push(failure);
    }
}
