//! Task-status polling as an explicit state machine.
//!
//! DESIGN
//! ======
//! `PollMachine` owns no timers and performs no I/O. Each event returns the
//! effect the driver should perform next (`Fetch`, `Schedule`, `Wait`), which
//! keeps cancellation and termination testable without a runtime.
//!
//! Every `Track` bumps a generation counter. Fetch results and ticks carry
//! the generation that produced them, and anything older than the current
//! generation is ignored, so a slow response for an abandoned task id can
//! never overwrite the state of the task being tracked now.

#[cfg(test)]
#[path = "task_test.rs"]
mod tests;

use std::time::Duration;

use tracing::{debug, warn};

use crate::net::api::ApiError;
use crate::net::types::{Task, TaskStatus};

/// Default cadence between status fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollState {
    /// No task tracked; nothing is fetched.
    Idle,
    /// Task is non-terminal (or not fetched yet).
    Polling { task_id: String, generation: u64 },
    /// Task reached `Completed` or `Failed`; polling has stopped for good.
    Terminal { task_id: String, status: TaskStatus },
}

#[derive(Debug)]
pub enum PollEvent {
    /// Start tracking a task id, or stop tracking with `None`.
    Track(Option<String>),
    /// The scheduled delay for `generation` elapsed.
    Tick { generation: u64 },
    /// A fetch issued for `generation` finished.
    Fetched { generation: u64, result: Result<Task, ApiError> },
}

/// What the driver should do next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollEffect {
    /// Issue one status fetch now.
    Fetch { task_id: String, generation: u64 },
    /// Sleep `delay`, then deliver `Tick { generation }`.
    Schedule { generation: u64, delay: Duration },
    /// Nothing to do until a different task is tracked.
    Wait,
    /// Event was stale; keep doing whatever was pending.
    Ignore,
}

/// Query-style view of the tracked task, published to consumers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskQuery {
    pub task_id: Option<String>,
    /// Most recent successfully fetched task.
    pub data: Option<Task>,
    /// Message from the most recent failed fetch, cleared on success.
    pub error: Option<String>,
    /// A fetch is in flight and no data has arrived yet.
    pub is_loading: bool,
    /// A fetch is in flight.
    pub is_fetching: bool,
    /// Fetches issued for the current task id.
    pub fetch_count: u32,
}

impl TaskQuery {
    #[must_use]
    pub fn status(&self) -> Option<TaskStatus> {
        self.data.as_ref().map(|task| task.status)
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status().is_some_and(TaskStatus::is_terminal)
    }
}

pub struct PollMachine {
    state: PollState,
    generation: u64,
    interval: Duration,
    query: TaskQuery,
}

impl PollMachine {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { state: PollState::Idle, generation: 0, interval, query: TaskQuery::default() }
    }

    #[must_use]
    pub fn state(&self) -> &PollState {
        &self.state
    }

    #[must_use]
    pub fn query(&self) -> &TaskQuery {
        &self.query
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn handle(&mut self, event: PollEvent) -> PollEffect {
        match event {
            PollEvent::Track(task_id) => self.track(task_id),
            PollEvent::Tick { generation } => self.tick(generation),
            PollEvent::Fetched { generation, result } => self.fetched(generation, result),
        }
    }

    /// Effect implied by the current state alone.
    ///
    /// Used by a driver that lost its pending effect; never issues a fetch
    /// directly, so it cannot overlap an in-flight request.
    #[must_use]
    pub fn resume(&self) -> PollEffect {
        match &self.state {
            PollState::Polling { generation, .. } => {
                PollEffect::Schedule { generation: *generation, delay: self.interval }
            }
            PollState::Idle | PollState::Terminal { .. } => PollEffect::Wait,
        }
    }

    fn track(&mut self, task_id: Option<String>) -> PollEffect {
        self.generation += 1;
        self.query = TaskQuery { task_id: task_id.clone(), ..TaskQuery::default() };
        match task_id {
            Some(task_id) => {
                debug!(%task_id, generation = self.generation, "tracking task");
                self.state = PollState::Polling { task_id: task_id.clone(), generation: self.generation };
                self.begin_fetch(task_id)
            }
            None => {
                self.state = PollState::Idle;
                PollEffect::Wait
            }
        }
    }

    fn tick(&mut self, generation: u64) -> PollEffect {
        match &self.state {
            PollState::Polling { task_id, generation: current } if *current == generation => {
                let task_id = task_id.clone();
                self.begin_fetch(task_id)
            }
            _ => PollEffect::Ignore,
        }
    }

    fn begin_fetch(&mut self, task_id: String) -> PollEffect {
        self.query.is_fetching = true;
        self.query.is_loading = self.query.data.is_none();
        self.query.fetch_count += 1;
        PollEffect::Fetch { task_id, generation: self.generation }
    }

    fn fetched(&mut self, generation: u64, result: Result<Task, ApiError>) -> PollEffect {
        let task_id = match &self.state {
            PollState::Polling { task_id, generation: current } if *current == generation => task_id.clone(),
            _ => {
                debug!(generation, current = self.generation, "discarding stale task status");
                return PollEffect::Ignore;
            }
        };
        self.query.is_fetching = false;
        self.query.is_loading = false;

        match result {
            Ok(task) => {
                if task.id != task_id {
                    warn!(%task_id, returned = %task.id, "task status response for a different id");
                }
                let status = task.status;
                self.query.error = None;
                self.query.data = Some(task);
                if status.is_terminal() {
                    debug!(%task_id, ?status, "task reached terminal status");
                    self.state = PollState::Terminal { task_id, status };
                    PollEffect::Wait
                } else {
                    PollEffect::Schedule { generation, delay: self.interval }
                }
            }
            Err(e) => {
                warn!(%task_id, error = %e, "task status fetch failed");
                self.query.error = Some(e.to_string());
                PollEffect::Schedule { generation, delay: self.interval }
            }
        }
    }
}
