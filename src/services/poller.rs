//! Poller service: drives `PollMachine` against the task API.
//!
//! DESIGN
//! ======
//! A background task owns the machine and performs exactly one effect at a
//! time. While an effect (fetch or sleep) is pending it also watches the
//! tracked id; a change drops the pending future, so requests never overlap
//! and a superseded fetch can never be applied. Consumers read the latest
//! `TaskQuery` from a `watch` channel.
//!
//! The published query always belongs to the tracked id. `track` swaps the
//! id and resets the query while holding the id channel's write lock, and the
//! driver only publishes while holding its read lock and only when the ids
//! match. A reader can never see the previous task's result after `track`
//! returns.

#[cfg(test)]
#[path = "poller_test.rs"]
mod tests;

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::net::api::TaskApi;
use crate::state::task::{PollEffect, PollEvent, PollMachine, TaskQuery};

/// Handle to a running poller. Dropping it stops the background task.
pub struct TaskPoller {
    task_id_tx: watch::Sender<Option<String>>,
    query_tx: Weak<watch::Sender<TaskQuery>>,
    query_rx: watch::Receiver<TaskQuery>,
    handle: JoinHandle<()>,
}

impl TaskPoller {
    /// Spawn the poller on the current tokio runtime, initially idle.
    #[must_use]
    pub fn spawn(api: Arc<dyn TaskApi>, interval: Duration) -> Self {
        let (task_id_tx, task_id_rx) = watch::channel(None);
        let (query_tx, query_rx) = watch::channel(TaskQuery::default());
        let query_tx = Arc::new(query_tx);
        let weak_query_tx = Arc::downgrade(&query_tx);
        let handle = tokio::spawn(run(api, PollMachine::new(interval), task_id_rx, query_tx));
        Self { task_id_tx, query_tx: weak_query_tx, query_rx, handle }
    }

    /// Track `task_id`, or stop tracking with `None`.
    ///
    /// Re-tracking the current id is a no-op; any other value cancels the
    /// pending cycle and starts over. The published query is reset to the new
    /// id before this returns.
    pub fn track(&self, task_id: Option<String>) {
        self.task_id_tx.send_if_modified(|current| {
            if *current == task_id {
                return false;
            }
            if let Some(query_tx) = self.query_tx.upgrade() {
                query_tx.send_replace(TaskQuery { task_id: task_id.clone(), ..TaskQuery::default() });
            }
            *current = task_id;
            true
        });
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TaskQuery> {
        self.query_rx.clone()
    }

    #[must_use]
    pub fn query(&self) -> TaskQuery {
        self.query_rx.borrow().clone()
    }

    /// Resolve once the tracked task reaches a terminal status.
    ///
    /// Returns `None` if the poller stops first.
    pub async fn wait_for_terminal(&self) -> Option<TaskQuery> {
        let mut rx = self.query_rx.clone();
        let query = rx.wait_for(TaskQuery::is_terminal).await.ok()?.clone();
        Some(query)
    }

    pub fn shutdown(self) {
        self.handle.abort();
    }
}

impl Drop for TaskPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run(
    api: Arc<dyn TaskApi>,
    mut machine: PollMachine,
    mut task_id_rx: watch::Receiver<Option<String>>,
    query_tx: Arc<watch::Sender<TaskQuery>>,
) {
    let initial = task_id_rx.borrow_and_update().clone();
    let mut effect = machine.handle(PollEvent::Track(initial));
    publish(&query_tx, &task_id_rx, machine.query());

    loop {
        let event = match &effect {
            PollEffect::Fetch { task_id, generation } => {
                let generation = *generation;
                tokio::select! {
                    changed = task_id_rx.changed() => match changed {
                        Ok(()) => PollEvent::Track(task_id_rx.borrow_and_update().clone()),
                        Err(_) => break,
                    },
                    result = api.task_status(task_id) => PollEvent::Fetched { generation, result },
                }
            }
            PollEffect::Schedule { generation, delay } => {
                let generation = *generation;
                tokio::select! {
                    changed = task_id_rx.changed() => match changed {
                        Ok(()) => PollEvent::Track(task_id_rx.borrow_and_update().clone()),
                        Err(_) => break,
                    },
                    () = tokio::time::sleep(*delay) => PollEvent::Tick { generation },
                }
            }
            PollEffect::Wait | PollEffect::Ignore => {
                if task_id_rx.changed().await.is_err() {
                    break;
                }
                PollEvent::Track(task_id_rx.borrow_and_update().clone())
            }
        };

        effect = match machine.handle(event) {
            PollEffect::Ignore => machine.resume(),
            next => next,
        };
        publish(&query_tx, &task_id_rx, machine.query());
    }
    debug!("task poller stopped");
}

/// Publish `query` unless the tracked id has already moved on.
fn publish(query_tx: &watch::Sender<TaskQuery>, task_id_rx: &watch::Receiver<Option<String>>, query: &TaskQuery) {
    let tracked = task_id_rx.borrow();
    if *tracked == query.task_id {
        query_tx.send_replace(query.clone());
    } else {
        debug!(
            tracked = ?tracked.as_deref(),
            stale = ?query.task_id.as_deref(),
            "skipping publish for superseded task"
        );
    }
}
