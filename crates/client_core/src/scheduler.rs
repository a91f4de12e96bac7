//! Per-intent dispatch policies over tokio tasks.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use shared::protocol::{ActionKind, Intent, Verb};
use tokio::{
    task::{AbortHandle, JoinHandle},
    time::{sleep_until, Instant},
};
use tracing::{debug, error};

use crate::{
    dispatcher::EventSink,
    orchestrator::{run_intent, RequestError},
    transport::Transport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// A new intent cancels the in-flight task of the same kind.
    Latest,
    /// Every intent runs in its own task.
    Every,
    /// At most one run per window. Intents arriving inside the window are
    /// collapsed into one trailing run when it closes.
    Throttle(Duration),
}

pub type RequestTask = JoinHandle<Result<(), RequestError>>;

pub enum Dispatch {
    Spawned(RequestTask),
    /// Held for the trailing edge of a throttle window.
    Buffered,
}

struct ThrottleSlot {
    window_ends: Instant,
    trailing: Option<Intent>,
    timer: Option<AbortHandle>,
}

#[derive(Default)]
struct SchedulerState {
    latest: HashMap<ActionKind, AbortHandle>,
    every: Vec<AbortHandle>,
    throttles: HashMap<ActionKind, ThrottleSlot>,
}

pub struct Scheduler {
    transport: Arc<dyn Transport>,
    sink: Arc<dyn EventSink>,
    per_page: u32,
    policies: HashMap<Verb, DispatchPolicy>,
    state: Mutex<SchedulerState>,
}

impl Scheduler {
    pub fn new(transport: Arc<dyn Transport>, sink: Arc<dyn EventSink>, per_page: u32) -> Self {
        let policies = HashMap::from([
            (Verb::Find, DispatchPolicy::Latest),
            (Verb::Get, DispatchPolicy::Latest),
            (Verb::Create, DispatchPolicy::Every),
            (Verb::Edit, DispatchPolicy::Every),
            (Verb::Remove, DispatchPolicy::Every),
        ]);
        Self {
            transport,
            sink,
            per_page,
            policies,
            state: Mutex::new(SchedulerState::default()),
        }
    }

    pub fn with_policy(mut self, verb: Verb, policy: DispatchPolicy) -> Self {
        self.policies.insert(verb, policy);
        self
    }

    pub fn policy(&self, verb: Verb) -> DispatchPolicy {
        self.policies
            .get(&verb)
            .copied()
            .unwrap_or(DispatchPolicy::Every)
    }

    pub fn dispatch(self: &Arc<Self>, intent: Intent) -> Dispatch {
        let policy = self.policy(intent.kind().verb);
        self.dispatch_with(intent, policy)
    }

    /// Dispatches `intent` under `policy` instead of the one configured for
    /// its verb.
    pub fn dispatch_with(self: &Arc<Self>, intent: Intent, policy: DispatchPolicy) -> Dispatch {
        let kind = intent.kind();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        match policy {
            DispatchPolicy::Latest => {
                let task = self.spawn(intent);
                if let Some(previous) = state.latest.insert(kind, task.abort_handle()) {
                    if !previous.is_finished() {
                        debug!(%kind, "cancelling superseded request");
                    }
                    previous.abort();
                }
                Dispatch::Spawned(task)
            }
            DispatchPolicy::Every => Dispatch::Spawned(self.spawn_tracked(&mut state, intent)),
            DispatchPolicy::Throttle(window) => self.throttle(&mut state, intent, window),
        }
    }

    fn throttle(
        self: &Arc<Self>,
        state: &mut SchedulerState,
        intent: Intent,
        window: Duration,
    ) -> Dispatch {
        let kind = intent.kind();
        let now = Instant::now();

        if let Some(slot) = state
            .throttles
            .get_mut(&kind)
            .filter(|slot| now < slot.window_ends)
        {
            if slot.trailing.replace(intent).is_some() {
                debug!(%kind, "replacing buffered throttled intent");
            }
            if slot.timer.is_none() {
                slot.timer = Some(self.arm_trailing(kind, window, slot.window_ends));
            }
            return Dispatch::Buffered;
        }

        state.throttles.insert(
            kind,
            ThrottleSlot {
                window_ends: now + window,
                trailing: None,
                timer: None,
            },
        );
        Dispatch::Spawned(self.spawn_tracked(state, intent))
    }

    /// Aborts every running and buffered task.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in state.latest.drain() {
            handle.abort();
        }
        for handle in state.every.drain(..) {
            handle.abort();
        }
        for (_, slot) in state.throttles.drain() {
            if let Some(timer) = slot.timer {
                timer.abort();
            }
        }
    }

    /// Spawns `intent` and keeps its abort handle for [`Scheduler::shutdown`].
    fn spawn_tracked(&self, state: &mut SchedulerState, intent: Intent) -> RequestTask {
        state.every.retain(|handle| !handle.is_finished());
        let task = self.spawn(intent);
        state.every.push(task.abort_handle());
        task
    }

    fn spawn(&self, intent: Intent) -> RequestTask {
        let transport = Arc::clone(&self.transport);
        let sink = Arc::clone(&self.sink);
        let per_page = self.per_page;
        tokio::spawn(async move {
            let kind = intent.kind();
            let result = run_intent(transport.as_ref(), sink.as_ref(), intent, per_page).await;
            if let Err(err) = &result {
                error!(%kind, error = %err, "request failed without a domain outcome");
            }
            result
        })
    }

    fn arm_trailing(
        self: &Arc<Self>,
        kind: ActionKind,
        window: Duration,
        at: Instant,
    ) -> AbortHandle {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            sleep_until(at).await;
            scheduler.fire_trailing(kind, window);
        })
        .abort_handle()
    }

    fn fire_trailing(&self, kind: ActionKind, window: Duration) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(slot) = state.throttles.get_mut(&kind) else {
            return;
        };
        slot.timer = None;
        if let Some(intent) = slot.trailing.take() {
            debug!(%kind, "running trailing throttled intent");
            slot.window_ends = Instant::now() + window;
            self.spawn_tracked(&mut state, intent);
        }
    }
}

#[cfg(test)]
#[path = "tests/scheduler_tests.rs"]
mod tests;
