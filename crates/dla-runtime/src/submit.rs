//! Exec phase: check a submit, then drive its tasks through the engines.
//!
//! A submit is checked as a whole before anything is dispatched: every task
//! must be fully resolved, every pre-action event must be able to fire, and
//! an engine must exist for every task. Only then are tasks dispatched, each
//! as soon as its pre-action events are satisfied. Engine failures do not
//! abort the submit: the failed task is `Failed`, tasks waiting on its
//! events are `Blocked`, independent tasks keep running.

use crate::binding::{BindingState, EventStatus, TaskState};
use crate::engine::{EngineInstance, EnginePool, ResolvedAddress, TaskJob};
use crate::error::{Result, RuntimeError};
use dla_format::TaskListEntry;
use dla_loadable::Loadable;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cooperative cancellation flag, shareable across threads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Final state of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    /// Task id
    pub task_id: u16,
    /// State after the submit
    pub state: TaskState,
    /// Instance that ran it
    pub instance: Option<EngineInstance>,
    /// Engine error text for failed tasks
    pub error: Option<String>,
}

/// Outcome of one submit, tasks in submit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReport {
    /// Submit id
    pub submit_id: u16,
    /// Per-task outcomes
    pub outcomes: Vec<TaskOutcome>,
}

impl SubmitReport {
    /// Outcome of `task_id`.
    pub fn outcome(&self, task_id: u16) -> Option<&TaskOutcome> {
        self.outcomes.iter().find(|o| o.task_id == task_id)
    }

    /// Number of completed tasks.
    pub fn completed(&self) -> usize {
        self.count(|s| s == TaskState::Completed)
    }

    /// Number of failed tasks.
    pub fn failed(&self) -> usize {
        self.count(|s| s == TaskState::Failed)
    }

    /// Number of blocked tasks.
    pub fn blocked(&self) -> usize {
        self.count(|s| matches!(s, TaskState::Blocked { .. }))
    }

    /// True when every task completed.
    pub fn is_success(&self) -> bool {
        self.completed() == self.outcomes.len()
    }

    fn count(&self, pred: impl Fn(TaskState) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o.state)).count()
    }
}

/// Outcome of every submit in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Submit reports
    pub submits: Vec<SubmitReport>,
}

impl ExecutionReport {
    /// Report for `submit_id`.
    pub fn submit(&self, submit_id: u16) -> Option<&SubmitReport> {
        self.submits.iter().find(|s| s.submit_id == submit_id)
    }

    /// True when every submit succeeded.
    pub fn is_success(&self) -> bool {
        self.submits.iter().all(SubmitReport::is_success)
    }
}

/// Drives submits of one loadable through an engine pool.
#[derive(Debug)]
pub struct Submitter<'a, L: Loadable + ?Sized> {
    loadable: &'a L,
    pool: &'a mut EnginePool,
    cancel: CancelToken,
}

impl<'a, L: Loadable + ?Sized> Submitter<'a, L> {
    /// Submitter over `pool`.
    pub fn new(loadable: &'a L, pool: &'a mut EnginePool) -> Self {
        Self {
            loadable,
            pool,
            cancel: CancelToken::new(),
        }
    }

    /// Use `token` for cancellation.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Every submit in table order.
    ///
    /// # Errors
    ///
    /// Stops at the first submit that fails its checks or is cancelled.
    pub fn submit_all(&mut self, state: &mut BindingState) -> Result<ExecutionReport> {
        let ids: Vec<u16> = self.loadable.submit_entries().iter().map(|s| s.id).collect();
        let mut report = ExecutionReport::default();
        for id in ids {
            report.submits.push(self.submit(state, id)?);
        }
        Ok(report)
    }

    /// Check and run submit `submit_id`.
    ///
    /// # Errors
    ///
    /// `UnboundInput`/`UnboundOutput`/`UnresolvedMemory` for tasks with
    /// unbound references, `UnresolvedEvent` for waits that cannot fire,
    /// `NoEngine` when no instance matches; in all of these no task was
    /// dispatched. `Cancelled` when the token fired; tasks that never
    /// started are `Cancelled` in `state`.
    pub fn submit(&mut self, state: &mut BindingState, submit_id: u16) -> Result<SubmitReport> {
        let loadable = self.loadable;
        let entry = loadable.submit_entry(submit_id)?;
        if entry.tasks.is_empty() {
            debug!("Submit {submit_id} is empty");
            return Ok(SubmitReport {
                submit_id,
                outcomes: Vec::new(),
            });
        }

        let tasks = entry
            .tasks
            .iter()
            .map(|&id| loadable.task_entry(id))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.check(state, &tasks)?;
        info!("Submit {submit_id}: {} task(s) eligible", tasks.len());

        let run = self.run(state, submit_id, &tasks);
        let outcomes = tasks
            .iter()
            .map(|t| TaskOutcome {
                task_id: t.id,
                state: state.task_state(t.id).unwrap_or(TaskState::Unresolved),
                instance: run.instances.get(&t.id).copied(),
                error: run.errors.get(&t.id).cloned(),
            })
            .collect::<Vec<_>>();
        let report = SubmitReport {
            submit_id,
            outcomes,
        };

        if report.outcomes.iter().any(|o| o.state == TaskState::Cancelled) {
            warn!("Submit {submit_id} cancelled");
            return Err(RuntimeError::Cancelled { submit_id });
        }
        info!(
            "Submit {submit_id}: {} completed, {} failed, {} blocked",
            report.completed(),
            report.failed(),
            report.blocked()
        );
        Ok(report)
    }

    fn check(&self, state: &BindingState, tasks: &[&TaskListEntry]) -> Result<()> {
        let mut members = BTreeSet::new();
        for task in tasks {
            if !members.insert(task.id) {
                return Err(RuntimeError::invalid_state(format!(
                    "task {} listed twice in one submit",
                    task.id
                )));
            }
        }

        // (a) memory
        for task in tasks {
            if let Some(&r) = state.unresolved(task.id).first() {
                return Err(state.unresolved_error(task.id, r));
            }
            match state.task_state(task.id) {
                Some(TaskState::Resolved) => {}
                Some(other) => {
                    return Err(RuntimeError::invalid_state(format!(
                        "task {} is {other:?}, expected Resolved",
                        task.id
                    )));
                }
                None => {
                    return Err(RuntimeError::invalid_state(format!(
                        "task {} was never resolved",
                        task.id
                    )));
                }
            }
        }

        // (b) events
        let mut waits_on: BTreeMap<u16, Vec<(u16, u16)>> = BTreeMap::new();
        for task in tasks {
            for &event_id in &task.preactions {
                match state.event_status(event_id) {
                    Some(EventStatus::Satisfied) => {}
                    Some(EventStatus::Pending { producer }) if members.contains(&producer) => {
                        waits_on.entry(task.id).or_default().push((event_id, producer));
                    }
                    Some(EventStatus::Pending { producer }) => {
                        let reason = match state.task_state(producer) {
                            Some(TaskState::Running | TaskState::Completed) => continue,
                            Some(s) if s.is_dead() => format!("producer task {producer} is {s:?}"),
                            _ => format!("producer task {producer} is not in this submit"),
                        };
                        return Err(RuntimeError::unresolved_event(task.id, event_id, reason));
                    }
                    Some(EventStatus::Unsatisfied) | None => {
                        return Err(RuntimeError::unresolved_event(
                            task.id,
                            event_id,
                            "never signaled",
                        ));
                    }
                }
            }
        }
        if let Some((task_id, event_id)) = find_cycle(tasks, &waits_on) {
            return Err(RuntimeError::unresolved_event(
                task_id,
                event_id,
                "event dependency cycle",
            ));
        }

        // (c) engines
        for task in tasks {
            if !self.pool.has_engine(task.interface, task.instance) {
                return Err(RuntimeError::NoEngine {
                    task_id: task.id,
                    interface: task.interface,
                    instance: task.instance,
                });
            }
        }
        Ok(())
    }

    fn run(&mut self, state: &mut BindingState, submit_id: u16, tasks: &[&TaskListEntry]) -> Run {
        let mut waiting: Vec<&TaskListEntry> = tasks.to_vec();
        let mut run = Run::default();
        let mut running = 0usize;

        loop {
            let mut still_waiting = Vec::with_capacity(waiting.len());
            for task in waiting {
                if self.cancel.is_cancelled() {
                    state.set_task_state(task.id, TaskState::Cancelled);
                    continue;
                }
                match readiness(state, task) {
                    Readiness::Ready => {
                        state.set_task_state(task.id, TaskState::Dispatchable);
                        let dispatched = self.job(submit_id, task).and_then(|job| {
                            self.pool.dispatch(job, task.interface, task.instance)
                        });
                        match dispatched {
                            Ok(instance) => {
                                state.set_task_state(task.id, TaskState::Running);
                                run.instances.insert(task.id, instance);
                                running += 1;
                            }
                            Err(e) => {
                                warn!("Task {} could not be dispatched: {e}", task.id);
                                state.set_task_state(task.id, TaskState::Failed);
                                run.errors.insert(task.id, e.to_string());
                            }
                        }
                    }
                    Readiness::Blocked { event_id, producer } => {
                        warn!(
                            "Task {} blocked: producer {producer} of event {event_id} did not complete",
                            task.id
                        );
                        state.set_task_state(task.id, TaskState::Blocked { event_id, producer });
                    }
                    Readiness::Waiting => still_waiting.push(task),
                }
            }
            waiting = still_waiting;

            if running == 0 {
                // Only reachable when a producer was never dispatched.
                for task in waiting {
                    warn!("Task {} can never become ready", task.id);
                    let (event_id, producer) = first_pending(state, task);
                    state.set_task_state(task.id, TaskState::Blocked { event_id, producer });
                }
                break;
            }

            let completion = match self.pool.wait_completion() {
                Ok(c) => c,
                Err(e) => {
                    warn!("Submit {submit_id} lost its engines: {e}");
                    for task in tasks {
                        if state.task_state(task.id) == Some(TaskState::Running) {
                            state.set_task_state(task.id, TaskState::Failed);
                            run.errors.insert(task.id, e.to_string());
                        }
                    }
                    running = 0;
                    continue;
                }
            };
            running -= 1;
            let task_id = completion.task_id;
            match completion.result {
                Ok(()) => {
                    state.set_task_state(task_id, TaskState::Completed);
                    if let Some(task) = tasks.iter().find(|t| t.id == task_id) {
                        for &event_id in &task.postactions {
                            state.satisfy_event(event_id);
                        }
                    }
                    state.satisfy_produced_by(task_id);
                }
                Err(e) => {
                    warn!("Task {task_id} failed on {}: {e}", completion.instance);
                    state.set_task_state(task_id, TaskState::Failed);
                    run.errors.insert(task_id, e.to_string());
                }
            }
        }
        run
    }

    fn job(&self, submit_id: u16, task: &TaskListEntry) -> Result<TaskJob> {
        let addresses = task
            .address_list
            .iter()
            .map(|&id| {
                self.loadable.address_entry(id).map(|a| ResolvedAddress {
                    address_id: a.id,
                    mem_id: a.mem_id,
                    offset: a.offset,
                    size: a.size,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(TaskJob {
            task_id: task.id,
            submit_id,
            addresses,
        })
    }
}

#[derive(Debug, Default)]
struct Run {
    instances: BTreeMap<u16, EngineInstance>,
    errors: BTreeMap<u16, String>,
}

enum Readiness {
    Ready,
    Waiting,
    Blocked { event_id: u16, producer: u16 },
}

fn readiness(state: &BindingState, task: &TaskListEntry) -> Readiness {
    let mut ready = true;
    for &event_id in &task.preactions {
        match state.event_status(event_id) {
            Some(EventStatus::Satisfied) => {}
            Some(EventStatus::Pending { producer }) => {
                if state.task_state(producer).is_some_and(TaskState::is_dead) {
                    return Readiness::Blocked { event_id, producer };
                }
                ready = false;
            }
            _ => ready = false,
        }
    }
    if ready {
        Readiness::Ready
    } else {
        Readiness::Waiting
    }
}

fn first_pending(state: &BindingState, task: &TaskListEntry) -> (u16, u16) {
    task.preactions
        .iter()
        .find_map(|&event_id| match state.event_status(event_id) {
            Some(EventStatus::Pending { producer }) => Some((event_id, producer)),
            _ => None,
        })
        .unwrap_or_default()
}

/// A task on an event cycle within the submit and the event through which it
/// waits on the next task of the cycle.
fn find_cycle(
    tasks: &[&TaskListEntry],
    waits_on: &BTreeMap<u16, Vec<(u16, u16)>>,
) -> Option<(u16, u16)> {
    let mut indegree: BTreeMap<u16, usize> = tasks.iter().map(|t| (t.id, 0)).collect();
    let mut dependents: BTreeMap<u16, Vec<u16>> = BTreeMap::new();
    for (&consumer, edges) in waits_on {
        for &(_, producer) in edges {
            *indegree.entry(consumer).or_default() += 1;
            dependents.entry(producer).or_default().push(consumer);
        }
    }

    let mut ready: VecDeque<u16> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(&id, _)| id)
        .collect();
    while let Some(id) = ready.pop_front() {
        for &next in dependents.get(&id).into_iter().flatten() {
            if let Some(d) = indegree.get_mut(&next) {
                *d -= 1;
                if *d == 0 {
                    ready.push_back(next);
                }
            }
        }
        indegree.remove(&id);
    }

    // Every task left over waits on another left-over task. Walking those
    // edges from any of them must revisit a task, which lies on the cycle.
    let mut task_id = *indegree.keys().next()?;
    let mut path: Vec<(u16, u16)> = Vec::new();
    loop {
        if let Some(pos) = path.iter().position(|&(t, _)| t == task_id) {
            return Some(path[pos]);
        }
        let &(event_id, producer) = waits_on
            .get(&task_id)?
            .iter()
            .find(|(_, p)| indegree.contains_key(p))?;
        path.push((task_id, event_id));
        task_id = producer;
    }
}
