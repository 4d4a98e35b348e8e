//! Engine instances and the dispatcher that feeds them.
//!
//! Every engine instance runs on its own worker thread with a FIFO job
//! queue. Jobs for one instance execute in dispatch order; different
//! instances run in parallel. Results come back over a single completion
//! channel so the submitter can block on it instead of polling.

use crate::error::{Result, RuntimeError};
use dla_format::{Instance, Interface};
use std::fmt::{self, Debug};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Execution engine for one interface.
pub trait Engine: Debug + Send {
    /// Interface this engine executes.
    fn interface(&self) -> Interface;

    /// Run one task.
    ///
    /// # Errors
    ///
    /// Returns error if the task fails; the submitter marks it `Failed`.
    fn execute(&mut self, instance: EngineInstance, job: &TaskJob) -> Result<()>;
}

/// One engine instance: interface plus index within that interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EngineInstance {
    /// Interface
    pub interface: Interface,
    /// Instance index
    pub index: u16,
}

impl fmt::Display for EngineInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.interface, self.index)
    }
}

/// Memory window handed to an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAddress {
    /// Address entry
    pub address_id: u16,
    /// Memory entry
    pub mem_id: u16,
    /// Offset into the memory
    pub offset: u64,
    /// Window size
    pub size: u64,
}

/// A task ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskJob {
    /// Task id
    pub task_id: u16,
    /// Submit the task belongs to
    pub submit_id: u16,
    /// Resolved address list, in task order
    pub addresses: Vec<ResolvedAddress>,
}

/// Result of one job.
#[derive(Debug)]
pub struct Completion {
    /// Task id
    pub task_id: u16,
    /// Instance that ran it
    pub instance: EngineInstance,
    /// Engine outcome
    pub result: Result<()>,
}

#[derive(Debug)]
struct Worker {
    instance: EngineInstance,
    queue: Option<mpsc::Sender<TaskJob>>,
    handle: Option<JoinHandle<()>>,
    in_flight: usize,
}

/// Engine instances plus their queues.
#[derive(Debug)]
pub struct EnginePool {
    workers: Vec<Worker>,
    completion_tx: mpsc::Sender<Completion>,
    completions: mpsc::Receiver<Completion>,
}

impl Default for EnginePool {
    fn default() -> Self {
        Self::new()
    }
}

impl EnginePool {
    /// Pool without engines.
    pub fn new() -> Self {
        let (completion_tx, completions) = mpsc::channel();
        Self {
            workers: Vec::new(),
            completion_tx,
            completions,
        }
    }

    /// Start a worker thread for `engine`.
    ///
    /// The instance index is the number of engines of the same interface
    /// already in the pool.
    ///
    /// # Errors
    ///
    /// Returns error if the worker thread cannot be spawned.
    pub fn add_engine(&mut self, engine: Box<dyn Engine>) -> Result<EngineInstance> {
        let interface = engine.interface();
        let index = self
            .workers
            .iter()
            .filter(|w| w.instance.interface == interface)
            .count();
        let index = u16::try_from(index)
            .map_err(|_| RuntimeError::invalid_state(format!("too many {interface} instances")))?;
        let instance = EngineInstance { interface, index };

        let (queue, jobs) = mpsc::channel();
        let completions = self.completion_tx.clone();
        let handle = thread::Builder::new()
            .name(format!("dla-engine-{interface}-{index}"))
            .spawn(move || worker_loop(engine, instance, &jobs, &completions))?;

        info!("Engine {instance} started");
        self.workers.push(Worker {
            instance,
            queue: Some(queue),
            handle: Some(handle),
            in_flight: 0,
        });
        Ok(instance)
    }

    /// Registered instances in registration order.
    pub fn instances(&self) -> impl Iterator<Item = EngineInstance> + '_ {
        self.workers.iter().map(|w| w.instance)
    }

    /// True if some instance can take a task for `interface`/`selector`.
    pub fn has_engine(&self, interface: Interface, selector: Instance) -> bool {
        self.workers.iter().any(|w| accepts(w, interface, selector))
    }

    /// Jobs dispatched and not yet collected.
    pub fn in_flight(&self) -> usize {
        self.workers.iter().map(|w| w.in_flight).sum()
    }

    /// Queue `job` on an instance of `interface`.
    ///
    /// `Instance::Any` picks the instance with the fewest jobs in flight
    /// (lowest index on ties).
    ///
    /// # Errors
    ///
    /// `NoEngine` if no instance matches, `EngineFailure` if its worker has
    /// stopped.
    pub fn dispatch(
        &mut self,
        job: TaskJob,
        interface: Interface,
        selector: Instance,
    ) -> Result<EngineInstance> {
        let worker = self
            .workers
            .iter_mut()
            .filter(|w| accepts(w, interface, selector))
            .min_by_key(|w| (w.in_flight, w.instance.index))
            .ok_or(RuntimeError::NoEngine {
                task_id: job.task_id,
                interface,
                instance: selector,
            })?;

        let instance = worker.instance;
        let task_id = job.task_id;
        worker
            .queue
            .as_ref()
            .ok_or_else(|| RuntimeError::engine_failure(format!("{instance} is shut down")))?
            .send(job)
            .map_err(|_| RuntimeError::engine_failure(format!("{instance} worker has stopped")))?;
        worker.in_flight += 1;
        debug!("Task {task_id} dispatched to {instance}");
        Ok(instance)
    }

    /// Block until the next job finishes.
    ///
    /// # Errors
    ///
    /// `InvalidState` if nothing is in flight, `EngineFailure` if the
    /// completion channel is gone.
    pub fn wait_completion(&mut self) -> Result<Completion> {
        if self.in_flight() == 0 {
            return Err(RuntimeError::invalid_state("no task in flight"));
        }
        let completion = self
            .completions
            .recv()
            .map_err(|_| RuntimeError::engine_failure("completion channel closed"))?;
        if let Some(worker) = self
            .workers
            .iter_mut()
            .find(|w| w.instance == completion.instance)
        {
            worker.in_flight = worker.in_flight.saturating_sub(1);
        }
        debug!(
            "Task {} finished on {} ({})",
            completion.task_id,
            completion.instance,
            if completion.result.is_ok() { "ok" } else { "failed" }
        );
        Ok(completion)
    }
}

impl Drop for EnginePool {
    fn drop(&mut self) {
        for worker in &mut self.workers {
            worker.queue.take();
        }
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                if handle.join().is_err() {
                    warn!("Engine {} worker panicked", worker.instance);
                }
            }
        }
    }
}

fn accepts(worker: &Worker, interface: Interface, selector: Instance) -> bool {
    worker.instance.interface == interface
        && match selector {
            Instance::Any => true,
            Instance::Index(i) => worker.instance.index == i,
        }
}

fn worker_loop(
    mut engine: Box<dyn Engine>,
    instance: EngineInstance,
    jobs: &mpsc::Receiver<TaskJob>,
    completions: &mpsc::Sender<Completion>,
) {
    while let Ok(job) = jobs.recv() {
        let result = panic::catch_unwind(AssertUnwindSafe(|| engine.execute(instance, &job)))
            .unwrap_or_else(|_| {
                Err(RuntimeError::engine_failure(format!(
                    "{instance} panicked on task {}",
                    job.task_id
                )))
            });
        let completion = Completion {
            task_id: job.task_id,
            instance,
            result,
        };
        if completions.send(completion).is_err() {
            break;
        }
    }
    debug!("Engine {instance} stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct Recording {
        interface: Interface,
        seen: Arc<Mutex<Vec<(EngineInstance, u16)>>>,
    }

    impl Engine for Recording {
        fn interface(&self) -> Interface {
            self.interface
        }

        fn execute(&mut self, instance: EngineInstance, job: &TaskJob) -> Result<()> {
            if job.task_id == 99 {
                panic!("boom");
            }
            self.seen.lock().unwrap().push((instance, job.task_id));
            Ok(())
        }
    }

    fn job(task_id: u16) -> TaskJob {
        TaskJob {
            task_id,
            submit_id: 0,
            addresses: Vec::new(),
        }
    }

    fn pool(dla: usize, seen: &Arc<Mutex<Vec<(EngineInstance, u16)>>>) -> EnginePool {
        let mut pool = EnginePool::new();
        for _ in 0..dla {
            pool.add_engine(Box::new(Recording {
                interface: Interface::Dla1,
                seen: Arc::clone(seen),
            }))
            .unwrap();
        }
        pool
    }

    #[test]
    fn instance_indices_per_interface() {
        let seen = Arc::default();
        let mut p = pool(2, &seen);
        let emu = p
            .add_engine(Box::new(Recording {
                interface: Interface::Emu1,
                seen: Arc::clone(&seen),
            }))
            .unwrap();
        assert_eq!(emu.index, 0);
        assert_eq!(emu.to_string(), "EMU1#0");
        assert_eq!(p.instances().count(), 3);
        assert!(p.has_engine(Interface::Dla1, Instance::Index(1)));
        assert!(!p.has_engine(Interface::Dla1, Instance::Index(2)));
        assert!(!p.has_engine(Interface::None, Instance::Any));
    }

    #[test]
    fn any_goes_to_least_loaded() {
        let seen = Arc::default();
        let mut p = pool(2, &seen);
        let a = p.dispatch(job(0), Interface::Dla1, Instance::Any).unwrap();
        let b = p.dispatch(job(1), Interface::Dla1, Instance::Any).unwrap();
        assert_eq!(a.index, 0);
        assert_eq!(b.index, 1);
        assert_eq!(p.in_flight(), 2);
        p.wait_completion().unwrap();
        p.wait_completion().unwrap();
        assert_eq!(p.in_flight(), 0);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn missing_instance_is_no_engine() {
        let seen = Arc::default();
        let mut p = pool(1, &seen);
        let err = p
            .dispatch(job(4), Interface::Dla1, Instance::Index(3))
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::NoEngine {
                task_id: 4,
                instance: Instance::Index(3),
                ..
            }
        ));
        assert!(p.wait_completion().is_err());
    }

    #[test]
    fn panic_becomes_failed_completion() {
        let seen = Arc::default();
        let mut p = pool(1, &seen);
        p.dispatch(job(99), Interface::Dla1, Instance::Any).unwrap();
        let c = p.wait_completion().unwrap();
        assert!(matches!(c.result, Err(RuntimeError::EngineFailure { .. })));

        // worker survives the panic
        p.dispatch(job(1), Interface::Dla1, Instance::Any).unwrap();
        assert!(p.wait_completion().unwrap().result.is_ok());
    }
}
