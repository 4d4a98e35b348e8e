// SPDX-License-Identifier: AGPL-3.0-only

//! Software engine
//!
//! Stands in for both engine categories: `DLA1` (accelerator) and `EMU1`
//! (CPU). It does not compute anything; it records every job it receives in
//! a shared [`ExecutionLog`] so callers can check dispatch order, instance
//! assignment and how often each task ran. Tests can make it fail chosen
//! tasks to exercise the `Failed`/`Blocked` paths.

use crate::engine::{Engine, EngineInstance, TaskJob};
use crate::error::{Result, RuntimeError};
use dla_format::Interface;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// One executed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRecord {
    /// Task id
    pub task_id: u16,
    /// Submit id
    pub submit_id: u16,
    /// Instance that ran it
    pub instance: EngineInstance,
    /// Number of address windows in the job
    pub num_addresses: usize,
    /// False when the engine reported failure
    pub succeeded: bool,
}

/// Execution log shared by software engines, in completion order.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    records: Arc<Mutex<Vec<ExecutionRecord>>>,
}

impl ExecutionLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ExecutionRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, record: ExecutionRecord) {
        self.lock().push(record);
    }

    /// Snapshot of all records.
    pub fn records(&self) -> Vec<ExecutionRecord> {
        self.lock().clone()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing ran.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// How many times `task_id` was executed.
    pub fn runs_of(&self, task_id: u16) -> usize {
        self.lock().iter().filter(|r| r.task_id == task_id).count()
    }

    /// Position of `task_id`'s first run, if any.
    pub fn position_of(&self, task_id: u16) -> Option<usize> {
        self.lock().iter().position(|r| r.task_id == task_id)
    }

    /// Forget all records.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Engine that records jobs instead of running them
#[derive(Debug)]
pub struct SoftwareEngine {
    interface: Interface,
    latency: Duration,
    fail_tasks: BTreeSet<u16>,
    log: ExecutionLog,
}

impl SoftwareEngine {
    /// Engine for `interface` writing to `log`.
    pub fn new(interface: Interface, log: &ExecutionLog) -> Self {
        Self {
            interface,
            latency: Duration::ZERO,
            fail_tasks: BTreeSet::new(),
            log: log.clone(),
        }
    }

    /// Accelerator engine.
    pub fn dla(log: &ExecutionLog) -> Self {
        Self::new(Interface::Dla1, log)
    }

    /// CPU engine.
    pub fn emu(log: &ExecutionLog) -> Self {
        Self::new(Interface::Emu1, log)
    }

    /// Sleep this long per job.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Report failure whenever `task_id` runs.
    #[must_use]
    pub fn failing(mut self, task_id: u16) -> Self {
        self.fail_tasks.insert(task_id);
        self
    }
}

impl Engine for SoftwareEngine {
    fn interface(&self) -> Interface {
        self.interface
    }

    fn execute(&mut self, instance: EngineInstance, job: &TaskJob) -> Result<()> {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        let succeeded = !self.fail_tasks.contains(&job.task_id);
        self.log.push(ExecutionRecord {
            task_id: job.task_id,
            submit_id: job.submit_id,
            instance,
            num_addresses: job.addresses.len(),
            succeeded,
        });

        if succeeded {
            debug!("{instance}: task {} done", job.task_id);
            Ok(())
        } else {
            warn!("{instance}: task {} failed", job.task_id);
            Err(RuntimeError::engine_failure(format!(
                "{instance} rejected task {}",
                job.task_id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance() -> EngineInstance {
        EngineInstance {
            interface: Interface::Emu1,
            index: 0,
        }
    }

    fn job(task_id: u16) -> TaskJob {
        TaskJob {
            task_id,
            submit_id: 2,
            addresses: Vec::new(),
        }
    }

    #[test]
    fn records_runs() {
        let log = ExecutionLog::new();
        let mut engine = SoftwareEngine::emu(&log);
        assert_eq!(engine.interface(), Interface::Emu1);
        engine.execute(instance(), &job(3)).unwrap();
        engine.execute(instance(), &job(3)).unwrap();
        assert_eq!(log.runs_of(3), 2);
        assert_eq!(log.records()[0].submit_id, 2);
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn injected_failure() {
        let log = ExecutionLog::new();
        let mut engine = SoftwareEngine::dla(&log).failing(1);
        assert!(engine.execute(instance(), &job(0)).is_ok());
        assert!(engine.execute(instance(), &job(1)).is_err());
        let records = log.records();
        assert!(records[0].succeeded);
        assert!(!records[1].succeeded);
    }
}
