//! Engine implementations
//!
//! - **Software**: records jobs for `DLA1` and `EMU1` without hardware

pub mod software;

pub use software::{ExecutionLog, ExecutionRecord, SoftwareEngine};

use crate::config::EngineConfig;
use crate::engine::EnginePool;
use crate::error::Result;
use tracing::info;

impl EnginePool {
    /// Pool of software engines laid out per `config`, all logging to `log`.
    ///
    /// # Errors
    ///
    /// Returns error if a worker thread cannot be spawned.
    pub fn software(config: &EngineConfig, log: &ExecutionLog) -> Result<Self> {
        let mut pool = Self::new();
        for _ in 0..config.dla_instances {
            pool.add_engine(Box::new(
                SoftwareEngine::dla(log).with_latency(config.task_latency),
            ))?;
        }
        for _ in 0..config.emu_instances {
            pool.add_engine(Box::new(
                SoftwareEngine::emu(log).with_latency(config.task_latency),
            ))?;
        }
        info!(
            "Software pool: {} DLA1, {} EMU1 instance(s)",
            config.dla_instances, config.emu_instances
        );
        Ok(pool)
    }
}
