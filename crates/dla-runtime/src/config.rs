//! Runtime configuration
//!
//! Plain structs with defaults; callers override single fields with the
//! `with_*` methods.

use std::time::Duration;

/// Resolver behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveConfig {
    /// Check every tensor descriptor against the memory it lies in
    pub validate_tensor_descs: bool,

    /// Reject caller buffers that violate a memory entry's alignment
    /// (otherwise only warn)
    pub strict_alignment: bool,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            validate_tensor_descs: true,
            strict_alignment: false,
        }
    }
}

impl ResolveConfig {
    /// Toggle tensor descriptor validation.
    #[must_use]
    pub fn with_tensor_desc_validation(mut self, enabled: bool) -> Self {
        self.validate_tensor_descs = enabled;
        self
    }

    /// Toggle strict alignment of caller buffers.
    #[must_use]
    pub fn with_strict_alignment(mut self, enabled: bool) -> Self {
        self.strict_alignment = enabled;
        self
    }
}

/// Software engine pool layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Accelerator (DLA1) instances
    pub dla_instances: u16,

    /// CPU (EMU1) instances
    pub emu_instances: u16,

    /// Simulated time per task
    pub task_latency: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dla_instances: 1,
            emu_instances: 1,
            task_latency: Duration::ZERO,
        }
    }
}

impl EngineConfig {
    /// Set the number of DLA1 instances.
    #[must_use]
    pub fn with_dla_instances(mut self, count: u16) -> Self {
        self.dla_instances = count;
        self
    }

    /// Set the number of EMU1 instances.
    #[must_use]
    pub fn with_emu_instances(mut self, count: u16) -> Self {
        self.emu_instances = count;
        self
    }

    /// Set the simulated per-task latency.
    #[must_use]
    pub fn with_task_latency(mut self, latency: Duration) -> Self {
        self.task_latency = latency;
        self
    }
}
