//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunable parameters for a [`DispatchEngine`](crate::core::DispatchEngine).
///
/// Defaults: 10 workers, 4 resource units, 4 base permits, up to 3 elastic
/// extras, watermarks at 80/50.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of dispatch worker threads.
    pub worker_count: usize,
    /// Number of resource units in the pool.
    pub unit_count: u32,
    /// Base capacity of the admission gate.
    pub base_capacity: u32,
    /// Maximum extra permits the load controller may grant.
    pub max_extra_permits: u32,
    /// Load above which extra capacity is granted.
    pub high_watermark: u32,
    /// Load below which granted extras are withdrawn.
    pub low_watermark: u32,
    /// Upper clamp for the load scalar.
    pub max_load: u32,
    /// Under emergency mode, non-critical items with priority numerically
    /// greater than this are dropped.
    pub emergency_drop_threshold: u8,
    /// Per-dispatch probability used by the default failure policy.
    pub failure_probability: f64,
    /// Upper bound on the wait after resource exhaustion, in milliseconds.
    pub retry_backoff_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: 10,
            unit_count: 4,
            base_capacity: 4,
            max_extra_permits: 3,
            high_watermark: 80,
            low_watermark: 50,
            max_load: 100,
            emergency_drop_threshold: 3,
            failure_probability: 0.1,
            retry_backoff_ms: 100,
        }
    }
}

impl EngineConfig {
    /// Default configuration with the worker count sized to the host's
    /// logical CPUs.
    #[must_use]
    pub fn sized_for_host() -> Self {
        Self {
            worker_count: num_cpus::get().max(1),
            ..Self::default()
        }
    }

    /// Set the worker thread count.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the resource unit count.
    #[must_use]
    pub const fn with_unit_count(mut self, unit_count: u32) -> Self {
        self.unit_count = unit_count;
        self
    }

    /// Set the base gate capacity.
    #[must_use]
    pub const fn with_base_capacity(mut self, base_capacity: u32) -> Self {
        self.base_capacity = base_capacity;
        self
    }

    /// Set the elastic-capacity cap.
    #[must_use]
    pub const fn with_max_extra_permits(mut self, max_extra_permits: u32) -> Self {
        self.max_extra_permits = max_extra_permits;
        self
    }

    /// Set both load watermarks.
    #[must_use]
    pub const fn with_watermarks(mut self, high: u32, low: u32) -> Self {
        self.high_watermark = high;
        self.low_watermark = low;
        self
    }

    /// Set the emergency drop threshold.
    #[must_use]
    pub const fn with_emergency_drop_threshold(mut self, threshold: u8) -> Self {
        self.emergency_drop_threshold = threshold;
        self
    }

    /// Set the default failure-injection probability.
    #[must_use]
    pub const fn with_failure_probability(mut self, probability: f64) -> Self {
        self.failure_probability = probability;
        self
    }

    /// Exhaustion retry backoff as a [`Duration`].
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a human-readable description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.unit_count == 0 {
            return Err("unit_count must be greater than 0".into());
        }
        if self.base_capacity == 0 {
            return Err("base_capacity must be greater than 0".into());
        }
        if self.high_watermark > self.max_load {
            return Err("high_watermark must not exceed max_load".into());
        }
        if self.low_watermark > self.high_watermark {
            return Err("low_watermark must not exceed high_watermark".into());
        }
        if !(1..=5).contains(&self.emergency_drop_threshold) {
            return Err("emergency_drop_threshold must be in 1..=5".into());
        }
        if !(0.0..=1.0).contains(&self.failure_probability) {
            return Err("failure_probability must be in 0.0..=1.0".into());
        }
        Ok(())
    }

    /// Parse a configuration from a JSON string and validate it.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
