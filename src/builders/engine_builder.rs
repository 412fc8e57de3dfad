//! Builder assembling a [`DispatchEngine`] from configuration and
//! pluggable collaborators.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::core::{
    DispatchEngine, DispatchError, EventSink, FailurePolicy, RandomFailures, SimulatedWork,
    WorkExecutor,
};

/// Builds a [`DispatchEngine`].
///
/// Collaborators are optional: by default work is simulated at 500-1500 ms
/// per item, failures are injected randomly at the configured probability,
/// and events go to tracing output only.
pub struct EngineBuilder {
    config: EngineConfig,
    executor: Option<Arc<dyn WorkExecutor>>,
    failures: Option<Arc<dyn FailurePolicy>>,
    events: Option<Arc<dyn EventSink>>,
}

impl EngineBuilder {
    /// Start a builder from a configuration.
    #[must_use]
    pub const fn new(config: EngineConfig) -> Self {
        Self {
            config,
            executor: None,
            failures: None,
            events: None,
        }
    }

    /// Supply the work executor.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn WorkExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Supply the failure-injection policy.
    #[must_use]
    pub fn with_failure_policy(mut self, failures: Arc<dyn FailurePolicy>) -> Self {
        self.failures = Some(failures);
        self
    }

    /// Attach an event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Validate the configuration and build the engine.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidConfig`] when validation fails.
    pub fn build(self) -> Result<DispatchEngine, DispatchError> {
        self.config
            .validate()
            .map_err(DispatchError::InvalidConfig)?;
        let failure_probability = self.config.failure_probability;
        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(SimulatedWork::default()));
        let failures = self
            .failures
            .unwrap_or_else(|| Arc::new(RandomFailures::new(failure_probability)));
        Ok(DispatchEngine::from_parts(
            self.config,
            executor,
            failures,
            self.events,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_with_defaults() {
        assert!(EngineBuilder::new(EngineConfig::default()).build().is_ok());
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let result = EngineBuilder::new(EngineConfig::default().with_worker_count(0)).build();
        assert!(matches!(result, Err(DispatchError::InvalidConfig(_))));
    }
}
