//! Process-wide flags shared across engine components.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

/// Shared system context holding the shutdown and emergency flags.
///
/// Created when the engine is built and handed to every component, rather
/// than living in globals. Both flags are plain atomics; blocking waiters
/// (queue, gate) are woken through their own condition variables.
#[derive(Debug, Default)]
pub struct SystemContext {
    shutdown: AtomicBool,
    emergency: AtomicBool,
}

impl SystemContext {
    /// Create a context with both flags clear.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal global shutdown. One-way for the lifetime of the engine.
    pub fn begin_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Whether shutdown has been signaled.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Set or clear emergency mode.
    ///
    /// Nothing clears the flag automatically; the explicit clear exists for
    /// operators even though the load controller never invokes it.
    pub fn set_emergency(&self, on: bool) {
        let was = self.emergency.swap(on, Ordering::AcqRel);
        if on && !was {
            warn!("emergency mode enabled: low-priority non-critical items will be dropped");
        } else if !on && was {
            info!("emergency mode cleared");
        }
    }

    /// Whether emergency mode is active.
    #[must_use]
    pub fn is_emergency(&self) -> bool {
        self.emergency.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_start_clear() {
        let ctx = SystemContext::new();
        assert!(!ctx.is_shutting_down());
        assert!(!ctx.is_emergency());
    }

    #[test]
    fn test_emergency_set_and_clear() {
        let ctx = SystemContext::new();
        ctx.set_emergency(true);
        assert!(ctx.is_emergency());
        ctx.set_emergency(true);
        assert!(ctx.is_emergency());
        ctx.set_emergency(false);
        assert!(!ctx.is_emergency());
    }

    #[test]
    fn test_shutdown_is_one_way() {
        let ctx = SystemContext::new();
        ctx.begin_shutdown();
        assert!(ctx.is_shutting_down());
    }
}
