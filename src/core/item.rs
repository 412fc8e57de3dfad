//! Work item and priority types.

use serde::{Deserialize, Serialize};

use super::DispatchError;

/// Numeric priority in `1..=5`, where 1 is the most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(u8);

impl Priority {
    /// Most urgent priority.
    pub const HIGHEST: Self = Self(1);
    /// Least urgent priority.
    pub const LOWEST: Self = Self(5);

    /// Validate a raw priority value.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidPriority`] when `value` is outside `1..=5`.
    pub fn new(value: u8) -> Result<Self, DispatchError> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(DispatchError::InvalidPriority(value))
        }
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// A unit of work flowing through the engine.
///
/// Immutable once created; items are always either served or re-queued,
/// never silently lost (emergency-mode drops are explicit and logged).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorkItem {
    /// Unique identifier, monotonically assigned or caller-supplied.
    pub id: u64,
    /// Queue ordering priority.
    pub priority: Priority,
    /// Critical items bypass numeric priority ordering entirely.
    pub critical: bool,
}

impl WorkItem {
    /// Create a work item.
    #[must_use]
    pub const fn new(id: u64, priority: Priority, critical: bool) -> Self {
        Self {
            id,
            priority,
            critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_accepts_valid_range() {
        for value in 1..=5 {
            assert_eq!(Priority::new(value).unwrap().get(), value);
        }
    }

    #[test]
    fn test_priority_rejects_out_of_range() {
        assert!(Priority::new(0).is_err());
        assert!(Priority::new(6).is_err());
        assert!(Priority::new(255).is_err());
    }

    #[test]
    fn test_priority_bounds() {
        assert_eq!(Priority::HIGHEST.get(), 1);
        assert_eq!(Priority::LOWEST.get(), 5);
        assert!(Priority::HIGHEST < Priority::LOWEST);
    }
}
