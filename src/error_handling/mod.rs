//! Error handling and failure statistics.
//!
//! This module provides:
//! - Error type definitions, one enum per concern
//! - Failure statistics tracking (one counter per failure kind)
//!
//! Problems recorded during a run fall into:
//! - **Configuration** errors: the document or a check branch is rejected
//! - **Validation** failures: a validator or reader failed on a response
//! - **Timeout** / **Transport** errors: the request itself failed

mod stats;
mod types;

// Re-export public API
pub use stats::FailureStats;
pub use types::{
    ConfigError, FailureKind, InitializationError, NotifyError, StoreError, TransportError,
    ValidationFailure,
};

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_failure_stats_initialization() {
        let stats = FailureStats::new();
        for kind in FailureKind::iter() {
            assert_eq!(stats.get(kind), 0);
        }
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn test_failure_stats_increment() {
        let stats = FailureStats::new();
        stats.increment(FailureKind::Validation);
        stats.increment(FailureKind::Validation);
        stats.increment(FailureKind::Timeout);

        assert_eq!(stats.get(FailureKind::Validation), 2);
        assert_eq!(stats.get(FailureKind::Timeout), 1);
        assert_eq!(stats.get(FailureKind::Transport), 0);
        assert_eq!(stats.total(), 3);
    }
}
