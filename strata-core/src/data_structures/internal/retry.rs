use crossbeam_utils::Backoff;
use tracing::{debug, trace};

use crate::config::{BackoffStrategy, RetryPolicy};

/// Per-operation retry state.
///
/// One `Retry` lives for the duration of a single list operation. Every failed validation,
/// failed CAS or observation of a node that is not linked yet calls [`Retry::wait`]. The
/// loop around it never gives up; the policy only decides how long to pause.
///
pub(crate) struct Retry {
    backoff: Backoff,
    policy: RetryPolicy,
    operation: &'static str,
    attempts: u32,
}

impl Retry {
    pub(crate) fn new(policy: RetryPolicy, operation: &'static str) -> Self {
        Retry {
            backoff: Backoff::new(),
            policy,
            operation,
            attempts: 0,
        }
    }

    /// Record a failed attempt and pause according to the policy.
    ///
    /// A `contention_warning_after` of zero disables the contention event.
    pub(crate) fn wait(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
        trace!(
            operation = self.operation,
            attempt = self.attempts,
            "retrying skip list operation"
        );

        if self.attempts == self.policy.contention_warning_after {
            debug!(
                operation = self.operation,
                attempts = self.attempts,
                "skip list operation is contended"
            );
        }

        match self.policy.backoff {
            BackoffStrategy::None => {}
            BackoffStrategy::Spin => self.backoff.spin(),
            BackoffStrategy::SpinThenYield => self.backoff.snooze(),
        }
    }

    #[cfg(test)]
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::no_backoff(BackoffStrategy::None)]
    #[case::spin(BackoffStrategy::Spin)]
    #[case::spin_then_yield(BackoffStrategy::SpinThenYield)]
    fn test_counts_attempts(#[case] backoff: BackoffStrategy) {
        let policy = RetryPolicy {
            backoff,
            contention_warning_after: 3,
        };
        let mut retry = Retry::new(policy, "test");
        assert_eq!(retry.attempts(), 0);

        for _ in 0..20 {
            retry.wait();
        }
        assert_eq!(retry.attempts(), 20);
    }

    #[test]
    fn test_disabled_warning_threshold() {
        let policy = RetryPolicy {
            backoff: BackoffStrategy::None,
            contention_warning_after: 0,
        };
        let mut retry = Retry::new(policy, "test");
        retry.wait();
        assert_eq!(retry.attempts(), 1);
    }
}
