//! Bounded-duration termination signal, ported from
//! `chaosgarden/util/terminator.py::Terminator`.

use crate::registry::CancelToken;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

/// "Should I stop now?" Cheap to poll: after construction, `is_terminated`
/// touches only atomics and an `Instant` comparison, no locks.
pub struct Terminator {
    duration: Duration,
    start: Instant,
    single_shot: bool,
    invocations: AtomicU64,
    cancel: CancelToken,
    caller: String,
}

impl Terminator {
    /// `duration == Duration::ZERO` means "run once" (single-shot
    /// semantics): the first observation consumes the one allowed
    /// iteration and the second observation reports termination.
    pub fn new(duration: Duration, cancel: CancelToken, caller: impl Into<String>) -> Self {
        Self {
            single_shot: duration.is_zero(),
            duration,
            start: Instant::now(),
            invocations: AtomicU64::new(0),
            cancel,
            caller: caller.into(),
        }
    }

    /// A Terminator with no external cancel source, for standalone use.
    pub fn bounded(duration: Duration, caller: impl Into<String>) -> Self {
        Self::new(duration, CancelToken::never(), caller)
    }

    fn log_termination(&self, reason: &str) {
        info!(
            caller = %self.caller,
            net_duration_secs = self.start.elapsed().as_secs_f64(),
            reason,
            "terminating simulation loop"
        );
    }

    /// Returns true once any of: single-shot's one iteration has already
    /// been consumed, the wall-clock deadline has passed, or the worker has
    /// been cooperatively cancelled via the Task Registry.
    pub fn is_terminated(&self) -> bool {
        let invocations_so_far = self.invocations.fetch_add(1, Ordering::SeqCst);

        let single_invocation_performed = self.single_shot && invocations_so_far == 1;
        if single_invocation_performed {
            self.log_termination("single invocation performed");
        }

        let time_is_up = !self.duration.is_zero() && self.start.elapsed() > self.duration;
        if time_is_up {
            self.log_termination("time is up");
        }

        let termination_requested = self.cancel.is_cancelled();
        if termination_requested {
            self.log_termination("termination requested");
        }

        single_invocation_performed || time_is_up || termination_requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_shot_returns_true_on_second_observation() {
        let terminator = Terminator::bounded(Duration::ZERO, "test");
        assert!(!terminator.is_terminated());
        assert!(terminator.is_terminated());
    }

    #[test]
    fn single_shot_stays_terminated_after_second_observation() {
        let terminator = Terminator::bounded(Duration::ZERO, "test");
        terminator.is_terminated();
        terminator.is_terminated();
        assert!(terminator.is_terminated());
    }

    #[test]
    fn bounded_duration_does_not_terminate_immediately() {
        let terminator = Terminator::bounded(Duration::from_secs(60), "test");
        assert!(!terminator.is_terminated());
    }

    #[test]
    fn expired_duration_terminates() {
        let terminator = Terminator::bounded(Duration::from_millis(1), "test");
        std::thread::sleep(Duration::from_millis(5));
        assert!(terminator.is_terminated());
    }

    #[tokio::test]
    async fn external_cancel_terminates() {
        use crate::registry::TaskRegistry;
        use std::sync::Arc;
        use tokio::sync::Notify;

        let registry = Arc::new(TaskRegistry::new());
        let observed_before = Arc::new(Notify::new());
        let observed_before_clone = observed_before.clone();
        let saw_termination = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let saw_termination_clone = saw_termination.clone();

        let handle = registry.launch("cancel-test", move |cancel| async move {
            let terminator = Terminator::new(Duration::from_secs(60), cancel, "cancel-test");
            assert!(!terminator.is_terminated());
            observed_before_clone.notify_one();
            loop {
                if terminator.is_terminated() {
                    saw_termination_clone.store(true, Ordering::SeqCst);
                    break;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        });

        observed_before.notified().await;
        registry.cancel(handle).await;
        assert!(saw_termination.load(Ordering::SeqCst));
    }
}
