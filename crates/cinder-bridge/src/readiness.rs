//! One-shot readiness state machine.

use std::time::Duration;

use tokio::sync::watch;
use tracing::warn;

use crate::error::ReadinessError;

/// Injection readiness, per provider-hack instance.
///
/// Transitions exactly once from `Pending` to a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Ready,
    Failed(String),
}

impl Readiness {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Readiness::Pending)
    }
}

/// Shared readiness cell with joinable waits.
///
/// Late callers join the same pending wait instead of re-triggering
/// whatever work the cell guards.
#[derive(Debug)]
pub struct ReadinessCell {
    tx: watch::Sender<Readiness>,
}

impl ReadinessCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Readiness::Pending);
        Self { tx }
    }

    pub fn current(&self) -> Readiness {
        self.tx.borrow().clone()
    }

    /// Terminal success transition. A second transition attempt is a
    /// logic bug: logged and ignored to preserve the one-shot law.
    pub fn mark_ready(&self) {
        self.transition(Readiness::Ready);
    }

    /// Terminal failure transition, same one-shot rule.
    pub fn mark_failed(&self, reason: impl Into<String>) {
        self.transition(Readiness::Failed(reason.into()));
    }

    fn transition(&self, next: Readiness) {
        self.tx.send_if_modified(|current| {
            if current.is_terminal() {
                warn!(?current, ?next, "ignoring second readiness transition");
                false
            } else {
                *current = next;
                true
            }
        });
    }

    /// Wait for the terminal transition.
    ///
    /// Resolves immediately when already `Ready`, errors immediately when
    /// already `Failed`, otherwise waits up to `timeout`. Timing out
    /// rejects only this waiter; the shared state stays `Pending` for
    /// everyone else.
    pub async fn until_ready(&self, timeout: Duration) -> Result<(), ReadinessError> {
        let mut rx = self.tx.subscribe();
        let wait = async {
            loop {
                let current = rx.borrow_and_update().clone();
                match current {
                    Readiness::Ready => return Ok(()),
                    Readiness::Failed(reason) => return Err(ReadinessError::Failed(reason)),
                    Readiness::Pending => {
                        if rx.changed().await.is_err() {
                            // cell dropped while pending: nothing will
                            // ever resolve this wait
                            return Err(ReadinessError::Failed(
                                "readiness cell dropped".to_string(),
                            ));
                        }
                    }
                }
            }
        };
        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_elapsed) => Err(ReadinessError::Timeout(timeout)),
        }
    }
}

impl Default for ReadinessCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn resolves_immediately_when_already_ready() {
        let cell = ReadinessCell::new();
        cell.mark_ready();
        cell.until_ready(Duration::from_millis(1)).await.unwrap();
    }

    #[tokio::test]
    async fn errors_immediately_when_already_failed() {
        let cell = ReadinessCell::new();
        cell.mark_failed("no host");
        match cell.until_ready(Duration::from_millis(1)).await {
            Err(ReadinessError::Failed(reason)) => assert_eq!(reason, "no host"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn short_waiter_times_out_while_late_success_still_resolves() {
        let cell = Arc::new(ReadinessCell::new());

        let short = {
            let cell = cell.clone();
            tokio::spawn(async move { cell.until_ready(Duration::from_millis(100)).await })
        };
        let patient = {
            let cell = cell.clone();
            tokio::spawn(async move { cell.until_ready(Duration::from_millis(500)).await })
        };

        let marker = {
            let cell = cell.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                cell.mark_ready();
            })
        };

        assert!(matches!(
            short.await.unwrap(),
            Err(ReadinessError::Timeout(_))
        ));
        patient.await.unwrap().unwrap();
        marker.await.unwrap();
        // the timed-out waiter did not poison the shared state
        assert_eq!(cell.current(), Readiness::Ready);
    }

    #[tokio::test]
    async fn second_transition_is_ignored() {
        let cell = ReadinessCell::new();
        cell.mark_failed("first");
        cell.mark_ready();
        assert_eq!(cell.current(), Readiness::Failed("first".to_string()));
    }

    #[tokio::test]
    async fn pending_waiters_all_join_the_same_transition() {
        let cell = Arc::new(ReadinessCell::new());
        let mut waiters = Vec::new();
        for _ in 0..4 {
            let cell = cell.clone();
            waiters.push(tokio::spawn(async move {
                cell.until_ready(Duration::from_secs(1)).await
            }));
        }
        tokio::task::yield_now().await;
        cell.mark_ready();
        for waiter in waiters {
            waiter.await.unwrap().unwrap();
        }
    }
}
