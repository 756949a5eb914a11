//! Outcome races: wait on several mutually exclusive UI signals under one
//! deadline, then decide from live state.
//!
//! A signal is any future yielding `ProbeResult<()>`. The first `Ok` wins and
//! every other signal is dropped. A signal that fails is logged and leaves the
//! race; it never ends it. The winner is advisory only: [`Race::resolve`]
//! hands the [`Settlement`] to an inspection closure that reads the page
//! again, so two signals firing together still produce one consistent answer.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio::time::Instant;
use tracing::debug;

use crate::result::{ProbeError, ProbeResult};

/// How a race ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement<O> {
    /// Outcome of the first signal to succeed, if any did before the deadline
    pub winner: Option<O>,
    /// Time from start to settlement
    pub elapsed: Duration,
}

impl<O> Settlement<O> {
    #[must_use]
    pub const fn is_decided(&self) -> bool {
        self.winner.is_some()
    }
}

/// Labelled signals raced against a deadline
pub struct Race<'a, O> {
    deadline: Duration,
    signals: Vec<(O, BoxFuture<'a, ProbeResult<()>>)>,
}

impl<O: Debug> Debug for Race<'_, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Race")
            .field("deadline", &self.deadline)
            .field(
                "signals",
                &self.signals.iter().map(|(o, _)| o).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<'a, O: Debug> Race<'a, O> {
    #[must_use]
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            signals: Vec::new(),
        }
    }

    /// Add a signal that reports `outcome` when `fut` succeeds
    #[must_use]
    pub fn signal<F>(mut self, outcome: O, fut: F) -> Self
    where
        F: Future<Output = ProbeResult<()>> + Send + 'a,
    {
        self.signals.push((outcome, fut.boxed()));
        self
    }

    /// Wait for the first success or the deadline
    pub async fn settle(self) -> Settlement<O> {
        let started = Instant::now();
        let (outcomes, futures): (Vec<O>, Vec<_>) = self.signals.into_iter().unzip();
        let mut pending: FuturesUnordered<_> = futures
            .into_iter()
            .enumerate()
            .map(|(index, fut)| fut.map(move |result| (index, result)))
            .collect();

        let first = tokio::time::timeout(self.deadline, async {
            while let Some((index, result)) = pending.next().await {
                match result {
                    Ok(()) => return Some(index),
                    Err(e) => debug!(signal = ?outcomes[index], error = %e, "race signal failed"),
                }
            }
            None
        })
        .await
        .ok()
        .flatten();

        let winner = first.and_then(|index| outcomes.into_iter().nth(index));
        let elapsed = started.elapsed();
        debug!(?winner, ?elapsed, "race settled");
        Settlement { winner, elapsed }
    }

    /// Like [`Race::settle`], but no winner is a [`ProbeError::RaceTimeout`]
    pub async fn settle_strict(self) -> ProbeResult<O> {
        let ms = self.deadline.as_millis() as u64;
        let signals = self.signals.len();
        self.settle()
            .await
            .winner
            .ok_or(ProbeError::RaceTimeout { ms, signals })
    }

    /// Settle, then derive the result from `inspect`
    pub async fn resolve<T, F, Fut>(self, inspect: F) -> ProbeResult<T>
    where
        F: FnOnce(Settlement<O>) -> Fut,
        Fut: Future<Output = ProbeResult<T>>,
    {
        let settlement = self.settle().await;
        inspect(settlement).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Signal {
        Success,
        Failure,
    }

    async fn after(ms: u64, result: ProbeResult<()>) -> ProbeResult<()> {
        sleep(Duration::from_millis(ms)).await;
        result
    }

    mod settle_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_first_success_wins_before_error_and_deadline() {
            let settlement = Race::new(Duration::from_millis(300))
                .signal(Signal::Success, after(100, Ok(())))
                .signal(Signal::Failure, after(200, Err(ProbeError::unexpected("late"))))
                .settle()
                .await;
            assert_eq!(settlement.winner, Some(Signal::Success));
            assert_eq!(settlement.elapsed, Duration::from_millis(100));
        }

        #[tokio::test(start_paused = true)]
        async fn test_failed_signal_does_not_end_race() {
            let settlement = Race::new(Duration::from_secs(3))
                .signal(Signal::Failure, after(10, Err(ProbeError::unexpected("x"))))
                .signal(Signal::Success, after(500, Ok(())))
                .settle()
                .await;
            assert_eq!(settlement.winner, Some(Signal::Success));
            assert_eq!(settlement.elapsed, Duration::from_millis(500));
        }

        #[tokio::test(start_paused = true)]
        async fn test_deadline_without_winner() {
            let settlement = Race::new(Duration::from_millis(300))
                .signal(Signal::Success, after(1_000, Ok(())))
                .settle()
                .await;
            assert!(!settlement.is_decided());
            assert_eq!(settlement.elapsed, Duration::from_millis(300));
        }

        #[tokio::test(start_paused = true)]
        async fn test_all_failed_settles_early() {
            let settlement = Race::new(Duration::from_secs(3))
                .signal(Signal::Failure, after(50, Err(ProbeError::unexpected("x"))))
                .settle()
                .await;
            assert_eq!(settlement.winner, None);
            assert_eq!(settlement.elapsed, Duration::from_millis(50));
        }

        #[tokio::test(start_paused = true)]
        async fn test_strict_timeout() {
            let err = Race::<Signal>::new(Duration::from_millis(200))
                .signal(Signal::Success, after(1_000, Ok(())))
                .signal(Signal::Failure, after(1_000, Ok(())))
                .settle_strict()
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                ProbeError::RaceTimeout {
                    ms: 200,
                    signals: 2
                }
            ));
        }
    }

    mod resolve_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_simultaneous_signals_resolve_by_live_state() {
            let error_shown = Arc::new(AtomicBool::new(true));
            let live = error_shown.clone();
            let succeeded = Race::new(Duration::from_secs(3))
                .signal(Signal::Success, after(100, Ok(())))
                .signal(Signal::Failure, after(100, Ok(())))
                .resolve(|_settlement| async move { Ok(!live.load(Ordering::SeqCst)) })
                .await
                .unwrap();
            assert!(!succeeded);
        }

        #[tokio::test(start_paused = true)]
        async fn test_losers_are_dropped() {
            let loser_finished = Arc::new(AtomicBool::new(false));
            let flag = loser_finished.clone();
            Race::new(Duration::from_secs(1))
                .signal(Signal::Success, after(10, Ok(())))
                .signal(Signal::Failure, async move {
                    sleep(Duration::from_millis(500)).await;
                    flag.store(true, Ordering::SeqCst);
                    Ok(())
                })
                .settle()
                .await;
            sleep(Duration::from_secs(1)).await;
            assert!(!loser_finished.load(Ordering::SeqCst));
        }
    }
}
