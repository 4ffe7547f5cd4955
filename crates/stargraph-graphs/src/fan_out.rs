//! Fail-fast concurrent fan-out with structured cancellation
//!
//! [`FanOut::run`] spawns one task per unit of work into a [`JoinSet`],
//! merges every unit's items through a bounded queue and joins every task
//! before returning. The first real failure cancels a token shared by all
//! units; each unit races its work, and its hand-off to the queue, against
//! that token so nothing can block on a collector that stopped listening.

use stargraph_common::{Result, StarGraphError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument};

/// Capacity of the result queue between units and the collector
const RESULT_QUEUE_CAPACITY: usize = 16;

/// Runs units of work concurrently and merges their items
#[derive(Debug, Clone, Copy, Default)]
pub struct FanOut {
    max_concurrency: Option<usize>,
}

impl FanOut {
    /// `None` spawns every unit at once; `Some(n)` lets at most `n` run
    pub fn new(max_concurrency: Option<usize>) -> Self {
        Self {
            max_concurrency: max_concurrency.filter(|n| *n > 0),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn max_concurrency(&self) -> Option<usize> {
        self.max_concurrency
    }

    /// Run `work` once per unit and return the union of their items.
    ///
    /// Item order is unspecified. The first unit failure cancels every
    /// other unit and is returned once all of them have stopped. If
    /// `parent` is cancelled, or this future is dropped, all units are
    /// cancelled as well.
    #[instrument(skip_all, fields(units = units.len()))]
    pub async fn run<U, T, F, Fut>(
        &self,
        parent: &CancellationToken,
        units: Vec<U>,
        work: F,
    ) -> Result<Vec<T>>
    where
        U: Send + 'static,
        T: Send + 'static,
        F: Fn(U, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>>> + Send + 'static,
    {
        if units.is_empty() {
            return Ok(Vec::new());
        }
        if parent.is_cancelled() {
            return Err(StarGraphError::cancelled("fan-out cancelled before start"));
        }

        let token = parent.child_token();
        // Dropping this future must stop every unit it spawned
        let _cancel_on_drop = token.clone().drop_guard();

        let (tx, mut rx) = mpsc::channel::<Vec<T>>(RESULT_QUEUE_CAPACITY);
        let semaphore = self.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));
        let work = Arc::new(work);

        let mut set = JoinSet::new();
        for unit in units {
            let token = token.clone();
            let tx = tx.clone();
            let work = Arc::clone(&work);
            let semaphore = semaphore.clone();

            set.spawn(async move {
                let _permit = match semaphore {
                    Some(semaphore) => tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            return Err(StarGraphError::cancelled("unit cancelled before start"));
                        }
                        permit = semaphore.acquire_owned() => Some(permit.map_err(|_| {
                            StarGraphError::cancelled("fan-out closed before unit started")
                        })?),
                    },
                    None => None,
                };

                let items = tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        return Err(StarGraphError::cancelled("unit cancelled"));
                    }
                    result = (*work)(unit, token.clone()) => result?,
                };

                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        Err(StarGraphError::cancelled("unit result abandoned"))
                    }
                    sent = tx.send(items) => sent.map_err(|_| {
                        StarGraphError::cancelled("collector stopped before unit result")
                    }),
                }
            });
        }
        // Only the units hold senders now
        drop(tx);

        debug!("Dispatched {} units", set.len());

        let mut merged = Vec::new();
        let mut failure: Option<StarGraphError> = None;
        let mut saw_cancellation = false;

        loop {
            tokio::select! {
                Some(items) = rx.recv() => merged.extend(items),
                joined = set.join_next() => {
                    let outcome = match joined {
                        None => break,
                        Some(Ok(outcome)) => outcome,
                        Some(Err(join_err)) => Err(StarGraphError::with_source(
                            "fan-out unit panicked",
                            join_err,
                        )),
                    };

                    match outcome {
                        Ok(()) => {}
                        Err(err) if err.is_cancelled() => saw_cancellation = true,
                        Err(err) => {
                            if failure.is_none() {
                                error!("Fan-out unit failed, cancelling siblings: {}", err);
                                token.cancel();
                                failure = Some(err);
                            } else {
                                debug!("Additional fan-out failure ignored: {}", err);
                            }
                        }
                    }
                }
            }
        }

        if let Some(err) = failure {
            return Err(err);
        }
        if saw_cancellation || parent.is_cancelled() {
            return Err(StarGraphError::cancelled("fan-out cancelled"));
        }

        // Units that finished after their send may leave results queued
        while let Ok(items) = rx.try_recv() {
            merged.extend(items);
        }

        debug!("Fan-out merged {} items", merged.len());
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_empty_units() {
        let result: Vec<u32> = FanOut::unbounded()
            .run(&CancellationToken::new(), Vec::<u32>::new(), |u, _| async move {
                Ok(vec![u])
            })
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_union_of_all_units() {
        let mut result = FanOut::unbounded()
            .run(&CancellationToken::new(), (1..=40u32).collect(), |u, _| async move {
                // Later units finish first
                tokio::time::sleep(Duration::from_millis(u64::from(40 - u))).await;
                Ok(vec![u * 10, u * 10 + 1])
            })
            .await
            .unwrap();

        result.sort_unstable();
        let expected: Vec<u32> = (1..=40u32).flat_map(|u| [u * 10, u * 10 + 1]).collect();
        assert_eq!(result, expected);
    }

    #[tokio::test]
    async fn test_failure_is_returned_not_cancellation() {
        let err = FanOut::unbounded()
            .run(&CancellationToken::new(), (1..=10u32).collect(), |u, token| async move {
                if u == 4 {
                    return Err(StarGraphError::remote_with_status("boom", 500));
                }
                token.cancelled().await;
                Ok(vec![u])
            })
            .await
            .unwrap_err();

        assert!(!err.is_cancelled());
        assert_eq!(err.status_code(), Some(500));
    }

    #[tokio::test]
    async fn test_concurrency_bound_is_respected() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (r, p) = (running.clone(), peak.clone());
        let result = FanOut::new(Some(3))
            .run(&CancellationToken::new(), (0..20u32).collect(), move |u, _| {
                let (running, peak) = (r.clone(), p.clone());
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(vec![u])
                }
            })
            .await
            .unwrap();

        assert_eq!(result.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(FanOut::new(Some(0)).max_concurrency(), None);
    }

    #[tokio::test]
    async fn test_parent_cancellation_stops_units() {
        let parent = CancellationToken::new();
        let canceller = parent.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            FanOut::unbounded().run(&parent, (0..8u32).collect(), |_, _| async move {
                std::future::pending::<()>().await;
                Ok(Vec::<u32>::new())
            }),
        )
        .await
        .expect("fan-out did not observe parent cancellation");

        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_already_cancelled_parent() {
        let parent = CancellationToken::new();
        parent.cancel();

        let err = FanOut::unbounded()
            .run(&parent, vec![1u32], |u, _| async move { Ok(vec![u]) })
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_failure_while_results_are_queued_does_not_hang() {
        let metrics = tokio::runtime::Handle::current().metrics();
        let alive_before = metrics.num_alive_tasks();
        let units = (RESULT_QUEUE_CAPACITY * 8) as u32;

        // Every unit but the last finishes at once and fills the queue
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            FanOut::unbounded().run(
                &CancellationToken::new(),
                (0..=units).collect(),
                move |u, _| async move {
                    if u == units {
                        tokio::task::yield_now().await;
                        return Err(StarGraphError::remote_with_status("last unit failed", 502));
                    }
                    Ok(vec![u; 4])
                },
            ),
        )
        .await
        .expect("fan-out hung with units parked on a full queue");

        let err = result.unwrap_err();
        assert!(!err.is_cancelled());
        assert_eq!(err.status_code(), Some(502));
        assert_eq!(metrics.num_alive_tasks(), alive_before);
    }

    #[tokio::test]
    async fn test_results_larger_than_queue_are_not_lost() {
        let units = (RESULT_QUEUE_CAPACITY * 4) as u32;
        let result = FanOut::unbounded()
            .run(&CancellationToken::new(), (0..units).collect(), |u, _| async move {
                Ok(vec![u])
            })
            .await
            .unwrap();
        assert_eq!(result.len(), units as usize);
    }
}
