//! Bounded fan-out executor for peer calls.
//!
//! Every item becomes its own tokio task; a shared semaphore caps how many
//! run at once. Results come back in input order no matter which task
//! finishes first.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;

pub const DEFAULT_FETCH_WORKERS: usize = 10;

/// Why one item of a [`ParallelFetcher::map_async`] call has no value.
#[derive(Debug, Error)]
pub enum FetchError<E> {
    #[error("{0}")]
    Failed(E),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task cancelled")]
    Cancelled,

    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

#[derive(Clone, Debug)]
pub struct ParallelFetcher {
    semaphore: Arc<Semaphore>,
    workers: usize,
    timeout: Option<Duration>,
}

impl ParallelFetcher {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(workers)),
            workers,
            timeout: None,
        }
    }

    /// Give every item at most `timeout` once it holds a permit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `f` over every item concurrently and wait for all of them.
    ///
    /// The returned vector has one entry per item, in input order. A
    /// failing item never affects the others.
    pub async fn map_async<I, T, E, F, Fut>(
        &self,
        items: Vec<I>,
        mut f: F,
    ) -> Vec<Result<T, FetchError<E>>>
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let handles: Vec<_> = items
            .into_iter()
            .map(|item| {
                let fut = f(item);
                let semaphore = Arc::clone(&self.semaphore);
                let timeout = self.timeout;
                tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return Err(FetchError::Cancelled);
                    };
                    match timeout {
                        Some(limit) => match tokio::time::timeout(limit, fut).await {
                            Ok(result) => result.map_err(FetchError::Failed),
                            Err(_) => Err(FetchError::TimedOut(limit)),
                        },
                        None => fut.await.map_err(FetchError::Failed),
                    }
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => {
                    tracing::warn!(error = %e, "fetch task panicked");
                    Err(FetchError::Panicked(e.to_string()))
                }
                Err(_) => Err(FetchError::Cancelled),
            };
            results.push(result);
        }
        results
    }
}

impl Default for ParallelFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_WORKERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[tokio::test]
    async fn results_follow_input_order() {
        let fetcher = ParallelFetcher::new(4);
        // Later items finish first.
        let results = fetcher
            .map_async(vec![40u64, 30, 20, 10], |ms| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok::<_, String>(ms)
            })
            .await;
        let values: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![40, 30, 20, 10]);
    }

    #[tokio::test]
    async fn items_run_concurrently() {
        let fetcher = ParallelFetcher::new(4);
        let start = Instant::now();
        let results = fetcher
            .map_async((0..4).collect(), |i: u32| async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, String>(i)
            })
            .await;
        assert_eq!(results.len(), 4);
        // Four 50 ms sleeps in parallel, not 200 ms in sequence.
        assert!(
            start.elapsed() < Duration::from_millis(180),
            "took {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn semaphore_limits_concurrency() {
        let fetcher = ParallelFetcher::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let results = fetcher
            .map_async((0..6).collect(), |_: u32| {
                let running = Arc::clone(&running);
                let max_seen = Arc::clone(&max_seen);
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, String>(())
                }
            })
            .await;

        assert!(results.iter().all(Result::is_ok));
        let observed = max_seen.load(Ordering::SeqCst);
        assert!(observed <= 2, "observed concurrency {observed}");
    }

    #[tokio::test]
    async fn errors_and_panics_are_per_item() {
        let fetcher = ParallelFetcher::default();
        let results = fetcher
            .map_async(vec![1, 2, 3], |i: u32| async move {
                match i {
                    2 => Err(format!("item {i} failed")),
                    3 => panic!("boom"),
                    _ => Ok(i),
                }
            })
            .await;

        assert_eq!(results[0].as_ref().unwrap(), &1);
        assert!(matches!(&results[1], Err(FetchError::Failed(msg)) if msg == "item 2 failed"));
        assert!(matches!(results[2], Err(FetchError::Panicked(_))));
    }

    #[tokio::test]
    async fn slow_items_time_out() {
        let fetcher = ParallelFetcher::new(2).with_timeout(Duration::from_millis(20));
        let results = fetcher
            .map_async(vec![1u64, 200], |ms| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok::<_, String>(ms)
            })
            .await;
        assert_eq!(results[0].as_ref().unwrap(), &1);
        assert!(matches!(results[1], Err(FetchError::TimedOut(_))));
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let fetcher = ParallelFetcher::new(3);
        let results = fetcher
            .map_async(Vec::<u32>::new(), |i| async move { Ok::<_, String>(i) })
            .await;
        assert!(results.is_empty());
        assert_eq!(fetcher.workers(), 3);
    }
}
