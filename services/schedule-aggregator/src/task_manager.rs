//! Async task manager.
//!
//! A scoped object that fans out one task per carrier adapter, retries
//! transport failures under an increasing timeout, and gathers results
//! without letting one carrier's failure cancel its siblings. Task outcomes
//! are an explicit enum rather than a raised exception.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{info, warn};

/// The explicit result of one adapter task. Never an exception: callers
/// pattern-match instead of catching.
#[derive(Debug)]
pub enum TaskOutcome<T> {
    Ok(T),
    Failed,
    Cancelled,
}

impl<T> TaskOutcome<T> {
    pub fn into_ok(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            Self::Failed | Self::Cancelled => None,
        }
    }
}

/// Per-task timeout/retry parameters, configured via
/// [`freight_core::PoolConfig`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base_timeout: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// A scoped fan-out of named tasks. Owned by one request; never shared
/// across requests.
pub struct TaskManager<T> {
    join_set: JoinSet<(String, TaskOutcome<T>)>,
    policy: RetryPolicy,
    error_flag: Arc<AtomicBool>,
}

impl<T: Send + 'static> TaskManager<T> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            join_set: JoinSet::new(),
            policy,
            error_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag the aggregator consults to decide whether it's safe to
    /// enqueue a background cache write: only write to cache if no task
    /// manager error is set.
    pub fn error_flag(&self) -> Arc<AtomicBool> {
        self.error_flag.clone()
    }

    /// Spawn one named task. `task_fn` is called again on every retry
    /// attempt, since each attempt is a fresh upstream call.
    pub fn spawn<F, Fut, E>(&mut self, name: impl Into<String>, task_fn: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send,
        E: fmt::Display + Send + 'static,
    {
        let name = name.into();
        let policy = self.policy;
        let error_flag = self.error_flag.clone();

        self.join_set.spawn(async move {
            let outcome = run_with_retry(&name, task_fn, policy, &error_flag).await;
            (name, outcome)
        });
    }

    /// Gather every task's outcome. Concurrent; a failure in one task never
    /// cancels its siblings. `JoinError` (panic or external cancellation of
    /// the whole scope) becomes [`TaskOutcome::Cancelled`].
    pub async fn join_all(mut self) -> Vec<(String, TaskOutcome<T>)> {
        let mut results = Vec::new();
        while let Some(joined) = self.join_set.join_next().await {
            match joined {
                Ok((name, outcome)) => results.push((name, outcome)),
                Err(join_error) => {
                    warn!(error = %join_error, "task manager scope cancelled a task");
                    results.push(("<unknown>".to_string(), TaskOutcome::Cancelled));
                }
            }
        }
        results
    }

    /// A lazy view over just the successful, non-cancelled results: a lazy
    /// iterator over non-exception, non-none results.
    pub fn successes(results: Vec<(String, TaskOutcome<T>)>) -> impl Iterator<Item = T> {
        results.into_iter().filter_map(|(_, outcome)| outcome.into_ok())
    }
}

async fn run_with_retry<F, Fut, T, E>(
    name: &str,
    task_fn: F,
    policy: RetryPolicy,
    error_flag: &AtomicBool,
) -> TaskOutcome<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    for attempt in 0..=policy.max_retries {
        let attempt_timeout = policy.base_timeout + Duration::from_secs(3 * attempt as u64);

        match tokio::time::timeout(attempt_timeout, task_fn()).await {
            Ok(Ok(value)) => return TaskOutcome::Ok(value),
            Ok(Err(e)) => {
                warn!(task = name, attempt, error = %e, "task attempt failed");
            }
            Err(_) => {
                warn!(task = name, attempt, timeout_secs = attempt_timeout.as_secs(), "task attempt timed out");
            }
        }

        if attempt < policy.max_retries {
            // Cancellation-aware: if the enclosing task is aborted while
            // asleep here, this future is simply dropped and the JoinSet
            // records a JoinError, never a Failed outcome.
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    info!(task = name, "task exhausted retries, marking failed");
    error_flag.store(true, Ordering::Relaxed);
    TaskOutcome::Failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn successful_task_yields_ok() {
        let mut manager: TaskManager<u32> = TaskManager::new(RetryPolicy {
            base_timeout: Duration::from_secs(5),
            max_retries: 1,
        });
        manager.spawn("fast", || async { Ok::<u32, String>(42) });
        let results = manager.join_all().await;
        let values: Vec<_> = TaskManager::successes(results).collect();
        assert_eq!(values, vec![42]);
    }

    #[tokio::test(start_paused = true)]
    async fn timing_out_task_retries_then_fails_without_cancelling_siblings() {
        let mut manager: TaskManager<u32> = TaskManager::new(RetryPolicy {
            base_timeout: Duration::from_millis(10),
            max_retries: 2,
        });
        let error_flag = manager.error_flag();

        manager.spawn("slow", || async {
            tokio::time::sleep(Duration::from_secs(100)).await;
            Ok::<u32, String>(0)
        });
        manager.spawn("fast", || async { Ok::<u32, String>(7) });

        let results = manager.join_all().await;
        let values: Vec<_> = TaskManager::successes(results).collect();

        assert_eq!(values, vec![7]);
        assert!(error_flag.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn retries_call_the_task_function_again() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let mut manager: TaskManager<u32> = TaskManager::new(RetryPolicy {
            base_timeout: Duration::from_secs(5),
            max_retries: 2,
        });
        manager.spawn("flaky", move || {
            let attempts = attempts_clone.clone();
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err::<u32, String>("not yet".to_string())
                } else {
                    Ok(99)
                }
            }
        });

        let results = manager.join_all().await;
        let values: Vec<_> = TaskManager::successes(results).collect();
        assert_eq!(values, vec![99]);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
