use crate::error::AuditError;
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::warn;

/// Drive allows 500 requests per 100 seconds per project; stay under it.
pub const DEFAULT_MAX_CALLS: usize = 400;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(100);

/// What to do when the budget for the current window is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Exhaustion {
    /// Sleep until the oldest call leaves the window.
    #[default]
    Wait,
    /// Return `AuditError::BudgetExhausted`.
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_calls: usize,
    pub window: Duration,
    pub on_exhausted: Exhaustion,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_calls: DEFAULT_MAX_CALLS,
            window: DEFAULT_WINDOW,
            on_exhausted: Exhaustion::Wait,
        }
    }
}

/// Rolling-window call budget. Remembers when each call inside the window started.
#[derive(Debug)]
pub struct CallBudget {
    policy: RateLimitPolicy,
    calls: VecDeque<Instant>,
}

impl CallBudget {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            calls: VecDeque::with_capacity(policy.max_calls),
        }
    }

    /// Calls started within the current window.
    pub fn calls_in_window(&self) -> usize {
        self.calls.len()
    }

    fn expire(&mut self, now: Instant) {
        while let Some(&start) = self.calls.front() {
            if now.duration_since(start) >= self.policy.window {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    fn exhausted(&self) -> AuditError {
        AuditError::BudgetExhausted {
            max_calls: self.policy.max_calls,
            window: self.policy.window,
        }
    }

    /// Reserve one call, blocking or failing per policy when the window is full.
    pub async fn acquire(&mut self) -> Result<(), AuditError> {
        loop {
            let now = Instant::now();
            self.expire(now);

            if self.calls.len() < self.policy.max_calls {
                self.calls.push_back(now);
                return Ok(());
            }

            let oldest = match (self.policy.on_exhausted, self.calls.front()) {
                (Exhaustion::Wait, Some(&oldest)) => oldest,
                _ => return Err(self.exhausted()),
            };
            let resume_at = oldest + self.policy.window;
            warn!(
                "Call budget of {} per {:?} spent, waiting {:?}",
                self.policy.max_calls,
                self.policy.window,
                resume_at.saturating_duration_since(now)
            );
            sleep_until(resume_at).await;
        }
    }

    /// Run `call` once budget is available.
    pub async fn throttled<T, F>(&mut self, call: F) -> Result<T, AuditError>
    where
        F: Future<Output = Result<T, AuditError>>,
    {
        self.acquire().await?;
        call.await
    }
}

impl Default for CallBudget {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[tokio::test(start_paused = true)]
    async fn test_401st_call_waits_for_window() {
        let mut budget = CallBudget::default();
        let start = Instant::now();

        for _ in 0..400 {
            budget.acquire().await.unwrap();
        }
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(budget.calls_in_window(), 400);

        budget.acquire().await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(100));
        assert_eq!(budget.calls_in_window(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_rolls_per_call() {
        let mut budget = CallBudget::new(RateLimitPolicy {
            max_calls: 4,
            window: Duration::from_secs(10),
            on_exhausted: Exhaustion::Wait,
        });
        let start = Instant::now();

        budget.acquire().await.unwrap();
        budget.acquire().await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        budget.acquire().await.unwrap();
        budget.acquire().await.unwrap();

        // Frees up when the first two calls age out, not when the last two do
        budget.acquire().await.unwrap();
        let first_wait = start.elapsed();
        assert!(first_wait >= Duration::from_secs(10));
        assert!(first_wait < Duration::from_secs(11));
        budget.acquire().await.unwrap();
        assert_eq!(start.elapsed(), first_wait);

        budget.acquire().await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(15));
        assert!(start.elapsed() < Duration::from_secs(16));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_policy() {
        let mut budget = CallBudget::new(RateLimitPolicy {
            max_calls: 2,
            window: Duration::from_secs(100),
            on_exhausted: Exhaustion::Fail,
        });
        budget.acquire().await.unwrap();
        budget.acquire().await.unwrap();

        let err = budget.acquire().await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Budget);

        tokio::time::advance(Duration::from_secs(100)).await;
        assert!(budget.acquire().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_never_hangs() {
        let mut budget = CallBudget::new(RateLimitPolicy {
            max_calls: 0,
            window: Duration::from_secs(1),
            on_exhausted: Exhaustion::Wait,
        });
        assert!(budget.acquire().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_runs_call() {
        let mut budget = CallBudget::default();
        let value = budget.throttled(async { Ok::<_, AuditError>(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(budget.calls_in_window(), 1);
    }
}
