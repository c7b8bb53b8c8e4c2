use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::{Classify, Verdict};

/// Runs `operation`, retrying transient failures up to `max_retries` times.
///
/// Each retry re-runs the whole operation after a constant `retry_interval`
/// pause. Errors classified [`Verdict::Fatal`] are returned on first sight
/// without consuming budget. Once the budget is spent the last error is
/// returned as-is.
pub async fn survive<T, E, F, Fut>(
    max_retries: u32,
    retry_interval: Duration,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify,
{
    let mut retries = max_retries;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if err.verdict() == Verdict::Fatal {
            return Err(err);
        }

        retries = match retries.checked_sub(1) {
            Some(left) => left,
            None => return Err(err),
        };

        tracing::debug!("[{}] {}. {} attempt(s) left.", err.kind(), err, retries);
        sleep(retry_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;
    use std::time::{Duration, Instant};

    use super::survive;
    use crate::{Classify, Verdict};

    #[derive(Debug, PartialEq, Eq)]
    enum TestError {
        Reset(usize),
        Fatal,
    }

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Reset(attempt) => write!(f, "connection reset on attempt {attempt}"),
                Self::Fatal => f.write_str("quota exhausted"),
            }
        }
    }

    impl Classify for TestError {
        fn verdict(&self) -> Verdict {
            match self {
                Self::Reset(_) => Verdict::Retry,
                Self::Fatal => Verdict::Fatal,
            }
        }
    }

    #[tokio::test]
    async fn transient_errors_run_budget_plus_one_attempts() {
        for max_retries in 0..5u32 {
            let mut calls = 0usize;
            let result: Result<(), _> = survive(max_retries, Duration::ZERO, || {
                calls += 1;
                let attempt = calls;
                async move { Err(TestError::Reset(attempt)) }
            })
            .await;

            let expected = max_retries as usize + 1;
            assert_eq!(calls, expected);
            // The last error comes back untouched.
            assert_eq!(result, Err(TestError::Reset(expected)));
        }
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        for max_retries in [0u32, 1, 10] {
            let mut calls = 0usize;
            let started = Instant::now();
            let result: Result<(), _> = survive(max_retries, Duration::from_secs(60), || {
                calls += 1;
                async { Err(TestError::Fatal) }
            })
            .await;

            assert_eq!(calls, 1);
            assert_eq!(result, Err(TestError::Fatal));
            assert!(started.elapsed() < Duration::from_secs(1));
        }
    }

    #[tokio::test]
    async fn success_returns_without_further_attempts() {
        let mut calls = 0usize;
        let started = Instant::now();
        let result = survive(3, Duration::from_secs(60), || {
            calls += 1;
            async { Ok::<_, TestError>("payload") }
        })
        .await;

        assert_eq!(result, Ok("payload"));
        assert_eq!(calls, 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn recovers_after_two_transient_failures() {
        let mut calls = 0usize;
        let started = Instant::now();
        let result = survive(2, Duration::from_millis(10), || {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt < 3 {
                    Err(TestError::Reset(attempt))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls, 3);
        // Two constant pauses of 10ms.
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn fatal_error_after_transient_stops_immediately() {
        let mut calls = 0usize;
        let result: Result<(), _> = survive(5, Duration::ZERO, || {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt == 1 {
                    Err(TestError::Reset(attempt))
                } else {
                    Err(TestError::Fatal)
                }
            }
        })
        .await;

        assert_eq!(result, Err(TestError::Fatal));
        assert_eq!(calls, 2);
    }
}
