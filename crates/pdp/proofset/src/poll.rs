//! Bounded polling.

use std::{future::Future, time::Duration};
use tokio::time::{Instant, sleep, timeout_at};

/// Run `check` every `interval` until it yields a value or `deadline`
/// passes.
///
/// `check` runs at least once, and once more at the deadline itself. A check
/// still pending at the deadline is dropped. Returns `Ok(None)` on timeout;
/// errors from `check` end the loop.
pub async fn poll_until<T, E, F, Fut>(
    interval: Duration,
    deadline: Instant,
    mut check: F,
) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    loop {
        let Ok(result) = timeout_at(deadline, check()).await else {
            return Ok(None);
        };
        if let Some(value) = result? {
            return Ok(Some(value));
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        sleep(interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_some_checks() {
        let start = Instant::now();
        let mut calls = 0;
        let result: Result<_, Infallible> =
            poll_until(Duration::from_secs(2), start + Duration::from_secs(60), || {
                calls += 1;
                let ready = calls == 3;
                async move { Ok(ready.then_some(calls)) }
            })
            .await;

        assert_eq!(result.unwrap(), Some(3));
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_at_deadline() {
        let start = Instant::now();
        let result: Result<Option<()>, Infallible> =
            poll_until(Duration::from_secs(4), start + Duration::from_secs(10), || async {
                Ok(None)
            })
            .await;

        assert_eq!(result.unwrap(), None);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_stops_polling() {
        let result: Result<Option<()>, &str> = poll_until(
            Duration::from_secs(1),
            Instant::now() + Duration::from_secs(10),
            || async { Err("boom") },
        )
        .await;
        assert_eq!(result, Err("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_check_is_cut_at_deadline() {
        let start = Instant::now();
        let result: Result<Option<()>, Infallible> =
            poll_until(Duration::from_secs(1), start + Duration::from_secs(10), || async {
                sleep(Duration::from_secs(3600)).await;
                Ok(Some(()))
            })
            .await;

        assert_eq!(result.unwrap(), None);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }
}
