//! Generic retry-until combinator used for every asynchronous remote wait.
//!
//! The provisioning API models slow operations as status transitions: the
//! caller re-fetches a record until a field reaches a terminal value. This
//! module carries no domain knowledge — `attempt` refreshes some state and
//! `condition` inspects the most recent result.

use std::future::Future;
use std::time::Duration;

use crate::error::CoreError;

/// Re-run `attempt` until `condition` holds for its result.
///
/// `attempt` runs once unconditionally before the first check, so a
/// condition that is already satisfied never sleeps. Between subsequent
/// attempts the task suspends for `pause`.
///
/// There is no built-in bound: a remote status that never reaches its
/// terminal value polls forever. Callers that need a deadline should use
/// [`until_bounded`] or wrap the whole orchestration in an external timeout.
pub async fn until<T, E, C, A, Fut>(condition: C, mut attempt: A, pause: Duration) -> Result<T, E>
where
    C: Fn(&T) -> bool,
    A: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut result = attempt().await?;
    while !condition(&result) {
        tokio::time::sleep(pause).await;
        result = attempt().await?;
    }
    Ok(result)
}

/// Like [`until`], but gives up after `max_attempts` attempts with
/// [`CoreError::PollTimeout`].
pub async fn until_bounded<T, C, A, Fut>(
    condition: C,
    mut attempt: A,
    pause: Duration,
    max_attempts: u32,
) -> Result<T, CoreError>
where
    C: Fn(&T) -> bool,
    A: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let mut attempts = 1;
    let mut result = attempt().await?;
    while !condition(&result) {
        if attempts >= max_attempts {
            return Err(CoreError::PollTimeout { attempts });
        }
        tokio::time::sleep(pause).await;
        result = attempt().await?;
        attempts += 1;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn attempt_runs_once_when_condition_already_holds() {
        let calls = Cell::new(0u32);

        let result: Result<u32, CoreError> = until(
            |_| true,
            || {
                calls.set(calls.get() + 1);
                async { Ok(7) }
            },
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_repeats_until_condition_holds() {
        let calls = Cell::new(0u32);

        let result: Result<u32, CoreError> = until(
            |value| *value >= 4,
            || {
                calls.set(calls.get() + 1);
                let value = calls.get();
                async move { Ok(value) }
            },
            Duration::from_secs(1),
        )
        .await;

        // False for 3 checks, true on the 4th: n+1 = 4 attempts total.
        assert_eq!(result.unwrap(), 4);
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn no_sleep_happens_on_immediate_success() {
        let before = tokio::time::Instant::now();

        let _: Result<(), CoreError> =
            until(|()| true, || async { Ok(()) }, Duration::from_secs(60)).await;

        assert_eq!(tokio::time::Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_the_configured_pause_between_attempts() {
        let before = tokio::time::Instant::now();
        let calls = Cell::new(0u32);

        let _: Result<u32, CoreError> = until(
            |value| *value == 3,
            || {
                calls.set(calls.get() + 1);
                let value = calls.get();
                async move { Ok(value) }
            },
            Duration::from_secs(5),
        )
        .await;

        // Two pauses between three attempts.
        assert_eq!(before.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_errors_propagate_immediately() {
        let result: Result<(), CoreError> = until(
            |()| false,
            || async { Err(CoreError::NoServers) },
            Duration::from_secs(1),
        )
        .await;

        assert!(matches!(result, Err(CoreError::NoServers)));
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_poll_times_out() {
        let result: Result<u32, CoreError> = until_bounded(
            |_| false,
            || async { Ok(0) },
            Duration::from_secs(1),
            3,
        )
        .await;

        assert!(matches!(result, Err(CoreError::PollTimeout { attempts: 3 })));
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_poll_succeeds_within_limit() {
        let calls = Cell::new(0u32);

        let result = until_bounded(
            |value| *value == 2,
            || {
                calls.set(calls.get() + 1);
                let value = calls.get();
                async move { Ok(value) }
            },
            Duration::from_secs(1),
            5,
        )
        .await;

        assert_eq!(result.unwrap(), 2);
    }
}
