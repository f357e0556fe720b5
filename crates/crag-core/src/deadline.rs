//! Caller-side timeouts for blocking capability calls.
//!
//! The call runs on its own thread; the caller waits on a channel with
//! `recv_timeout`. A call that misses its deadline is detached: its thread
//! keeps running until the capability returns, and its result is dropped.

use std::sync::mpsc;
use std::time::Duration;

use thiserror::Error;

/// Why a deadline-bounded call produced no value.
#[derive(Debug, Error)]
pub enum CallError {
    /// The capability returned an error.
    #[error("{0:#}")]
    Failed(anyhow::Error),

    /// The capability did not answer in time.
    #[error("timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),

    /// The capability panicked or its worker thread could not start.
    #[error("capability worker aborted: {0}")]
    Aborted(String),
}

/// Run `f` on a worker thread and wait at most `timeout` for its result.
pub fn call_with_timeout<T, F>(name: &str, timeout: Duration, f: F) -> Result<T, CallError>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();

    std::thread::Builder::new()
        .name(format!("crag-{}", name))
        .spawn(move || {
            // Receiver is gone once the caller timed out
            let _ = tx.send(f());
        })
        .map_err(|e| CallError::Aborted(e.to_string()))?;

    match rx.recv_timeout(timeout) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(CallError::Failed(e)),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::warn!("{} call exceeded {}ms, detaching", name, timeout.as_millis());
            Err(CallError::TimedOut(timeout))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(CallError::Aborted(format!("{} worker exited without a result", name)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_returned_within_deadline() {
        let result = call_with_timeout("test", Duration::from_secs(5), || Ok(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_error_is_forwarded() {
        let result: Result<u8, _> =
            call_with_timeout("test", Duration::from_secs(5), || anyhow::bail!("upstream 503"));
        let err = result.unwrap_err();
        assert!(matches!(err, CallError::Failed(_)));
        assert!(err.to_string().contains("upstream 503"));
    }

    #[test]
    fn test_slow_call_times_out() {
        let result = call_with_timeout("test", Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(500));
            Ok(())
        });
        let err = result.unwrap_err();
        assert!(matches!(err, CallError::TimedOut(_)));
        assert!(err.to_string().contains("20ms"));
    }

    #[test]
    fn test_panic_is_reported_as_aborted() {
        let result: Result<u8, _> =
            call_with_timeout("test", Duration::from_secs(5), || panic!("judge exploded"));
        assert!(matches!(result, Err(CallError::Aborted(_))));
    }
}
