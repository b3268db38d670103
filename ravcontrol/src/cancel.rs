//! Cancellation tokens for outstanding operations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ravupnp::errors::UpnpError;

/// Shared cancellation flag.
///
/// Cancelling is idempotent and may happen after the guarded operation has
/// completed, in which case it is a no-op.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Runs a blocking operation on a worker thread, returning early with
/// [`UpnpError::Cancelled`] if the token fires first.
///
/// The worker keeps running to completion in the background; its result is
/// discarded once the caller has given up.
pub fn run_cancellable<T, F>(cancel: &CancelToken, f: F) -> Result<T, UpnpError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, UpnpError> + Send + 'static,
{
    if cancel.is_cancelled() {
        return Err(UpnpError::Cancelled);
    }

    let (tx, rx) = crossbeam_channel::bounded(1);
    std::thread::spawn(move || {
        let _ = tx.send(f());
    });

    loop {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(result) => return result,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                if cancel.is_cancelled() {
                    return Err(UpnpError::Cancelled);
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                return Err(UpnpError::Transport("worker thread died".to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_idempotent() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_run_cancellable_completes() {
        let token = CancelToken::new();
        let result = run_cancellable(&token, || Ok(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_run_cancellable_cancelled_before_start() {
        let token = CancelToken::new();
        token.cancel();
        let result: Result<i32, _> = run_cancellable(&token, || Ok(42));
        assert!(matches!(result, Err(UpnpError::Cancelled)));
    }

    #[test]
    fn test_run_cancellable_cancelled_midway() {
        let token = CancelToken::new();
        let waiter = token.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            waiter.cancel();
        });

        let result: Result<i32, _> = run_cancellable(&token, || {
            std::thread::sleep(Duration::from_secs(5));
            Ok(42)
        });
        assert!(matches!(result, Err(UpnpError::Cancelled)));
    }
}
