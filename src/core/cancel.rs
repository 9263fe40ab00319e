//! Cancellation of in-flight service calls
//!
//! `main` owns a `watch::Sender<bool>` that flips to `true` on SIGINT or
//! SIGTERM. Workflows hold the receiver and wrap each awaited call in
//! [`cancellable`], so a shutdown request fails the current call with
//! [`AzLearnError::Cancelled`] instead of waiting for it to finish.

use crate::domain::{AzLearnError, Result};
use std::future::Future;
use tokio::sync::watch;

/// True once shutdown has been requested
pub fn is_cancelled(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

/// Awaits `future` unless shutdown is requested first
///
/// If the sender has been dropped the call can no longer be cancelled and
/// simply runs to completion.
pub async fn cancellable<T, F>(shutdown: &watch::Receiver<bool>, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if is_cancelled(shutdown) {
        return Err(AzLearnError::Cancelled);
    }

    let mut shutdown = shutdown.clone();
    tokio::select! {
        result = future => result,
        _ = shutdown_requested(&mut shutdown) => {
            tracing::warn!("Shutdown requested, abandoning in-flight call");
            Err(AzLearnError::Cancelled)
        }
    }
}

/// Sleeps for `delay` unless shutdown is requested first
pub async fn pause(shutdown: &watch::Receiver<bool>, delay: std::time::Duration) -> Result<()> {
    if delay.is_zero() {
        return if is_cancelled(shutdown) {
            Err(AzLearnError::Cancelled)
        } else {
            Ok(())
        };
    }
    cancellable(shutdown, async {
        tokio::time::sleep(delay).await;
        Ok(())
    })
    .await
}

async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            // Sender dropped: nobody can request shutdown any more
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_completes_without_signal() {
        let (_tx, rx) = watch::channel(false);
        let value = cancellable(&rx, async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_already_cancelled_fails_fast() {
        let (_tx, rx) = watch::channel(true);
        let result: Result<()> = cancellable(&rx, async { Ok(()) }).await;
        assert!(matches!(result, Err(AzLearnError::Cancelled)));
    }

    #[tokio::test]
    async fn test_signal_interrupts_pending_call() {
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            cancellable(&rx, async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(AzLearnError::Cancelled)));
    }

    #[tokio::test]
    async fn test_dropped_sender_never_cancels() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let value = cancellable(&rx, async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok("done")
        })
        .await
        .unwrap();
        assert_eq!(value, "done");
    }

    #[tokio::test]
    async fn test_pause_zero_is_immediate() {
        let (_tx, rx) = watch::channel(false);
        pause(&rx, Duration::ZERO).await.unwrap();
    }
}
