//! Query cancellation
//!
//! A query timeout or client disconnect flips a [`Canceller`]; every
//! collector working on that query holds a clone of the [`CancelSignal`].

use tokio::sync::watch;

/// Create a linked canceller / signal pair
pub fn pair() -> (Canceller, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (Canceller { tx }, CancelSignal { rx: Some(rx) })
}

/// Owning side, held by whoever controls the query lifetime
#[derive(Debug)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

impl Canceller {
    /// Cancel the query. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Get another signal tied to this canceller
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: Some(self.tx.subscribe()),
        }
    }
}

/// Observing side, cheap to clone into each unit of work
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolve once the query is cancelled.
    ///
    /// If the canceller is dropped without cancelling, this never resolves.
    pub async fn cancelled(&self) {
        let Some(mut rx) = self.rx.clone() else {
            return std::future::pending().await;
        };
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_signal_starts_clear() {
        let (_canceller, signal) = pair();
        assert!(!signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_wakes_waiters() {
        let (canceller, signal) = pair();
        let waiter = tokio::spawn({
            let signal = signal.clone();
            async move { signal.cancelled().await }
        });

        canceller.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .expect("task should not panic");
        assert!(signal.is_cancelled());
        assert!(canceller.signal().is_cancelled());
    }

    #[test]
    fn test_never_is_clear() {
        assert!(!CancelSignal::never().is_cancelled());
    }

    #[tokio::test]
    async fn test_dropped_canceller_does_not_fire() {
        let (canceller, signal) = pair();
        drop(canceller);
        let res = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(res.is_err());
        assert!(!signal.is_cancelled());
    }
}
