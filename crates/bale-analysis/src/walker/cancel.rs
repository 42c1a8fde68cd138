//! Build cancellation by generation number.

use std::sync::Arc;

use tokio::sync::watch;

/// Generation counter shared by a session and the builds it starts.
///
/// Each build holds a [`CancelToken`] stamped with the generation current at
/// its start. Advancing the generation cancels every outstanding token.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    pub fn generation(&self) -> u64 {
        *self.tx.borrow()
    }

    /// Cancel every token issued so far and return the new generation.
    pub fn advance(&self) -> u64 {
        self.tx.send_modify(|generation| *generation += 1);
        self.generation()
    }

    /// Token for the current generation.
    pub fn token(&self) -> CancelToken {
        let rx = self.tx.subscribe();
        let generation = *rx.borrow();
        CancelToken { rx, generation }
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<u64>,
    generation: u64,
}

impl CancelToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() != self.generation
    }

    /// Resolves once the signal has moved past this token's generation.
    pub async fn cancelled(&mut self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // signal dropped: nothing can cancel this token any more
                std::future::pending::<()>().await;
            }
        }
    }
}
