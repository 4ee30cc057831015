//! Graceful shutdown coordination shared by the consumer loops.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, Instant};
use tracing::{info, warn};

/// Cooperative shutdown handle.
///
/// One `Shutdown` is created per service binary and cloned into every
/// consumer and HTTP task. Triggering it flips a watch channel that the
/// loops select on; in-flight deliveries are counted so the binary can
/// wait for them to be acked or nacked before closing broker clients.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
    inflight: Arc<AtomicUsize>,
}

impl Shutdown {
    /// Create a new, untriggered shutdown handle.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx,
            rx,
            inflight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Signal all tasks to stop accepting new work.
    pub fn trigger(&self) {
        if !self.is_triggered() {
            info!("shutdown initiated");
        }
        self.tx.send(true).ok();
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested. Used in `tokio::select!`
    /// alongside broker reads.
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Mark a delivery as in flight. The returned guard decrements the
    /// counter when dropped, including on panic unwind.
    pub fn begin_delivery(&self) -> InflightGuard {
        self.inflight.fetch_add(1, Ordering::Relaxed);
        InflightGuard {
            inflight: Arc::clone(&self.inflight),
        }
    }

    /// Number of deliveries currently being processed.
    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::Relaxed)
    }

    /// Wait until all in-flight deliveries finish, up to `timeout`.
    pub async fn drain(&self, timeout: Duration) -> crate::Result<()> {
        let deadline = Instant::now() + timeout;
        while self.inflight() > 0 {
            if Instant::now() > deadline {
                let count = self.inflight();
                warn!(inflight = count, "shutdown drain timed out");
                return Err(crate::ColdchainError::Shutdown(format!(
                    "{count} deliveries still in flight after {timeout:?}"
                )));
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        info!("all in-flight deliveries drained");
        Ok(())
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for a single in-flight delivery.
#[derive(Debug)]
pub struct InflightGuard {
    inflight: Arc<AtomicUsize>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.inflight.fetch_sub(1, Ordering::Relaxed);
    }
}
