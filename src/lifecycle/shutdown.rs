//! Shutdown coordination.
//!
//! The HTTP server subscribes before it starts serving. `trigger` stops
//! accepting new uploads; uploads already being spooled or relayed run to
//! completion and their spool files are released as they finish.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

/// One-shot stop signal for the relay's long-running tasks.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: AtomicBool::new(false),
        }
    }

    /// A receiver that fires on the first `trigger`. Subscribe before
    /// triggering; late subscribers miss the signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscriber once and return how many were listening.
    /// Repeated calls are no-ops returning 0.
    pub fn trigger(&self, reason: &str) -> usize {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return 0;
        }
        let reached = self.tx.send(()).unwrap_or(0);
        tracing::info!(reason, subscribers = reached, "Shutdown triggered");
        reached
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
