//! Fanout of the engine's single-consumer output streams.
//!
//! The engine hands each output stream to exactly one consumer. The hub is
//! that consumer: a pump task drains the stream into a broadcast channel
//! so any number of WebSocket clients can subscribe. Per-subscriber
//! delivery is lossy (slow clients lag and skip), which keeps one stuck
//! connection from stalling the engine.

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

pub struct Hub<T> {
    tx: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> Hub<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.tx.subscribe()
    }

    /// Drains `source` into the hub until the engine closes it.
    pub fn pump(&self, mut source: mpsc::Receiver<T>) -> JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            while let Some(value) = source.recv().await {
                // Send only fails with zero subscribers; that is fine.
                let _ = tx.send(value);
            }
        })
    }
}
