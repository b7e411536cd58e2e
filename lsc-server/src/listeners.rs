//! Listener fan-out for streaming results
//!
//! Every passive `/audio_listen` connection registers a bounded channel.
//! Producers publish each chunk's report to all of them. A listener whose
//! receiver is gone is pruned on the publish that notices it; a listener
//! that is merely slow loses that one update.

use std::collections::HashMap;
use std::sync::Arc;

use lsc_common::ClassificationReport;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Registry of connected listeners
#[derive(Clone)]
pub struct ListenerRegistry {
    senders: Arc<RwLock<HashMap<Uuid, mpsc::Sender<ClassificationReport>>>>,
    buffer: usize,
}

impl ListenerRegistry {
    /// # Arguments
    ///
    /// * `buffer` - Reports queued per listener before updates are dropped
    pub fn new(buffer: usize) -> Self {
        Self {
            senders: Arc::new(RwLock::new(HashMap::new())),
            buffer: buffer.max(1),
        }
    }

    /// Add a listener; the receiver yields every report published afterwards
    pub async fn register(&self) -> (Uuid, mpsc::Receiver<ClassificationReport>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = Uuid::new_v4();
        self.senders.write().await.insert(id, tx);
        debug!(listener = %id, "Listener registered");
        (id, rx)
    }

    pub async fn unregister(&self, id: Uuid) {
        if self.senders.write().await.remove(&id).is_some() {
            debug!(listener = %id, "Listener unregistered");
        }
    }

    /// Send `report` to every listener
    ///
    /// Returns the number of listeners that accepted it.
    pub async fn publish(&self, report: &ClassificationReport) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        {
            let senders = self.senders.read().await;
            for (id, tx) in senders.iter() {
                match tx.try_send(report.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(listener = %id, "Listener queue full, dropping update");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        if !closed.is_empty() {
            let mut senders = self.senders.write().await;
            for id in closed {
                senders.remove(&id);
                debug!(listener = %id, "Pruned disconnected listener");
            }
        }

        delivered
    }

    pub async fn listener_count(&self) -> usize {
        self.senders.read().await.len()
    }
}
