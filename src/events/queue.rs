use tokio::sync::mpsc;

use crate::handlers::engine::SessionEvent;

/// Front-end facing handle for delivering session events to the worker.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }

    pub async fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event).await;
    }
}
