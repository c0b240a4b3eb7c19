use chrono::Utc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::handlers::engine::{EngineError, EngineReply, SchedulerEngine, SessionEvent};

/// Engine output routed back to the session's front end, which renders
/// both success replies and error values the same way.
#[derive(Debug, Clone)]
pub struct SessionReply {
    pub session_id: String,
    pub reply: Result<EngineReply, EngineError>,
}

/// Drains the event bus into the engine. One worker serves all
/// sessions; the engine keeps per-session state isolated, so events
/// from independent sessions never interfere.
pub async fn run_event_worker(
    mut rx: mpsc::Receiver<SessionEvent>,
    engine: SchedulerEngine,
    replies: mpsc::Sender<SessionReply>,
) {
    while let Some(event) = rx.recv().await {
        let session_id = event.session_id().to_string();
        debug!(%session_id, "processing session event");
        let reply = engine.handle_event(event, Utc::now()).await;
        if replies
            .send(SessionReply { session_id, reply })
            .await
            .is_err()
        {
            // Front end went away; nothing left to serve.
            break;
        }
    }
}
