//! Per-session event fan-out.
//!
//! Events are totally ordered per session and delivered best-effort over a
//! tokio broadcast channel; listeners that fall behind or disconnect are
//! dropped silently. The most recent events are kept in a bounded replay
//! buffer so a reconnecting listener catches up.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::broadcast;
use tra_core::event::WorkflowEvent;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 100;
const REPLAY_CAPACITY: usize = 50;

struct SessionChannel {
    tx: broadcast::Sender<WorkflowEvent>,
    replay: VecDeque<WorkflowEvent>,
}

/// Fan-out hub for workflow events, partitioned by session id.
#[derive(Default)]
pub struct Broadcaster {
    sessions: Mutex<HashMap<String, SessionChannel>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event. Never blocks and never fails; delivery to any
    /// particular listener is best-effort.
    pub fn publish(&self, session_id: &str, event: WorkflowEvent) {
        let Ok(mut sessions) = self.sessions.lock() else {
            return;
        };
        let channel = sessions.entry(session_id.to_string()).or_insert_with(|| {
            let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
            SessionChannel {
                tx,
                replay: VecDeque::new(),
            }
        });

        debug!(session_id, event = event.label(), "broadcast");
        if channel.replay.len() == REPLAY_CAPACITY {
            channel.replay.pop_front();
        }
        channel.replay.push_back(event.clone());
        // Send errors just mean no listener is currently attached.
        let _ = channel.tx.send(event);
    }

    /// Attach a listener: returns the replay buffer plus a live receiver.
    pub fn subscribe(
        &self,
        session_id: &str,
    ) -> (Vec<WorkflowEvent>, broadcast::Receiver<WorkflowEvent>) {
        let Ok(mut sessions) = self.sessions.lock() else {
            let (tx, rx) = broadcast::channel(1);
            drop(tx);
            return (Vec::new(), rx);
        };
        let channel = sessions.entry(session_id.to_string()).or_insert_with(|| {
            let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
            SessionChannel {
                tx,
                replay: VecDeque::new(),
            }
        });
        (channel.replay.iter().cloned().collect(), channel.tx.subscribe())
    }

    /// Replay buffer for a session; used by status endpoints and tests.
    pub fn replay(&self, session_id: &str) -> Vec<WorkflowEvent> {
        self.sessions
            .lock()
            .ok()
            .and_then(|sessions| sessions.get(session_id).map(|c| c.replay.iter().cloned().collect()))
            .unwrap_or_default()
    }

    /// Drop all channels; part of ordered engine teardown.
    pub fn close(&self) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.clear();
        }
    }
}
