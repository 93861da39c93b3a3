//! Domain events published by the agent loop.
//!
//! Front-ends subscribe to render progress; nothing in the loop depends on
//! anyone listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// The backend answered one step of a run
    ResponseGenerated {
        session_id: String,
        model: String,
        tokens_used: u32,
        tool_calls: usize,
        timestamp: DateTime<Utc>,
    },

    /// A tool call was dispatched and produced a result
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A checkpoint commit was written after a run that changed files
    CheckpointCreated {
        session_id: String,
        commit: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A run ended because its stop handle was triggered
    AgentStopped {
        session_id: String,
        iterations: u32,
        timestamp: DateTime<Utc>,
    },

    /// Something failed that did not abort the run
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::CheckpointCreated {
            session_id: "s1".into(),
            commit: "abc123".into(),
            message: "2026-01-01T00:00:00Z fix the bug".into(),
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::CheckpointCreated { commit, .. } => assert_eq!(commit, "abc123"),
            _ => panic!("Expected CheckpointCreated event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::AgentStopped {
            session_id: "s1".into(),
            iterations: 2,
            timestamp: Utc::now(),
        });
    }
}
