use thiserror::Error;

/// Notification errors. None of these are ever surfaced to an API caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("Event queue full, dropped {event_type}")]
    QueueFull { event_type: String },

    #[error("Event emitter is shut down")]
    Closed,

    #[error("Failed to encode event payload: {reason}")]
    Encode { reason: String },

    #[error("Sink '{sink}' rejected event: {reason}")]
    Sink { sink: String, reason: String },
}
