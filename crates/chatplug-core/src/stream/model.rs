//! Stream state models.

use crate::session::MessageStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an in-flight stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
    Error,
}

impl StreamStatus {
    /// Terminal streams are evicted after the grace period.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Error)
    }

    /// Whether `self -> next` is an edge of the stream state machine.
    ///
    /// `active <-> paused`, and `active | paused -> completed | cancelled | error`.
    /// Self-transitions and anything leaving a terminal status are rejected.
    pub fn can_transition_to(self, next: StreamStatus) -> bool {
        match (self, next) {
            (Self::Active, Self::Paused) | (Self::Paused, Self::Active) => true,
            (Self::Active | Self::Paused, next) => next.is_terminal(),
            _ => false,
        }
    }

    /// The message status mirroring this stream status.
    pub fn message_status(self) -> MessageStatus {
        match self {
            Self::Active => MessageStatus::Active,
            Self::Paused => MessageStatus::Paused,
            Self::Completed => MessageStatus::Completed,
            Self::Cancelled => MessageStatus::Cancelled,
            Self::Error => MessageStatus::Error,
        }
    }
}

/// Snapshot of one in-flight stream. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamState {
    /// Equals the id of the streaming message it feeds.
    pub stream_id: String,
    pub plugin_id: String,
    pub instance_id: String,
    pub status: StreamStatus,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        use StreamStatus::*;
        assert!(Active.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Active));
        for terminal in [Completed, Cancelled, Error] {
            assert!(Active.can_transition_to(terminal));
            assert!(Paused.can_transition_to(terminal));
        }
    }

    #[test]
    fn test_rejected_transitions() {
        use StreamStatus::*;
        assert!(!Active.can_transition_to(Active));
        assert!(!Paused.can_transition_to(Paused));
        assert!(!Completed.can_transition_to(Active));
        assert!(!Cancelled.can_transition_to(Completed));
        assert!(!Error.can_transition_to(Paused));
    }
}
