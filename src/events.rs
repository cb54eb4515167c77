//! Lifecycle events published by the session controller
//!
//! Events are delivered over a `tokio::sync::broadcast` channel. Every event
//! is tagged with the session id it belongs to so subscribers can tell a
//! superseded session apart from the current one.

use crate::models::{SessionRegistration, StatusTicket};
use log::debug;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Typed lifecycle event
#[derive(Debug, Clone, PartialEq)]
pub enum SsoEvent {
    /// A new session code was issued
    CodeRefresh {
        session_id: String,
        registration: SessionRegistration,
    },
    /// The broker reports the session as `processing`
    SsoProcessing {
        session_id: String,
        ticket: StatusTicket,
    },
    /// The session reached `success` or `failed`
    SsoComplete {
        session_id: String,
        ticket: StatusTicket,
    },
    /// A status query yielded no data; the session is treated as expired
    CodeExpired { session_id: String },
}

impl SsoEvent {
    /// Wire-style event name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CodeRefresh { .. } => "code-refresh",
            Self::SsoProcessing { .. } => "sso-processing",
            Self::SsoComplete { .. } => "sso-complete",
            Self::CodeExpired { .. } => "code-expired",
        }
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::CodeRefresh { session_id, .. }
            | Self::SsoProcessing { session_id, .. }
            | Self::SsoComplete { session_id, .. }
            | Self::CodeExpired { session_id } => session_id,
        }
    }

    /// `sso-complete` and `code-expired` end a polling job
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::SsoComplete { .. } | Self::CodeExpired { .. })
    }
}

/// Broadcast fan-out for [`SsoEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SsoEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SsoEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers
    ///
    /// Having no subscriber is not an error; the event is dropped.
    pub fn publish(&self, event: SsoEvent) {
        let name = event.name();
        if self.sender.send(event).is_err() {
            debug!("No subscribers for {name} event");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
