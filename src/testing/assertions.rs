//! Custom assertion helpers for event streams

use crate::events::SsoEvent;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Receive the next event, failing the test if none arrives within `within`
///
/// # Panics
///
/// Panics if the channel is closed, lagged, or stays empty past the deadline.
pub async fn next_event(rx: &mut broadcast::Receiver<SsoEvent>, within: Duration) -> SsoEvent {
    match tokio::time::timeout(within, rx.recv()).await {
        Ok(Ok(event)) => event,
        Ok(Err(e)) => panic!("event channel failed: {e}"),
        Err(_) => panic!("no event within {within:?}"),
    }
}

/// Collect the names of events received until `window` elapses
pub async fn collect_event_names(
    rx: &mut broadcast::Receiver<SsoEvent>,
    window: Duration,
) -> Vec<&'static str> {
    collect_events(rx, window)
        .await
        .iter()
        .map(SsoEvent::name)
        .collect()
}

/// Collect every event received until `window` elapses
pub async fn collect_events(
    rx: &mut broadcast::Receiver<SsoEvent>,
    window: Duration,
) -> Vec<SsoEvent> {
    let mut events = Vec::new();
    let deadline = tokio::time::Instant::now() + window;
    while let Ok(Ok(event)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        events.push(event);
    }
    events
}

/// Assert that nothing is waiting in the channel
///
/// # Panics
///
/// Panics if an event is pending.
pub fn assert_no_pending_events(rx: &mut broadcast::Receiver<SsoEvent>) {
    match rx.try_recv() {
        Err(TryRecvError::Empty) => {}
        Ok(event) => panic!("Expected no pending events, got {event:?}"),
        Err(e) => panic!("Expected an open, empty channel, got {e}"),
    }
}

/// Assert that exactly one terminal event is present and it is the last one
///
/// # Panics
///
/// Panics if there is no terminal event, more than one, or events follow it.
pub fn assert_single_terminal_last(events: &[SsoEvent]) {
    let terminal: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_terminal())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(terminal.len(), 1, "Expected exactly one terminal event in {events:?}");
    assert_eq!(terminal[0], events.len() - 1, "Events follow the terminal event in {events:?}");
}
