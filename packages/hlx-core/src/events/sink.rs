//! Event sink abstraction for decoupling controllers from transport.
//!
//! Controllers depend on the [`EventSink`] trait rather than concrete
//! broadcast channels, enabling testing and alternative delivery paths.
//! Delivery is synchronous on the emitting context; a sink that needs to
//! do real work should hand off, not block.

use crate::error::ProtocolError;

use super::{ConnectionEvent, RefreshEvent, StateChange};

/// Trait for emitting controller events without knowledge of transport.
pub trait EventSink: Send + Sync {
    /// Emits a state-change notification.
    fn state_changed(&self, change: StateChange);

    /// Emits a connection lifecycle event.
    fn connection_event(&self, event: ConnectionEvent);

    /// Emits refresh progress or completion.
    fn refresh_event(&self, event: RefreshEvent);

    /// Emits a protocol fault notification.
    fn protocol_error(&self, error: ProtocolError);
}

/// No-op sink for headless use or testing.
///
/// Events are silently discarded.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn state_changed(&self, _change: StateChange) {
        // No-op
    }

    fn connection_event(&self, _event: ConnectionEvent) {
        // No-op
    }

    fn refresh_event(&self, _event: RefreshEvent) {
        // No-op
    }

    fn protocol_error(&self, _error: ProtocolError) {
        // No-op
    }
}

/// Logging sink for debugging and development.
///
/// Logs all events at debug level.
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn state_changed(&self, change: StateChange) {
        tracing::debug!(?change, "state_change");
    }

    fn connection_event(&self, event: ConnectionEvent) {
        tracing::debug!(?event, "connection_event");
    }

    fn refresh_event(&self, event: RefreshEvent) {
        tracing::debug!(?event, "refresh_event");
    }

    fn protocol_error(&self, error: ProtocolError) {
        tracing::debug!(%error, "protocol_error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::model::ids::ZoneId;

    /// Test sink that counts events.
    pub(crate) struct CountingEventSink {
        state_count: AtomicUsize,
        refresh_count: AtomicUsize,
    }

    impl CountingEventSink {
        fn new() -> Self {
            Self {
                state_count: AtomicUsize::new(0),
                refresh_count: AtomicUsize::new(0),
            }
        }
    }

    impl EventSink for CountingEventSink {
        fn state_changed(&self, _change: StateChange) {
            self.state_count.fetch_add(1, Ordering::SeqCst);
        }

        fn connection_event(&self, _event: ConnectionEvent) {}

        fn refresh_event(&self, _event: RefreshEvent) {
            self.refresh_count.fetch_add(1, Ordering::SeqCst);
        }

        fn protocol_error(&self, _error: ProtocolError) {}
    }

    #[test]
    fn counting_sink_tracks_events() {
        let sink = Arc::new(CountingEventSink::new());

        sink.state_changed(StateChange::ZoneMute {
            zone: ZoneId::new(1).unwrap(),
            mute: true,
        });
        sink.state_changed(StateChange::ConfigurationSaved);
        sink.refresh_event(RefreshEvent::Refreshed);

        assert_eq!(sink.state_count.load(Ordering::SeqCst), 2);
        assert_eq!(sink.refresh_count.load(Ordering::SeqCst), 1);
    }
}
