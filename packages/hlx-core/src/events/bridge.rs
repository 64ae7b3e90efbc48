//! Bridge implementation that maps controller events to broadcast fan-out.
//!
//! The [`BroadcastBridge`] lives at the boundary between the controllers
//! and their observers, forwarding typed events to a
//! `tokio::sync::broadcast` channel that observers subscribe to.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::error::ProtocolError;

use super::sink::EventSink;
use super::{ConnectionEvent, Event, RefreshEvent, StateChange};

/// Bridges controller events to a broadcast channel.
///
/// An optional external sink can be attached after construction for
/// embedders that want synchronous delivery in addition to the channel
/// (the proxy uses this to mirror upstream notifications downstream).
///
/// # Thread Safety
///
/// The bridge is `Send + Sync` and can be shared across async tasks.
#[derive(Clone)]
pub struct BroadcastBridge {
    tx: broadcast::Sender<Event>,
    /// Optional external sink for synchronous delivery.
    external_sink: Arc<RwLock<Option<Arc<dyn EventSink>>>>,
}

impl BroadcastBridge {
    /// Creates a new bridge with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            external_sink: Arc::new(RwLock::new(None)),
        }
    }

    /// Attaches an external sink for synchronous delivery.
    ///
    /// Can be called after construction, which is useful when the consumer
    /// isn't built until the controllers are already wired.
    pub fn set_external_sink(&self, sink: Arc<dyn EventSink>) {
        *self.external_sink.write() = Some(sink);
    }

    /// Returns a new receiver for the broadcast channel.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Returns a reference to the broadcast sender.
    #[must_use]
    pub fn sender(&self) -> &broadcast::Sender<Event> {
        &self.tx
    }

    fn forward(&self, event: Event) {
        if let Err(e) = self.tx.send(event) {
            log::trace!("[EventBridge] No broadcast receivers: {}", e);
        }
    }
}

impl EventSink for BroadcastBridge {
    fn state_changed(&self, change: StateChange) {
        if let Some(ref sink) = *self.external_sink.read() {
            sink.state_changed(change.clone());
        }
        self.forward(Event::State(change));
    }

    fn connection_event(&self, event: ConnectionEvent) {
        if let Some(ref sink) = *self.external_sink.read() {
            sink.connection_event(event.clone());
        }
        self.forward(Event::Connection(event));
    }

    fn refresh_event(&self, event: RefreshEvent) {
        if let Some(ref sink) = *self.external_sink.read() {
            sink.refresh_event(event);
        }
        self.forward(Event::Refresh(event));
    }

    fn protocol_error(&self, error: ProtocolError) {
        if let Some(ref sink) = *self.external_sink.read() {
            sink.protocol_error(error.clone());
        }
        self.forward(Event::Protocol(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::ZoneId;

    #[test]
    fn subscribers_receive_forwarded_events() {
        let bridge = BroadcastBridge::new(16);
        let mut rx = bridge.subscribe();

        bridge.state_changed(StateChange::ZoneVolume {
            zone: ZoneId::new(3).unwrap(),
            level: -25,
        });
        bridge.refresh_event(RefreshEvent::Refreshed);

        assert!(matches!(
            rx.try_recv().unwrap(),
            Event::State(StateChange::ZoneVolume { level: -25, .. })
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            Event::Refresh(RefreshEvent::Refreshed)
        ));
    }

    #[test]
    fn emitting_without_subscribers_is_harmless() {
        let bridge = BroadcastBridge::new(4);
        bridge.state_changed(StateChange::ConfigurationSaved);
    }
}
