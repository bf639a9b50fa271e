//! Analytics event sinks.
//!
//! A sink is the backend side of the tagger: it receives every envelope the
//! tagger emits and decides what to do with it. Sinks own their own
//! synchronization and must be shareable across threads.

use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;

use crate::error::{AnalyticsError, Result};
use crate::event::Envelope;

/// Default capacity of a [`BroadcastSink`] channel.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Destination for tagged analytics events.
pub trait EventSink: Send + Sync {
    /// Record a single envelope.
    fn record(&self, envelope: &Envelope) -> Result<()>;

    /// Flush any buffered events.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn record(&self, envelope: &Envelope) -> Result<()> {
        (**self).record(envelope)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }
}

/// In-memory sink that keeps every envelope it receives.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: RwLock<Vec<Envelope>>,
}

impl MemorySink {
    /// Creates an empty memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded envelopes, in arrival order.
    pub fn events(&self) -> Result<Vec<Envelope>> {
        let events = self
            .events
            .read()
            .map_err(|_| AnalyticsError::LockPoisoned("memory sink"))?;
        Ok(events.clone())
    }

    /// Returns the number of recorded envelopes.
    pub fn len(&self) -> Result<usize> {
        let events = self
            .events
            .read()
            .map_err(|_| AnalyticsError::LockPoisoned("memory sink"))?;
        Ok(events.len())
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Drops all recorded envelopes.
    pub fn clear(&self) -> Result<()> {
        let mut events = self
            .events
            .write()
            .map_err(|_| AnalyticsError::LockPoisoned("memory sink"))?;
        events.clear();
        Ok(())
    }
}

impl EventSink for MemorySink {
    fn record(&self, envelope: &Envelope) -> Result<()> {
        let mut events = self
            .events
            .write()
            .map_err(|_| AnalyticsError::LockPoisoned("memory sink"))?;
        events.push(envelope.clone());
        Ok(())
    }
}

/// Sink that writes each event to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, envelope: &Envelope) -> Result<()> {
        let attributes = serde_json::to_string(&envelope.event.attributes())?;
        tracing::info!(
            event = envelope.name(),
            sequence = envelope.sequence,
            id = %envelope.id,
            attributes = %attributes,
            "Tagged analytics event"
        );
        Ok(())
    }
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _envelope: &Envelope) -> Result<()> {
        Ok(())
    }
}

/// Sink that publishes envelopes to in-process subscribers.
///
/// Publishing with no live subscriber is not an error; the event is simply
/// not observed by anyone.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<Envelope>,
}

impl BroadcastSink {
    /// Creates a broadcast sink with the given channel capacity.
    ///
    /// A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to envelopes published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    /// Returns the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }
}

impl EventSink for BroadcastSink {
    fn record(&self, envelope: &Envelope) -> Result<()> {
        if self.tx.send(envelope.clone()).is_err() {
            tracing::trace!("No subscribers for analytics event {}", envelope.name());
        }
        Ok(())
    }
}

/// Sink that forwards to several sinks.
///
/// Every sink sees every event even when an earlier one fails; the first
/// error is reported.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    /// Creates an empty fan-out sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink to the fan-out.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Returns the number of attached sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns true if no sink is attached.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutSink {
    fn record(&self, envelope: &Envelope) -> Result<()> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.record(envelope) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn flush(&self) -> Result<()> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.flush() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    struct FailingSink;

    impl EventSink for FailingSink {
        fn record(&self, _envelope: &Envelope) -> Result<()> {
            Err(AnalyticsError::SinkWrite("backend unavailable".to_string()))
        }
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty().unwrap());

        sink.record(&Envelope::new(1, Event::DeleteDevice)).unwrap();
        sink.record(&Envelope::new(2, Event::SelfDeviceList)).unwrap();

        let events = sink.events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, Event::DeleteDevice);
        assert_eq!(events[1].event, Event::SelfDeviceList);
    }

    #[test]
    fn test_memory_sink_clear() {
        let sink = MemorySink::new();
        sink.record(&Envelope::new(1, Event::OtherDeviceList)).unwrap();
        assert_eq!(sink.len().unwrap(), 1);

        sink.clear().unwrap();
        assert!(sink.is_empty().unwrap());
    }

    #[test]
    fn test_arc_sink_forwards() {
        let sink = Arc::new(MemorySink::new());
        let shared: Arc<dyn EventSink> = sink.clone();
        shared
            .record(&Envelope::new(1, Event::ConversationIsVerified))
            .unwrap();
        assert_eq!(sink.len().unwrap(), 1);
    }

    #[test]
    fn test_tracing_and_null_sinks_accept_events() {
        let envelope = Envelope::new(1, Event::DeleteDevice);
        assert!(TracingSink.record(&envelope).is_ok());
        assert!(NullSink.record(&envelope).is_ok());
        assert!(NullSink.flush().is_ok());
    }

    #[test]
    fn test_broadcast_sink_without_subscribers() {
        let sink = BroadcastSink::default();
        assert_eq!(sink.subscriber_count(), 0);
        assert!(sink.record(&Envelope::new(1, Event::DeleteDevice)).is_ok());
    }

    #[test]
    fn test_broadcast_sink_zero_capacity() {
        let sink = BroadcastSink::new(0);
        let mut rx = sink.subscribe();

        let envelope = Envelope::new(1, Event::SelfDeviceList);
        sink.record(&envelope).unwrap();

        assert_eq!(rx.try_recv().unwrap(), envelope);
    }

    #[tokio::test]
    async fn test_broadcast_sink_delivers_to_subscriber() {
        let sink = BroadcastSink::new(8);
        let mut rx = sink.subscribe();

        let envelope = Envelope::new(1, Event::OtherDeviceList);
        sink.record(&envelope).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received, envelope);
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let first = Arc::new(MemorySink::new());
        let second = Arc::new(MemorySink::new());
        let fanout = FanoutSink::new()
            .with_sink(first.clone())
            .with_sink(second.clone());
        assert_eq!(fanout.len(), 2);

        fanout.record(&Envelope::new(1, Event::DeleteDevice)).unwrap();

        assert_eq!(first.len().unwrap(), 1);
        assert_eq!(second.len().unwrap(), 1);
    }

    #[test]
    fn test_fanout_continues_after_failure() {
        let survivor = Arc::new(MemorySink::new());
        let fanout = FanoutSink::new()
            .with_sink(Arc::new(FailingSink))
            .with_sink(survivor.clone());

        let result = fanout.record(&Envelope::new(1, Event::DeleteDevice));

        assert!(matches!(result, Err(AnalyticsError::SinkWrite(_))));
        assert_eq!(survivor.len().unwrap(), 1);
    }

    #[test]
    fn test_empty_fanout_is_ok() {
        let fanout = FanoutSink::new();
        assert!(fanout.is_empty());
        assert!(fanout.record(&Envelope::new(1, Event::DeleteDevice)).is_ok());
    }
}
