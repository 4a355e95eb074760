//! The Parameter Bus (C6, spec §4.6): typed pub/sub connecting the
//! Scheduler to the dashboard, OSC bridge, and any other subscriber. Built
//! on the grounding repository's `Hub` (`Arc<RwLock<HashMap<Uuid, _>>>` plus
//! broadcast-to-all), but replacing the hub's unbounded `mpsc` with a
//! bounded, drop-newest queue per subscriber (§5: "bounded channel; default
//! queue size 64 per subscriber, drop-newest on overflow").

use aggregator_core::Counters;
use aggregator_types::{ConsensusResult, ConsensusSnapshot, InputRejection, PerformerOverride};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Every event kind the bus carries (§4.6).
#[derive(Debug, Clone)]
pub enum BusEvent {
    ConsensusUpdate(ConsensusResult),
    ConsensusSnapshot(ConsensusSnapshot),
    ParticipantJoin { session_id: Uuid, at: u64 },
    ParticipantLeave { session_id: Uuid, at: u64 },
    OverrideSet { parameter: String, override_: PerformerOverride },
    OverrideCleared { parameter: String, at: u64 },
    InputAccepted { session_id: Uuid, parameter: String, at: u64 },
    InputRejected { session_id: Option<Uuid>, parameter: Option<String>, reason: InputRejection, at: u64 },
}

pub type BusReceiver = mpsc::Receiver<BusEvent>;

/// The bus. One instance per performance, shared (via `Arc`) by the
/// Scheduler (publisher), the Session Registry (publisher), and every
/// subscriber (dashboard WebSocket handlers, the OSC bridge).
pub struct ParameterBus {
    subscribers: RwLock<HashMap<Uuid, mpsc::Sender<BusEvent>>>,
    last_snapshot: RwLock<Option<ConsensusSnapshot>>,
    queue_size: usize,
    counters: Arc<Counters>,
}

impl ParameterBus {
    pub fn new(queue_size: usize, counters: Arc<Counters>) -> Self {
        Self { subscribers: RwLock::new(HashMap::new()), last_snapshot: RwLock::new(None), queue_size, counters }
    }

    /// Registers a new subscriber and immediately delivers the last
    /// published snapshot, if any (P8: "subscribing late yields exactly
    /// that result as the last snapshot").
    pub fn subscribe(&self) -> (Uuid, BusReceiver) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.queue_size);
        if let Some(snapshot) = self.last_snapshot.read().clone() {
            // Best-effort: a brand new, empty channel will not be full.
            let _ = tx.try_send(BusEvent::ConsensusSnapshot(snapshot));
        }
        self.subscribers.write().insert(id, tx);
        (id, rx)
    }

    pub fn unsubscribe(&self, id: Uuid) {
        self.subscribers.write().remove(&id);
    }

    /// Publishes `event` to every current subscriber. Never blocks: a full
    /// subscriber queue drops the new event (not the oldest) and increments
    /// the subscriber-drop counter (§5, §4.8). One slow or dead subscriber
    /// never holds up another.
    pub fn publish(&self, event: BusEvent) {
        let subscribers = self.subscribers.read();
        for tx in subscribers.values() {
            if tx.try_send(event.clone()).is_err() {
                self.counters.subscriber_drops.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Publishes a whole-tick snapshot and retains it as the "last
    /// snapshot" for future subscribers.
    pub fn publish_snapshot(&self, snapshot: ConsensusSnapshot) {
        *self.last_snapshot.write() = Some(snapshot.clone());
        self.publish(BusEvent::ConsensusSnapshot(snapshot));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggregator_types::ConsensusMode;

    fn snapshot(timestamp: u64) -> ConsensusSnapshot {
        let mut snap = ConsensusSnapshot::new(timestamp);
        snap.insert(ConsensusResult {
            parameter: "mood".into(),
            value: 0.5,
            confidence: 1.0,
            input_count: 1,
            timestamp,
            mode: ConsensusMode::WeightedAverage,
            raw_mean: 0.5,
            weighted_mean: 0.5,
            std_dev: 0.0,
            participation_rate: 1.0,
            bimodality: false,
            entropy: None,
        });
        snap
    }

    #[tokio::test]
    async fn late_subscriber_receives_last_snapshot() {
        let bus = ParameterBus::new(8, Arc::new(Counters::default()));
        bus.publish_snapshot(snapshot(100));
        let (_id, mut rx) = bus.subscribe();
        let event = rx.recv().await.unwrap();
        match event {
            BusEvent::ConsensusSnapshot(s) => assert_eq!(s.timestamp, 100),
            _ => panic!("expected a snapshot"),
        }
    }

    #[tokio::test]
    async fn overflow_drops_newest_and_counts_it() {
        let counters = Arc::new(Counters::default());
        let bus = ParameterBus::new(1, counters.clone());
        let (_id, mut rx) = bus.subscribe();
        bus.publish(BusEvent::ParticipantJoin { session_id: Uuid::new_v4(), at: 1 });
        bus.publish(BusEvent::ParticipantJoin { session_id: Uuid::new_v4(), at: 2 });
        assert_eq!(counters.subscriber_drops.load(Ordering::Relaxed), 1);
        let first = rx.recv().await.unwrap();
        match first {
            BusEvent::ParticipantJoin { at, .. } => assert_eq!(at, 1),
            _ => panic!("expected a join event"),
        }
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = ParameterBus::new(8, Arc::new(Counters::default()));
        let (id, mut rx) = bus.subscribe();
        bus.unsubscribe(id);
        bus.publish(BusEvent::OverrideCleared { parameter: "mood".into(), at: 0 });
        assert!(rx.try_recv().is_err());
    }
}
