//! Telemetry notifications and the sinks that receive them.

use crate::synth::MetricSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Scenario name reported while nothing is playing.
pub const IDLE_SCENARIO_NAME: &str = "Normal Operations";

/// One notification from the playback controller.
///
/// Emitted once per tick while a mode is active, and once (with no
/// snapshot) on every transition into idle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    /// Display name of the active scenario
    pub scenario_name: String,

    /// Catalog id of the active scenario (None when idle)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario_id: Option<String>,

    /// Tick counter of the active mode
    pub elapsed_ticks: u64,

    /// Seconds into the active scenario
    pub local_elapsed: u64,

    /// Set on the terminal tick of a sequential run
    #[serde(default)]
    pub finished: bool,

    /// Synthesized metrics; None is the "no active simulation" sentinel
    pub snapshot: Option<MetricSnapshot>,
}

impl TelemetryEvent {
    /// The sentinel sent when playback returns to idle.
    pub fn idle() -> Self {
        Self {
            scenario_name: IDLE_SCENARIO_NAME.to_string(),
            scenario_id: None,
            elapsed_ticks: 0,
            local_elapsed: 0,
            finished: false,
            snapshot: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.snapshot.is_none()
    }
}

/// Consumer of telemetry events.
///
/// Sinks run synchronously on the tick path, so they must not block.
/// Consumers that can stall should sit behind a bounded channel
/// (`mpsc::Sender<TelemetryEvent>` implements this trait).
pub trait TelemetrySink: Send + 'static {
    /// Delivers one event. Returns false once the sink is gone; it is then
    /// unsubscribed.
    fn publish(&mut self, event: &TelemetryEvent) -> bool;
}

impl TelemetrySink for mpsc::Sender<TelemetryEvent> {
    fn publish(&mut self, event: &TelemetryEvent) -> bool {
        match self.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                warn!(
                    scenario = %dropped.scenario_name,
                    tick = dropped.elapsed_ticks,
                    "Telemetry subscriber lagging, event dropped"
                );
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Adapts a closure into a sink.
pub struct CallbackSink<F>(pub F);

impl<F> TelemetrySink for CallbackSink<F>
where
    F: FnMut(&TelemetryEvent) + Send + 'static,
{
    fn publish(&mut self, event: &TelemetryEvent) -> bool {
        (self.0)(event);
        true
    }
}

/// Ordered fan-out of telemetry events to the registered sinks.
///
/// The controller queues events while it holds its own lock; `deliver`
/// hands them out after that lock is released, so a sink may call back
/// into the engine. Delivery never nests: an event queued from inside a
/// sink is handed out by the delivery loop already running, after the
/// event that triggered it.
#[derive(Default)]
pub struct TelemetryBus {
    state: Mutex<BusState>,
}

#[derive(Default)]
struct BusState {
    sinks: Vec<Box<dyn TelemetrySink>>,
    queue: VecDeque<TelemetryEvent>,
    delivering: bool,
    /// Sinks taken out of `sinks` by the running delivery loop
    lent: usize,
}

impl TelemetryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a consumer. Sinks added mid-delivery start with the next
    /// `deliver` call.
    pub fn add_sink(&self, sink: impl TelemetrySink) {
        self.state().sinks.push(Box::new(sink));
    }

    pub fn sink_count(&self) -> usize {
        let state = self.state();
        state.sinks.len() + state.lent
    }

    /// Events queued but not yet delivered.
    pub fn pending(&self) -> usize {
        self.state().queue.len()
    }

    pub fn enqueue(&self, event: TelemetryEvent) {
        self.state().queue.push_back(event);
    }

    /// Publishes every queued event, in order, to every sink.
    ///
    /// No lock is held while a sink runs. Returns immediately if another
    /// delivery loop is already draining the queue.
    pub fn deliver(&self) {
        let (mut sinks, mut event) = {
            let mut state = self.state();
            if state.delivering {
                return;
            }
            let Some(event) = state.queue.pop_front() else {
                return;
            };
            state.delivering = true;
            let sinks = std::mem::take(&mut state.sinks);
            state.lent = sinks.len();
            (sinks, event)
        };

        loop {
            let before = sinks.len();
            sinks.retain_mut(|sink| sink.publish(&event));
            if sinks.len() < before {
                debug!("{} telemetry sink(s) closed", before - sinks.len());
            }

            let mut state = self.state();
            match state.queue.pop_front() {
                Some(next) => {
                    state.lent = sinks.len();
                    event = next;
                }
                None => {
                    sinks.append(&mut state.sinks);
                    state.sinks = sinks;
                    state.lent = 0;
                    state.delivering = false;
                    return;
                }
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_idle_sentinel() {
        let idle = TelemetryEvent::idle();
        assert!(idle.is_idle());
        assert_eq!(idle.scenario_name, "Normal Operations");
    }

    #[test]
    fn test_channel_sink_drops_when_full() {
        let (mut tx, mut rx) = mpsc::channel::<TelemetryEvent>(1);

        assert!(tx.publish(&TelemetryEvent::idle()));
        // Full: event dropped, sink kept
        assert!(tx.publish(&TelemetryEvent::idle()));

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_reports_closed() {
        let (mut tx, rx) = mpsc::channel::<TelemetryEvent>(4);
        drop(rx);

        assert!(!tx.publish(&TelemetryEvent::idle()));
    }

    #[test]
    fn test_callback_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let mut sink = CallbackSink(move |e: &TelemetryEvent| {
            log.lock().unwrap().push(e.scenario_name.clone())
        });

        assert!(sink.publish(&TelemetryEvent::idle()));
        assert_eq!(*seen.lock().unwrap(), vec!["Normal Operations".to_string()]);
    }

    #[test]
    fn test_bus_delivers_in_order_after_enqueue() {
        let bus = TelemetryBus::new();
        let (tx, mut rx) = mpsc::channel::<TelemetryEvent>(8);
        bus.add_sink(tx);

        for tick in 1..=3 {
            bus.enqueue(TelemetryEvent { elapsed_ticks: tick, ..TelemetryEvent::idle() });
        }
        assert!(rx.try_recv().is_err());
        assert_eq!(bus.pending(), 3);

        bus.deliver();

        let ticks: Vec<u64> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.elapsed_ticks)
            .collect();
        assert_eq!(ticks, vec![1, 2, 3]);
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn test_bus_sink_can_enqueue_during_delivery() {
        let bus = Arc::new(TelemetryBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&seen);
        let inner = Arc::clone(&bus);
        bus.add_sink(CallbackSink(move |e: &TelemetryEvent| {
            log.lock().unwrap().push(e.elapsed_ticks);
            if e.elapsed_ticks == 1 {
                inner.enqueue(TelemetryEvent::idle());
                // Nested call returns at once; the outer loop picks it up
                inner.deliver();
                inner.add_sink(CallbackSink(|_: &TelemetryEvent| {}));
            }
        }));

        bus.enqueue(TelemetryEvent { elapsed_ticks: 1, ..TelemetryEvent::idle() });
        bus.deliver();

        assert_eq!(*seen.lock().unwrap(), vec![1, 0]);
        assert_eq!(bus.sink_count(), 2);
    }

    #[test]
    fn test_bus_drops_closed_sink() {
        let bus = TelemetryBus::new();
        let (tx, rx) = mpsc::channel::<TelemetryEvent>(1);
        bus.add_sink(tx);
        drop(rx);

        bus.enqueue(TelemetryEvent::idle());
        bus.deliver();

        assert_eq!(bus.sink_count(), 0);
    }

    #[test]
    fn test_idle_event_json_shape() {
        let json = serde_json::to_value(TelemetryEvent::idle()).unwrap();

        assert_eq!(json["scenarioName"], "Normal Operations");
        assert!(json["snapshot"].is_null());
        assert!(json.get("scenarioId").is_none());
    }
}
