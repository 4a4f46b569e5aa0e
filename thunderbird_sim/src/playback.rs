//! Playback controller - the Idle / Sequential / Single state machine.
//!
//! The controller owns the only tick counter. Sequential and single play
//! are variants of one enum, so two counters can never advance at once:
//! entering one mode replaces the other.

use crate::error::EngineError;
use crate::scenarios::{ScenarioCatalog, ScenarioDefinition, ScenarioStatus};
use crate::sink::{TelemetryBus, TelemetryEvent, TelemetrySink, IDLE_SCENARIO_NAME};
use crate::synth;
use crate::timeline;
use std::sync::Arc;
use thunderbird_env::RandomSource;
use tracing::{debug, info};

/// Playback state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Nothing playing
    #[default]
    Idle,

    /// Walking the whole catalog back to back
    SequentialPlay { elapsed_ticks: u64 },

    /// Looping one scenario indefinitely
    SinglePlay { scenario_id: String, elapsed_ticks: u64 },
}

impl PlaybackState {
    pub fn elapsed_ticks(&self) -> u64 {
        match self {
            PlaybackState::Idle => 0,
            PlaybackState::SequentialPlay { elapsed_ticks }
            | PlaybackState::SinglePlay { elapsed_ticks, .. } => *elapsed_ticks,
        }
    }

    pub fn mode(&self) -> Option<PlayMode> {
        match self {
            PlaybackState::Idle => None,
            PlaybackState::SequentialPlay { .. } => Some(PlayMode::Sequential),
            PlaybackState::SinglePlay { scenario_id, .. } => {
                Some(PlayMode::Single(scenario_id.clone()))
            }
        }
    }
}

/// What to start playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayMode {
    Sequential,
    Single(String),
}

impl std::fmt::Display for PlayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayMode::Sequential => write!(f, "sequential"),
            PlayMode::Single(id) => write!(f, "single:{}", id),
        }
    }
}

impl std::str::FromStr for PlayMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" | "all" | "scenario" => Ok(PlayMode::Sequential),
            _ => Ok(PlayMode::Single(s.to_string())),
        }
    }
}

/// Drives playback and emits one telemetry event per tick.
///
/// Events are queued on the controller's [`TelemetryBus`]; sinks see them
/// once the owner calls [`TelemetryBus::deliver`], normally after releasing
/// whatever lock guards the controller.
pub struct PlaybackController<R> {
    catalog: Arc<ScenarioCatalog>,
    rng: Arc<R>,
    state: PlaybackState,
    telemetry: Arc<TelemetryBus>,
}

impl<R: RandomSource> PlaybackController<R> {
    /// Creates an idle controller.
    pub fn new(catalog: Arc<ScenarioCatalog>, rng: Arc<R>) -> Self {
        Self {
            catalog,
            rng,
            state: PlaybackState::Idle,
            telemetry: Arc::new(TelemetryBus::new()),
        }
    }

    /// Registers a consumer for telemetry events.
    pub fn add_sink(&self, sink: impl TelemetrySink) {
        self.telemetry.add_sink(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.telemetry.sink_count()
    }

    /// Queue the controller's events go to.
    pub fn telemetry(&self) -> &Arc<TelemetryBus> {
        &self.telemetry
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn catalog(&self) -> &Arc<ScenarioCatalog> {
        &self.catalog
    }

    pub fn is_idle(&self) -> bool {
        self.state == PlaybackState::Idle
    }

    pub fn elapsed_ticks(&self) -> u64 {
        self.state.elapsed_ticks()
    }

    /// True once a sequential run has played its terminal tick.
    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            PlaybackState::SequentialPlay { elapsed_ticks }
                if elapsed_ticks >= self.catalog.total_duration()
        )
    }

    /// Whether the tick clock should be running.
    pub fn needs_clock(&self) -> bool {
        !self.is_idle() && !self.is_finished()
    }

    /// Scenario currently playing, if any.
    pub fn active_scenario(&self) -> Option<&ScenarioDefinition> {
        match &self.state {
            PlaybackState::Idle => None,
            PlaybackState::SequentialPlay { elapsed_ticks } => {
                Some(timeline::resolve(&self.catalog, *elapsed_ticks).scenario)
            }
            PlaybackState::SinglePlay { scenario_id, .. } => self.catalog.get(scenario_id).ok(),
        }
    }

    /// Display name of what is playing; the idle name when nothing is.
    pub fn active_scenario_name(&self) -> &str {
        self.active_scenario()
            .map(|s| s.name.as_str())
            .unwrap_or(IDLE_SCENARIO_NAME)
    }

    /// Seconds into the active scenario.
    pub fn local_elapsed(&self) -> u64 {
        match &self.state {
            PlaybackState::Idle => 0,
            PlaybackState::SequentialPlay { elapsed_ticks } => {
                timeline::resolve(&self.catalog, *elapsed_ticks).local_elapsed
            }
            PlaybackState::SinglePlay { elapsed_ticks, .. } => *elapsed_ticks,
        }
    }

    /// Per-scenario status for a progress list.
    pub fn progress(&self) -> Vec<(&ScenarioDefinition, ScenarioStatus)> {
        match self.state {
            PlaybackState::SequentialPlay { elapsed_ticks } => {
                self.catalog.progress(elapsed_ticks, true)
            }
            _ => self.catalog.progress(0, false),
        }
    }

    /// Starts (or restarts) sequential playback from the first scenario.
    pub fn start_sequential(&mut self) {
        if let PlaybackState::SinglePlay { scenario_id, .. } = &self.state {
            info!("Stopping single play of {} before sequential run", scenario_id);
        }
        self.state = PlaybackState::SequentialPlay { elapsed_ticks: 0 };
        info!(
            "Sequential playback started ({} scenarios, {}s)",
            self.catalog.len(),
            self.catalog.total_duration()
        );
    }

    /// Stops sequential playback. No-op unless sequential is what is playing.
    pub fn stop_sequential(&mut self) {
        if matches!(self.state, PlaybackState::SequentialPlay { .. }) {
            self.enter_idle();
        } else {
            debug!("stop_sequential ignored: sequential playback not active");
        }
    }

    /// Loops a single scenario. Replaces any active sequential run.
    pub fn start_single(&mut self, scenario_id: &str) -> Result<(), EngineError> {
        let scenario = self.catalog.get(scenario_id)?;
        info!("Single play started: {} ({})", scenario.name, scenario.id);

        if let PlaybackState::SequentialPlay { elapsed_ticks } = self.state {
            info!("Sequential run replaced at tick {}", elapsed_ticks);
        }
        self.state = PlaybackState::SinglePlay {
            scenario_id: scenario_id.to_string(),
            elapsed_ticks: 0,
        };
        Ok(())
    }

    /// Stops `scenario_id` if it is the one looping, otherwise starts it.
    pub fn toggle_single(&mut self, scenario_id: &str) -> Result<(), EngineError> {
        match &self.state {
            PlaybackState::SinglePlay { scenario_id: active, .. } if active == scenario_id => {
                self.enter_idle();
                Ok(())
            }
            _ => self.start_single(scenario_id),
        }
    }

    /// Stops whatever is playing. No-op when already idle.
    pub fn stop(&mut self) {
        if !self.is_idle() {
            self.enter_idle();
        }
    }

    /// Advances the active counter by one and queues a snapshot.
    ///
    /// Returns None while idle and once a sequential run has finished.
    pub fn tick(&mut self) -> Option<TelemetryEvent> {
        let event = match &mut self.state {
            PlaybackState::Idle => return None,
            PlaybackState::SequentialPlay { elapsed_ticks } => {
                if *elapsed_ticks >= self.catalog.total_duration() {
                    return None;
                }
                *elapsed_ticks += 1;

                let r = timeline::resolve(&self.catalog, *elapsed_ticks);
                if r.finished {
                    info!("Sequential timeline complete after {} ticks", elapsed_ticks);
                }
                TelemetryEvent {
                    scenario_name: r.scenario.name.clone(),
                    scenario_id: Some(r.scenario.id.clone()),
                    elapsed_ticks: *elapsed_ticks,
                    local_elapsed: r.local_elapsed,
                    finished: r.finished,
                    snapshot: Some(synth::synthesize(
                        &r.scenario.id,
                        r.local_elapsed,
                        self.rng.as_ref(),
                    )),
                }
            }
            PlaybackState::SinglePlay { scenario_id, elapsed_ticks } => {
                *elapsed_ticks += 1;

                let scenario_name = self
                    .catalog
                    .get(scenario_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|_| scenario_id.clone());
                TelemetryEvent {
                    scenario_name,
                    scenario_id: Some(scenario_id.clone()),
                    elapsed_ticks: *elapsed_ticks,
                    local_elapsed: *elapsed_ticks,
                    finished: false,
                    snapshot: Some(synth::synthesize(
                        scenario_id,
                        *elapsed_ticks,
                        self.rng.as_ref(),
                    )),
                }
            }
        };

        debug!(
            scenario = %event.scenario_name,
            tick = event.elapsed_ticks,
            local = event.local_elapsed,
            "tick"
        );
        self.telemetry.enqueue(event.clone());
        Some(event)
    }

    fn enter_idle(&mut self) {
        info!("Playback stopped at tick {}", self.state.elapsed_ticks());
        self.state = PlaybackState::Idle;
        self.telemetry.enqueue(TelemetryEvent::idle());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimContext;
    use tokio::sync::mpsc;

    fn controller() -> (PlaybackController<SimContext>, mpsc::Receiver<TelemetryEvent>) {
        let ctl = PlaybackController::new(
            Arc::new(ScenarioCatalog::default()),
            SimContext::shared(42),
        );
        let (tx, rx) = mpsc::channel(256);
        ctl.add_sink(tx);
        (ctl, rx)
    }

    fn drain(
        ctl: &PlaybackController<SimContext>,
        rx: &mut mpsc::Receiver<TelemetryEvent>,
    ) -> Vec<TelemetryEvent> {
        ctl.telemetry().deliver();
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        events
    }

    #[test]
    fn test_starts_idle() {
        let (mut ctl, mut rx) = controller();

        assert!(ctl.is_idle());
        assert_eq!(ctl.elapsed_ticks(), 0);
        assert_eq!(ctl.active_scenario_name(), "Normal Operations");
        assert!(ctl.tick().is_none());
        assert!(drain(&ctl, &mut rx).is_empty());
    }

    #[test]
    fn test_sequential_ticks_through_boundary() {
        let (mut ctl, mut rx) = controller();
        ctl.start_sequential();

        for _ in 0..20 {
            ctl.tick();
        }
        let events = drain(&ctl, &mut rx);
        assert_eq!(events.len(), 20);
        assert_eq!(events[0].elapsed_ticks, 1);
        assert_eq!(events[0].scenario_id.as_deref(), Some("normal"));
        assert_eq!(events[0].local_elapsed, 1);
        assert_eq!(events[18].scenario_id.as_deref(), Some("normal"));
        assert_eq!(events[18].local_elapsed, 19);

        // Tick 20 lands on the boundary: next scenario, local 0
        let boundary = &events[19];
        assert_eq!(boundary.scenario_id.as_deref(), Some("hacker_attempt"));
        assert_eq!(boundary.scenario_name, "Hacker Attempt");
        assert_eq!(boundary.local_elapsed, 0);
        assert!(boundary.snapshot.is_some());
    }

    #[test]
    fn test_sequential_freezes_at_end() {
        let (mut ctl, mut rx) = controller();
        ctl.start_sequential();

        for _ in 0..112 {
            assert!(ctl.tick().is_some());
        }
        assert!(ctl.is_finished());
        assert!(!ctl.needs_clock());

        let events = drain(&ctl, &mut rx);
        let last = events.last().unwrap();
        assert!(last.finished);
        assert_eq!(last.scenario_id.as_deref(), Some("network_overload"));
        assert_eq!(last.local_elapsed, 20);
        assert!(events[..111].iter().all(|e| !e.finished));

        // Frozen: no further progress or output until restarted
        assert!(ctl.tick().is_none());
        assert_eq!(ctl.elapsed_ticks(), 112);
        assert!(drain(&ctl, &mut rx).is_empty());

        ctl.start_sequential();
        assert_eq!(ctl.elapsed_ticks(), 0);
        assert!(ctl.needs_clock());
    }

    #[test]
    fn test_single_play_loops_indefinitely() {
        let (mut ctl, mut rx) = controller();
        ctl.start_single("satellite_failure").unwrap();

        for _ in 0..200 {
            ctl.tick();
        }
        let events = drain(&ctl, &mut rx);
        assert_eq!(events.len(), 200);
        assert!(events.iter().all(|e| e.scenario_name == "Satellite Failure"));
        assert_eq!(events[199].local_elapsed, 200);
        assert_eq!(ctl.local_elapsed(), 200);
        assert!(ctl.needs_clock());
    }

    #[test]
    fn test_unknown_scenario_leaves_state_unchanged() {
        let (mut ctl, mut rx) = controller();
        ctl.start_sequential();
        ctl.tick();

        let before = ctl.state().clone();
        assert_eq!(
            ctl.start_single("black_hole"),
            Err(EngineError::UnknownScenario("black_hole".to_string()))
        );
        assert_eq!(ctl.toggle_single("black_hole").unwrap_err(), EngineError::unknown("black_hole"));
        assert_eq!(ctl.state(), &before);

        drain(&ctl, &mut rx);
        ctl.tick();
        assert_eq!(drain(&ctl, &mut rx)[0].elapsed_ticks, 2);
    }

    #[test]
    fn test_start_sequential_replaces_single() {
        let (mut ctl, mut rx) = controller();
        ctl.start_single("hacker_attempt").unwrap();
        for _ in 0..3 {
            ctl.tick();
        }

        ctl.start_sequential();
        drain(&ctl, &mut rx);
        for _ in 0..2 {
            ctl.tick();
        }

        assert_eq!(ctl.state(), &PlaybackState::SequentialPlay { elapsed_ticks: 2 });
        let events = drain(&ctl, &mut rx);
        assert_eq!(events.len(), 2);
        assert_eq!(
            events.iter().map(|e| e.elapsed_ticks).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(events.iter().all(|e| e.scenario_id.as_deref() == Some("normal")));
    }

    #[test]
    fn test_start_single_replaces_sequential() {
        let (mut ctl, mut rx) = controller();
        ctl.start_sequential();
        for _ in 0..30 {
            ctl.tick();
        }

        ctl.start_single("authentication").unwrap();
        drain(&ctl, &mut rx);
        ctl.tick();

        let events = drain(&ctl, &mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].scenario_id.as_deref(), Some("authentication"));
        assert_eq!(events[0].elapsed_ticks, 1);
        assert_eq!(ctl.state().mode(), Some(PlayMode::Single("authentication".into())));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut ctl, mut rx) = controller();

        ctl.stop();
        ctl.stop_sequential();
        assert!(ctl.is_idle());
        assert!(drain(&ctl, &mut rx).is_empty());

        ctl.start_sequential();
        ctl.tick();
        ctl.stop();
        ctl.stop();

        let events = drain(&ctl, &mut rx);
        assert_eq!(events.len(), 2);
        assert!(events[1].is_idle());
        assert_eq!(events[1].scenario_name, "Normal Operations");
        assert_eq!(ctl.elapsed_ticks(), 0);
    }

    #[test]
    fn test_stop_sequential_ignores_single() {
        let (mut ctl, mut rx) = controller();
        ctl.start_single("quantum_breach").unwrap();

        ctl.stop_sequential();

        assert!(matches!(ctl.state(), PlaybackState::SinglePlay { .. }));
        assert!(drain(&ctl, &mut rx).is_empty());
    }

    #[test]
    fn test_toggle_single_twice_returns_to_idle() {
        let (mut ctl, mut rx) = controller();

        ctl.toggle_single("normal").unwrap();
        assert_eq!(ctl.state().mode(), Some(PlayMode::Single("normal".into())));

        ctl.toggle_single("normal").unwrap();
        assert!(ctl.is_idle());

        let events = drain(&ctl, &mut rx);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_idle());
    }

    #[test]
    fn test_toggle_other_scenario_switches() {
        let (mut ctl, _rx) = controller();

        ctl.toggle_single("normal").unwrap();
        ctl.tick();
        ctl.toggle_single("network_overload").unwrap();

        assert_eq!(
            ctl.state(),
            &PlaybackState::SinglePlay {
                scenario_id: "network_overload".to_string(),
                elapsed_ticks: 0
            }
        );
    }

    #[test]
    fn test_progress_follows_sequential_run() {
        let (mut ctl, _rx) = controller();
        assert!(ctl.progress().iter().all(|(_, s)| *s == ScenarioStatus::Pending));

        ctl.start_sequential();
        for _ in 0..36 {
            ctl.tick();
        }

        let statuses: Vec<ScenarioStatus> = ctl.progress().into_iter().map(|(_, s)| s).collect();
        assert_eq!(
            statuses,
            vec![
                ScenarioStatus::Completed,
                ScenarioStatus::Completed,
                ScenarioStatus::Active,
                ScenarioStatus::Pending,
                ScenarioStatus::Pending,
                ScenarioStatus::Pending,
            ]
        );
        assert_eq!(ctl.active_scenario_name(), "Quantum Authentication");
        assert_eq!(ctl.local_elapsed(), 1);
    }

    #[test]
    fn test_closed_sink_is_dropped() {
        let (mut ctl, rx) = controller();
        drop(rx);
        assert_eq!(ctl.sink_count(), 1);

        ctl.start_sequential();
        ctl.tick();
        assert_eq!(ctl.sink_count(), 1);

        ctl.telemetry().deliver();
        assert_eq!(ctl.sink_count(), 0);
    }

    #[test]
    fn test_same_seed_same_stream() {
        let (mut a, mut rx_a) = controller();
        let (mut b, mut rx_b) = controller();

        a.start_sequential();
        b.start_sequential();
        for _ in 0..40 {
            a.tick();
            b.tick();
        }

        assert_eq!(drain(&a, &mut rx_a), drain(&b, &mut rx_b));
    }

    #[test]
    fn test_play_mode_parse() {
        assert_eq!("sequential".parse::<PlayMode>().unwrap(), PlayMode::Sequential);
        assert_eq!("ALL".parse::<PlayMode>().unwrap(), PlayMode::Sequential);
        assert_eq!(
            "quantum_breach".parse::<PlayMode>().unwrap(),
            PlayMode::Single("quantum_breach".to_string())
        );
    }
}
