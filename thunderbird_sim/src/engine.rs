//! ScenarioEngine - the control surface handed to the dashboard.

use crate::clock::{lock, SharedController, TickClock};
use crate::config::EngineConfig;
use crate::context::SimContext;
use crate::error::EngineError;
use crate::playback::{PlayMode, PlaybackController, PlaybackState};
use crate::scenarios::{ScenarioCatalog, ScenarioDefinition, ScenarioStatus};
use crate::sink::{TelemetryBus, TelemetryEvent, TelemetrySink};
use std::sync::{Arc, Mutex, MutexGuard};
use thunderbird_env::EngineContext;
use tokio::sync::mpsc;
use tracing::info;

/// Playback controller plus the clock that drives it.
///
/// Construct one per process and share it by reference. Control calls
/// take the controller lock first and reconcile the clock while still
/// holding it, so a mode switch is a single critical section with respect
/// to the tick task. Sinks run only after that lock is released and may
/// call back into the engine.
///
/// Control calls that may start the clock must run inside a Tokio runtime.
pub struct ScenarioEngine<C: EngineContext> {
    context: Arc<C>,
    controller: SharedController<C>,
    clock: Mutex<TickClock>,
    telemetry: Arc<TelemetryBus>,
    config: EngineConfig,
}

impl<C: EngineContext> ScenarioEngine<C> {
    /// Creates an idle engine.
    pub fn new(context: Arc<C>, catalog: ScenarioCatalog, config: EngineConfig) -> Self {
        info!(
            "Scenario engine ready: {} scenarios, tick {:?}, seed {}",
            catalog.len(),
            config.tick_interval,
            context.seed()
        );
        let controller = PlaybackController::new(Arc::new(catalog), Arc::clone(&context));
        let telemetry = Arc::clone(controller.telemetry());
        Self {
            context,
            controller: Arc::new(Mutex::new(controller)),
            clock: Mutex::new(TickClock::new(config.tick_interval)),
            telemetry,
            config,
        }
    }

    /// Starts playback in `mode`, replacing whatever is playing.
    pub fn start(&self, mode: PlayMode) -> Result<(), EngineError> {
        match mode {
            PlayMode::Sequential => {
                self.start_sequential();
                Ok(())
            }
            PlayMode::Single(id) => self.start_single(&id),
        }
    }

    pub fn start_sequential(&self) {
        self.control(|ctl| ctl.start_sequential())
    }

    pub fn stop_sequential(&self) {
        self.control(|ctl| ctl.stop_sequential())
    }

    pub fn start_single(&self, scenario_id: &str) -> Result<(), EngineError> {
        self.control(|ctl| ctl.start_single(scenario_id))
    }

    pub fn toggle_single(&self, scenario_id: &str) -> Result<(), EngineError> {
        self.control(|ctl| ctl.toggle_single(scenario_id))
    }

    /// Stops playback. No-op when idle.
    pub fn stop(&self) {
        self.control(|ctl| ctl.stop())
    }

    /// Subscribes through a bounded channel of `capacity` events.
    ///
    /// A subscriber that falls behind loses events rather than stalling
    /// the tick.
    pub fn subscribe(&self, capacity: usize) -> mpsc::Receiver<TelemetryEvent> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.add_sink(tx);
        rx
    }

    /// Subscribes with the configured default capacity.
    pub fn subscribe_default(&self) -> mpsc::Receiver<TelemetryEvent> {
        self.subscribe(self.config.sink_capacity)
    }

    pub fn add_sink(&self, sink: impl TelemetrySink) {
        self.telemetry.add_sink(sink);
    }

    pub fn state(&self) -> PlaybackState {
        lock(&self.controller).state().clone()
    }

    pub fn mode(&self) -> Option<PlayMode> {
        lock(&self.controller).state().mode()
    }

    pub fn elapsed_ticks(&self) -> u64 {
        lock(&self.controller).elapsed_ticks()
    }

    /// Seconds into the active scenario.
    pub fn local_elapsed(&self) -> u64 {
        lock(&self.controller).local_elapsed()
    }

    pub fn active_scenario_name(&self) -> String {
        lock(&self.controller).active_scenario_name().to_string()
    }

    pub fn is_finished(&self) -> bool {
        lock(&self.controller).is_finished()
    }

    pub fn catalog(&self) -> Arc<ScenarioCatalog> {
        Arc::clone(lock(&self.controller).catalog())
    }

    /// Per-scenario status for the dashboard's progress list.
    pub fn progress(&self) -> Vec<(ScenarioDefinition, ScenarioStatus)> {
        lock(&self.controller)
            .progress()
            .into_iter()
            .map(|(s, status)| (s.clone(), status))
            .collect()
    }

    pub fn is_clock_running(&self) -> bool {
        self.clock().is_running()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<C> {
        &self.context
    }

    /// Applies a control operation and brings the clock in line with the
    /// resulting state. A rejected operation leaves both untouched.
    fn control<T>(&self, op: impl FnOnce(&mut PlaybackController<C>) -> T) -> T {
        let out = {
            let mut ctl = lock(&self.controller);
            let before = ctl.state().clone();
            let out = op(&mut *ctl);

            let mut clock = self.clock();
            if !ctl.needs_clock() {
                clock.stop();
            } else if *ctl.state() != before || !clock.is_running() {
                clock.restart(&self.context, &self.controller, &self.telemetry);
            }
            out
        };

        self.telemetry.deliver();
        out
    }

    fn clock(&self) -> MutexGuard<'_, TickClock> {
        self.clock.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ScenarioEngine<SimContext> {
    /// Creates an idle engine on a virtual clock seeded from `config.seed`.
    pub fn virtual_time(catalog: ScenarioCatalog, config: EngineConfig) -> Self {
        let context = SimContext::shared(config.seed);
        Self::new(context, catalog, config)
    }
}
