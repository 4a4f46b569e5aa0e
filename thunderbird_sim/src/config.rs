//! Engine configuration.

use std::time::Duration;

/// Configuration for a scenario engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Time between ticks
    pub tick_interval: Duration,

    /// Buffer size of channels handed out by `subscribe_default`
    pub sink_capacity: usize,

    /// Seed for the virtual clock built by `ScenarioEngine::virtual_time`
    pub seed: u64,

    /// Ticks a headless single-scenario run observes before stopping
    pub single_run_ticks: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            sink_capacity: 64,
            seed: 42,
            single_run_ticks: 30,
        }
    }
}

impl EngineConfig {
    /// Sets the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Sets the default subscriber buffer size.
    pub fn with_sink_capacity(mut self, capacity: usize) -> Self {
        self.sink_capacity = capacity.max(1);
        self
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the single-run tick budget.
    pub fn with_single_run_ticks(mut self, ticks: u64) -> Self {
        self.single_run_ticks = ticks;
        self
    }
}
