//! Telemetry synthesis.
//!
//! Every metric of a snapshot is built from the same parts:
//!
//! ```text
//! value = baseline + A·wave(t·f) + jitter [+ spike] [+ w·shared]
//! ```
//!
//! - **wave**: `sin` or `cos`, smooth drift with a per-metric frequency
//! - **jitter**: uniform noise in a per-metric range
//! - **spike**: when `random() > 0.7`, `(random() - 0.5) · 40 · scale`
//! - **shared**: a scenario-wide drive term (satellite link drop, traffic
//!   overload) that several metrics follow with weight `w`, so they move
//!   together
//!
//! Baseline and waves are the deterministic part ([`base_component`]);
//! jitter, spikes and shocks come from the injected [`RandomSource`]
//! ([`noise_component`]). Values are not clamped.

use crate::scenarios::ScenarioKind;
use serde::{Deserialize, Serialize};
use std::ops::Add;
use thunderbird_env::RandomSource;

/// Probability threshold for a spike: fires when `random() > 0.7`.
pub const SPIKE_THRESHOLD: f64 = 0.7;

/// Peak-to-peak magnitude of an unscaled spike.
pub const SPIKE_MAGNITUDE: f64 = 40.0;

/// Metric names in snapshot order.
pub const METRIC_NAMES: [&str; 6] = [
    "performance",
    "security",
    "network",
    "threats",
    "keyGeneration",
    "bandwidth",
];

/// One tick of synthesized telemetry, nominally in 0–100.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    pub performance: f64,
    pub security: f64,
    pub network: f64,
    pub threats: f64,
    pub key_generation: f64,
    pub bandwidth: f64,
}

impl MetricSnapshot {
    pub fn from_array(v: [f64; 6]) -> Self {
        Self {
            performance: v[0],
            security: v[1],
            network: v[2],
            threats: v[3],
            key_generation: v[4],
            bandwidth: v[5],
        }
    }

    pub fn to_array(&self) -> [f64; 6] {
        [
            self.performance,
            self.security,
            self.network,
            self.threats,
            self.key_generation,
            self.bandwidth,
        ]
    }

    /// Copy with every metric clamped to `[0, 100]`, for display.
    pub fn clamped(&self) -> Self {
        Self::from_array(self.to_array().map(|v| v.clamp(0.0, 100.0)))
    }
}

impl Add for MetricSnapshot {
    type Output = MetricSnapshot;

    fn add(self, rhs: MetricSnapshot) -> MetricSnapshot {
        let (a, b) = (self.to_array(), rhs.to_array());
        MetricSnapshot::from_array(std::array::from_fn(|i| a[i] + b[i]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wave {
    Sin,
    Cos,
}

impl Wave {
    fn at(self, x: f64) -> f64 {
        match self {
            Wave::Sin => x.sin(),
            Wave::Cos => x.cos(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct MetricRecipe {
    baseline: f64,
    amplitude: f64,
    frequency: f64,
    wave: Wave,
    jitter: (f64, f64),
    /// Spike scale; 0 disables spikes
    spike: f64,
    /// Weight on the scenario's shared drive term
    coupling: f64,
}

/// Scenario-wide term several metrics follow together.
#[derive(Debug, Clone, Copy)]
struct SharedDrive {
    amplitude: f64,
    frequency: f64,
    wave: Wave,
    /// Added when `random() > shock_threshold`
    shock: f64,
    shock_threshold: f64,
}

#[derive(Debug, Clone, Copy)]
struct ScenarioRecipe {
    metrics: [MetricRecipe; 6],
    drive: Option<SharedDrive>,
}

const fn metric(
    baseline: f64,
    amplitude: f64,
    frequency: f64,
    wave: Wave,
    jitter: (f64, f64),
    spike: f64,
) -> MetricRecipe {
    MetricRecipe {
        baseline,
        amplitude,
        frequency,
        wave,
        jitter,
        spike,
        coupling: 0.0,
    }
}

const fn coupled(recipe: MetricRecipe, coupling: f64) -> MetricRecipe {
    MetricRecipe { coupling, ..recipe }
}

use Wave::{Cos, Sin};

const NORMAL: ScenarioRecipe = ScenarioRecipe {
    metrics: [
        metric(92.0, 3.0, 0.10, Sin, (-2.0, 2.0), 0.0),
        metric(95.0, 2.0, 0.05, Cos, (-1.5, 1.5), 0.0),
        metric(90.0, 4.0, 0.15, Sin, (-2.0, 2.0), 0.0),
        metric(4.5, 2.5, 0.20, Sin, (-1.0, 1.0), 0.0),
        metric(88.0, 3.0, 0.12, Cos, (-2.0, 2.0), 0.0),
        metric(86.0, 5.0, 0.08, Sin, (-3.0, 3.0), 0.0),
    ],
    drive: None,
};

const HACKER_ATTEMPT: ScenarioRecipe = ScenarioRecipe {
    metrics: [
        metric(70.0, 10.0, 0.5, Sin, (-8.0, 8.0), 0.5),
        metric(40.0, 35.0, 0.7, Sin, (-10.0, 10.0), 1.0),
        metric(65.0, 12.0, 0.6, Cos, (-8.0, 8.0), 0.5),
        metric(80.0, 15.0, 0.9, Sin, (-5.0, 5.0), 0.75),
        metric(75.0, 8.0, 0.3, Sin, (-4.0, 4.0), 0.0),
        metric(70.0, 10.0, 0.4, Cos, (-6.0, 6.0), 0.0),
    ],
    drive: None,
};

const AUTHENTICATION: ScenarioRecipe = ScenarioRecipe {
    metrics: [
        metric(88.0, 4.0, 0.2, Sin, (-2.0, 2.0), 0.0),
        metric(99.0, 0.8, 0.3, Sin, (-0.5, 0.5), 0.0),
        metric(87.0, 4.0, 0.25, Cos, (-2.0, 2.0), 0.0),
        metric(3.0, 1.5, 0.4, Sin, (-1.0, 1.0), 0.0),
        metric(98.5, 1.0, 0.5, Cos, (-0.5, 0.5), 0.0),
        metric(85.0, 5.0, 0.2, Sin, (-3.0, 3.0), 0.0),
    ],
    drive: None,
};

// Connection drop: sin(t·0.8)·35, plus a -25 shock 40% of the time.
const SATELLITE_FAILURE: ScenarioRecipe = ScenarioRecipe {
    metrics: [
        coupled(metric(70.0, 5.0, 0.3, Sin, (-5.0, 5.0), 0.0), 0.4),
        metric(85.0, 4.0, 0.2, Cos, (-3.0, 3.0), 0.0),
        coupled(metric(50.0, 4.0, 1.3, Cos, (-5.0, 5.0), 0.0), 1.0),
        metric(25.0, 10.0, 0.4, Sin, (-5.0, 5.0), 0.0),
        metric(70.0, 8.0, 0.25, Cos, (-5.0, 5.0), 0.0),
        coupled(metric(45.0, 4.0, 1.1, Sin, (-5.0, 5.0), 0.0), 1.0),
    ],
    drive: Some(SharedDrive {
        amplitude: 35.0,
        frequency: 0.8,
        wave: Sin,
        shock: -25.0,
        shock_threshold: 0.6,
    }),
};

const QUANTUM_BREACH: ScenarioRecipe = ScenarioRecipe {
    metrics: [
        metric(60.0, 15.0, 0.6, Sin, (-8.0, 8.0), 0.5),
        metric(15.0, 30.0, 0.9, Sin, (-8.0, 8.0), 1.5),
        metric(60.0, 12.0, 0.5, Cos, (-6.0, 6.0), 0.5),
        metric(95.0, 5.0, 1.1, Sin, (-3.0, 3.0), 0.0),
        metric(20.0, 15.0, 0.7, Cos, (-10.0, 10.0), 1.0),
        metric(65.0, 10.0, 0.4, Sin, (-6.0, 6.0), 0.0),
    ],
    drive: None,
};

// Overload: sin(t·1.2)·20, plus a -20 surge 30% of the time.
const NETWORK_OVERLOAD: ScenarioRecipe = ScenarioRecipe {
    metrics: [
        coupled(metric(75.0, 6.0, 0.4, Sin, (-5.0, 5.0), 0.0), 0.3),
        metric(88.0, 3.0, 0.2, Cos, (-2.0, 2.0), 0.0),
        coupled(metric(20.0, 3.0, 0.9, Cos, (-5.0, 5.0), 0.0), 1.0),
        metric(15.0, 6.0, 0.5, Sin, (-4.0, 4.0), 0.0),
        metric(82.0, 4.0, 0.3, Sin, (-3.0, 3.0), 0.0),
        coupled(metric(15.0, 3.0, 0.7, Sin, (-5.0, 5.0), 0.0), 1.0),
    ],
    drive: Some(SharedDrive {
        amplitude: 20.0,
        frequency: 1.2,
        wave: Sin,
        shock: -20.0,
        shock_threshold: SPIKE_THRESHOLD,
    }),
};

// Ids outside the built-in set get a quiet, nominal signal.
const FALLBACK: ScenarioRecipe = ScenarioRecipe {
    metrics: [
        metric(90.0, 2.0, 0.1, Sin, (-1.0, 1.0), 0.0),
        metric(92.0, 2.0, 0.1, Cos, (-1.0, 1.0), 0.0),
        metric(90.0, 2.0, 0.1, Sin, (-1.0, 1.0), 0.0),
        metric(5.0, 1.0, 0.1, Sin, (-0.5, 0.5), 0.0),
        metric(90.0, 2.0, 0.1, Cos, (-1.0, 1.0), 0.0),
        metric(88.0, 2.0, 0.1, Sin, (-1.0, 1.0), 0.0),
    ],
    drive: None,
};

fn recipe_for(scenario_id: &str) -> &'static ScenarioRecipe {
    match scenario_id.parse::<ScenarioKind>() {
        Ok(ScenarioKind::Normal) => &NORMAL,
        Ok(ScenarioKind::HackerAttempt) => &HACKER_ATTEMPT,
        Ok(ScenarioKind::Authentication) => &AUTHENTICATION,
        Ok(ScenarioKind::SatelliteFailure) => &SATELLITE_FAILURE,
        Ok(ScenarioKind::QuantumBreach) => &QUANTUM_BREACH,
        Ok(ScenarioKind::NetworkOverload) => &NETWORK_OVERLOAD,
        Err(_) => &FALLBACK,
    }
}

/// Deterministic part of a snapshot: baselines plus waves.
///
/// Bit-identical for the same `(scenario_id, t)`.
pub fn base_component(scenario_id: &str, t: u64) -> MetricSnapshot {
    let recipe = recipe_for(scenario_id);
    let t = t as f64;
    let shared = recipe
        .drive
        .map(|d| d.amplitude * d.wave.at(t * d.frequency))
        .unwrap_or(0.0);

    MetricSnapshot::from_array(recipe.metrics.map(|m| {
        m.baseline + m.amplitude * m.wave.at(t * m.frequency) + m.coupling * shared
    }))
}

/// Random part of a snapshot: jitter, spikes and shared shocks.
///
/// Draw order is fixed (shock gate first, then per metric: jitter, spike
/// gate, spike magnitude) so a seeded source replays exactly.
pub fn noise_component<R: RandomSource + ?Sized>(scenario_id: &str, rng: &R) -> MetricSnapshot {
    let recipe = recipe_for(scenario_id);

    let shock = match recipe.drive {
        Some(d) if rng.exceeds(d.shock_threshold) => d.shock,
        _ => 0.0,
    };

    MetricSnapshot::from_array(recipe.metrics.map(|m| {
        let jitter = rng.uniform(m.jitter.0, m.jitter.1);
        let spike = if m.spike > 0.0 && rng.exceeds(SPIKE_THRESHOLD) {
            (rng.random() - 0.5) * SPIKE_MAGNITUDE * m.spike
        } else {
            0.0
        };
        jitter + spike + m.coupling * shock
    }))
}

/// Synthesizes one snapshot for `scenario_id` at `t` seconds into its run.
///
/// Unknown ids fall back to a low-volatility nominal recipe; this never
/// fails.
pub fn synthesize<R: RandomSource + ?Sized>(scenario_id: &str, t: u64, rng: &R) -> MetricSnapshot {
    base_component(scenario_id, t) + noise_component(scenario_id, rng)
}
