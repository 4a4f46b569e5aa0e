//! ThunderBird Scenario Simulation & Telemetry Synthesis Engine
//!
//! This crate drives the dashboard's demo mode: a fixed catalog of
//! timed scenarios (normal operations, intrusion attempts, satellite
//! failure, ...) played back on a one-second clock, with six synthetic
//! health metrics produced on every tick.
//!
//! # Core Principle: One Counter
//!
//! Playback is a single state machine. Sequential and single-scenario play
//! are variants of one enum, so there is only ever one tick counter and
//! one clock task:
//! - **Sequential**: walk the catalog back to back, then freeze on the last entry
//! - **Single**: loop one scenario until stopped
//! - **Idle**: nothing playing; a sentinel event marks every return here
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ScenarioEngine                         │
//! │  ┌───────────────┐   tick   ┌───────────────────────────┐   │
//! │  │   TickClock   │─────────►│    PlaybackController     │   │
//! │  │  (ctx.sleep)  │          │ Idle | Sequential | Single│   │
//! │  └───────────────┘          └──────┬─────────────┬──────┘   │
//! │                                    │             │          │
//! │                             ┌──────▼──────┐ ┌────▼───────┐  │
//! │                             │  Timeline   │ │ Synthesizer│  │
//! │                             │  (resolve)  │ │ base+noise │  │
//! │                             └──────┬──────┘ └────────────┘  │
//! │                             ┌──────▼──────┐                 │
//! │                             │   Catalog   │                 │
//! │                             └─────────────┘                 │
//! └──────────────────────────────────┬──────────────────────────┘
//!                                    │ TelemetryEvent
//!                                    ▼
//!                      sinks (mpsc channels, callbacks)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use thunderbird_sim::{EngineConfig, PlayMode, ScenarioCatalog, ScenarioEngine};
//! use thunderbird_env::TokioContext;
//!
//! let engine = ScenarioEngine::new(
//!     TokioContext::shared(),
//!     ScenarioCatalog::default(),
//!     EngineConfig::default(),
//! );
//! let mut rx = engine.subscribe_default();
//! engine.start(PlayMode::Sequential)?;
//!
//! while let Some(event) = rx.recv().await {
//!     println!("{} {:?}", event.scenario_name, event.snapshot);
//! }
//! ```

mod clock;
mod config;
mod context;
mod engine;
mod error;
mod playback;
mod sink;
pub mod scenarios;
pub mod synth;
pub mod timeline;

pub use clock::TickClock;
pub use config::EngineConfig;
pub use context::SimContext;
pub use engine::ScenarioEngine;
pub use error::{CatalogError, EngineError};
pub use playback::{PlayMode, PlaybackController, PlaybackState};
pub use scenarios::{format_clock, ScenarioCatalog, ScenarioDefinition, ScenarioKind, ScenarioStatus};
pub use sink::{CallbackSink, TelemetryBus, TelemetryEvent, TelemetrySink, IDLE_SCENARIO_NAME};
pub use synth::{synthesize, MetricSnapshot};
pub use timeline::{resolve, Resolution};
