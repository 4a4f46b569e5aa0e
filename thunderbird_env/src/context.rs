//! Core environment context trait for the scenario engine.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Source of uniform randomness.
///
/// This is the single entropy tap used by the metric synthesizer. It is
/// kept separate from [`EngineContext`] so pure code can take just the
/// random source.
pub trait RandomSource {
    /// Returns a uniformly distributed sample in `[0, 1)`.
    fn random(&self) -> f64;

    /// Uniform sample in `[low, high)`.
    fn uniform(&self, low: f64, high: f64) -> f64 {
        low + self.random() * (high - low)
    }

    /// Returns true when a fresh sample lands above `threshold`.
    ///
    /// `exceeds(0.7)` fires with probability 0.3.
    fn exceeds(&self, threshold: f64) -> bool {
        self.random() > threshold
    }
}

/// The central interface for environment interaction.
///
/// This trait abstracts the "real world" so that the playback engine can run
/// against the wall clock in production and against a virtual clock with a
/// seeded random source in tests and headless runs.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, thread-local OS-seeded RNG
/// - **Simulation**: `SimContext` - virtual clock, `ChaCha8Rng(seed)`
///
/// # Determinism
///
/// Everything that would make two runs differ (time, randomness) goes
/// through this trait. Two simulation contexts built from the same seed
/// produce the same telemetry stream.
#[async_trait]
pub trait EngineContext: RandomSource + Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances the virtual clock and yields
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task and returns its handle so the caller can
    /// abort it synchronously.
    fn spawn<F>(&self, name: &str, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    fn seed(&self) -> u64;
}
