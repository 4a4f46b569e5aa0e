//! Production implementation of EngineContext using Tokio.

use crate::{EngineContext, RandomSource};
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

/// Production context backed by Tokio and OS entropy.
///
/// Time comes from the system clock, randomness from the thread-local
/// generator (reseeded from the OS).
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl TokioContext {
    /// Creates a new TokioContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for TokioContext {
    fn random(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

#[async_trait]
impl EngineContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn spawn<F>(&self, name: &str, future: F) -> JoinHandle<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        debug!(task = name, "spawning task");
        tokio::spawn(future)
    }

    fn seed(&self) -> u64 {
        // Production is not seeded
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tokio_context_time() {
        let ctx = TokioContext::new();
        let t1 = ctx.now();
        ctx.sleep(Duration::from_millis(10)).await;
        let t2 = ctx.now();

        assert!(t2 > t1);
        assert!(t2 - t1 >= Duration::from_millis(10));
    }

    #[test]
    fn test_tokio_context_random_range() {
        let ctx = TokioContext::new();
        for _ in 0..1000 {
            let r = ctx.random();
            assert!((0.0..1.0).contains(&r));

            let u = ctx.uniform(-5.0, 5.0);
            assert!((-5.0..5.0).contains(&u));
        }
    }

    #[test]
    fn test_tokio_context_is_not_replayable() {
        let ctx = TokioContext::new();
        let a: Vec<f64> = (0..8).map(|_| ctx.random()).collect();
        let b: Vec<f64> = (0..8).map(|_| ctx.random()).collect();

        assert_ne!(a, b);
    }

    #[test]
    fn test_tokio_context_seed() {
        let ctx = TokioContext::new();
        assert_eq!(ctx.seed(), 0);
    }

    #[tokio::test]
    async fn test_tokio_context_spawn_can_be_aborted() {
        let ctx = TokioContext::new();
        let handle = ctx.spawn("forever", async {
            loop {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        });

        handle.abort();
        let err = handle.await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
