//! ThunderBird Environment Abstraction Layer
//!
//! This crate lets the scenario engine run against the **wall clock**
//! (tokio) in production and against a **virtual clock** in tests and
//! headless runs.
//!
//! # Core Concept
//!
//! The playback engine never touches time or entropy directly. It goes
//! through [`EngineContext`]:
//! - Time (`now()`, `sleep()`)
//! - Tasks (`spawn()`)
//! - Randomness (`random()`, `uniform()`)
//!
//! Swapping the context swaps the whole environment. A seeded context
//! makes every jitter and spike term reproducible from its seed number.
//!
//! # Example
//!
//! ```ignore
//! use thunderbird_env::EngineContext;
//!
//! async fn clock_loop<Ctx: EngineContext>(ctx: &Ctx) {
//!     loop {
//!         ctx.sleep(Duration::from_secs(1)).await;
//!         tick(ctx.random());
//!     }
//! }
//! ```

mod context;
mod tokio_impl;

pub use context::{EngineContext, RandomSource};
pub use tokio_impl::TokioContext;
