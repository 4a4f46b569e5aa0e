//! Tick clock - the periodic driver behind playback.
//!
//! The clock is one background task that sleeps on the context, then ticks
//! the controller. Every start hands the task a fresh epoch; stop bumps the
//! epoch and aborts the task. The task re-checks its epoch under the
//! controller lock before ticking, so a task from an earlier start can
//! never fire after a stop. Sinks run after the lock is released.

use crate::playback::PlaybackController;
use crate::sink::TelemetryBus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thunderbird_env::EngineContext;
use tokio::task::JoinHandle;
use tracing::debug;

pub(crate) type SharedController<C> = Arc<Mutex<PlaybackController<C>>>;

pub(crate) fn lock<C>(controller: &Mutex<PlaybackController<C>>) -> MutexGuard<'_, PlaybackController<C>> {
    controller.lock().unwrap_or_else(|e| e.into_inner())
}

/// Handle to the running tick task.
pub struct TickClock {
    interval: Duration,
    epoch: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl TickClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            epoch: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Starts a fresh tick task, replacing any running one.
    ///
    /// The first tick fires one full interval after this call. Must be
    /// called from within a Tokio runtime.
    pub(crate) fn restart<C: EngineContext>(
        &mut self,
        context: &Arc<C>,
        controller: &SharedController<C>,
        telemetry: &Arc<TelemetryBus>,
    ) {
        self.stop();
        let epoch = self.epoch.load(Ordering::SeqCst);

        let task = run(
            Arc::clone(context),
            Arc::clone(controller),
            Arc::clone(telemetry),
            Arc::clone(&self.epoch),
            epoch,
            self.interval,
        );
        self.task = Some(context.spawn("tick-clock", task));
        debug!(epoch, interval_ms = self.interval.as_millis() as u64, "tick clock started");
    }

    /// Stops the tick task. Safe to call when not running.
    pub fn stop(&mut self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("tick clock stopped");
        }
    }
}

impl Drop for TickClock {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run<C: EngineContext>(
    context: Arc<C>,
    controller: SharedController<C>,
    telemetry: Arc<TelemetryBus>,
    current_epoch: Arc<AtomicU64>,
    epoch: u64,
    interval: Duration,
) {
    loop {
        context.sleep(interval).await;

        let finished = {
            let mut ctl = lock(&controller);
            if current_epoch.load(Ordering::SeqCst) != epoch || !ctl.needs_clock() {
                break;
            }
            ctl.tick();
            !ctl.needs_clock()
        };

        telemetry.deliver();
        if finished {
            debug!("tick clock halting: playback finished");
            break;
        }
    }
}
