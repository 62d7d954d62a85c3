// Fixed-cadence render loop
// Pulls the latest position from the controller and redraws the overlay

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::DisplaySink;
use crate::error::SchedulingError;
use crate::transport::TransportController;

/// 50 redraws per second
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(20);

/// Recurring overlay redraw.
///
/// The task stops itself on the first tick that finds the transport at rest
/// (Stopped, Paused or Idle), after drawing that final frame. Commands that
/// change what is shown call [`ensure_running`](Self::ensure_running) to
/// re-arm it.
pub struct RenderLoop {
    interval: Duration,
    active: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl RenderLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            active: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether another tick is still going to happen
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Schedule the loop unless it is already going to tick again.
    ///
    /// Must be called from within a tokio runtime.
    pub fn ensure_running(
        &mut self,
        controller: Arc<Mutex<TransportController>>,
        sink: Arc<dyn DisplaySink>,
    ) -> Result<(), SchedulingError> {
        let runtime = Handle::try_current().map_err(|_| SchedulingError::NoRuntime)?;

        // The loop clears the flag under the controller lock when it decides
        // to stop, so a command applied before this call is always seen.
        if self.active.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let active = Arc::clone(&self.active);
        self.task = Some(runtime.spawn(drive(controller, sink, self.interval, active)));
        Ok(())
    }

    /// Stop the loop for good
    pub fn cancel(&mut self) -> Result<(), SchedulingError> {
        self.active.store(false, Ordering::Release);
        match self.task.take() {
            Some(task) => {
                task.abort();
                Ok(())
            }
            None => Err(SchedulingError::NotScheduled),
        }
    }
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn drive(
    controller: Arc<Mutex<TransportController>>,
    sink: Arc<dyn DisplaySink>,
    interval: Duration,
    active: Arc<AtomicBool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let tick = controller.lock().tick();

        if let Some(overlay) = tick.overlay {
            sink.redraw_overlay(overlay);
        }
        sink.update_controls(tick.controls);

        if tick.reschedule {
            continue;
        }

        // Only rest once the frame just drawn is still current. A command
        // applied while drawing saw the flag set and left the redraw to us.
        let settled = {
            let mut controller = controller.lock();
            if controller.tick() == tick {
                active.store(false, Ordering::Release);
                true
            } else {
                false
            }
        };

        if settled {
            break;
        }
    }
}
