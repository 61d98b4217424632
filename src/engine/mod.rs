//! Periodic update loop and the scheduling boundary it consumes.
//!
//! The engine never owns a timer. It asks the host for a single future
//! wakeup, runs one evaporation/recomputation pass when that wakeup
//! fires, and re-arms itself. Dropping the pending tick guard cancels
//! the wakeup, which is what makes teardown safe: no callback ever
//! fires into a destroyed instance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

/// Handle to one pending scheduled wakeup. Cancelling (or dropping) it
/// guarantees the callback will not run.
pub struct ScheduledTick {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl ScheduledTick {
    /// Wrap a cancellation action supplied by the scheduler.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Explicitly cancel the pending wakeup.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Disarm without cancelling: the wakeup has already fired.
    pub(crate) fn disarm(mut self) {
        self.cancel.take();
    }
}

impl Drop for ScheduledTick {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for ScheduledTick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTick")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Fire-once scheduling capability consumed from the host environment.
pub trait TickScheduler: Send + Sync {
    /// Arrange for `callback` to run once after `delay`.
    fn schedule_after(
        &self,
        delay: Duration,
        callback: Box<dyn FnOnce() + Send>,
    ) -> ScheduledTick;
}

/// Production scheduler backed by the tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

impl TokioScheduler {
    /// Use the current runtime. Panics outside a runtime context, same as
    /// `Handle::current`.
    pub fn new() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }

    /// Use an explicit runtime handle.
    pub fn with_handle(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TickScheduler for TokioScheduler {
    fn schedule_after(
        &self,
        delay: Duration,
        callback: Box<dyn FnOnce() + Send>,
    ) -> ScheduledTick {
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        let abort = task.abort_handle();
        ScheduledTick::new(move || abort.abort())
    }
}

/// Self-re-arming periodic driver for evaporation and heuristic
/// recomputation.
///
/// Execution is cooperative: the body runs inside the scheduler's
/// callback, re-arming happens only after the body returns, so ticks
/// never overlap.
pub struct UpdateLoop {
    interval: Duration,
    scheduler: Arc<dyn TickScheduler>,
    pending: Mutex<Option<ScheduledTick>>,
    running: AtomicBool,
    stopped: AtomicBool,
}

impl UpdateLoop {
    /// Create a stopped loop; call [`UpdateLoop::start`] to arm it.
    pub fn new(interval: Duration, scheduler: Arc<dyn TickScheduler>) -> Arc<Self> {
        Arc::new(Self {
            interval,
            scheduler,
            pending: Mutex::new(None),
            running: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        })
    }

    /// Tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arm the first tick. `body` is the per-tick work (evaporate and
    /// recompute); it is invoked once per interval until shutdown.
    pub fn start(self: &Arc<Self>, body: Arc<dyn Fn() + Send + Sync>) {
        debug!(interval = ?self.interval, "update loop armed");
        self.arm(body);
    }

    fn arm(self: &Arc<Self>, body: Arc<dyn Fn() + Send + Sync>) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }

        let this = Arc::clone(self);
        let tick = self.scheduler.schedule_after(
            self.interval,
            Box::new(move || this.fire(body)),
        );
        *self.pending.lock() = Some(tick);
    }

    fn fire(self: Arc<Self>, body: Arc<dyn Fn() + Send + Sync>) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        // Cooperative model: a tick arriving while the previous body is
        // still running is dropped instead of re-entering.
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        // The wakeup that invoked us is spent; disarm its guard so the
        // re-arm below does not cancel a live tick.
        if let Some(spent) = self.pending.lock().take() {
            spent.disarm();
        }

        trace!("update tick");
        body();

        self.running.store(false, Ordering::SeqCst);
        self.arm(body);
    }

    /// Cancel the pending tick. After this returns no tick body will run
    /// again.
    pub fn shutdown(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(tick) = self.pending.lock().take() {
            tick.cancel();
        }
        debug!("update loop shut down");
    }
}

impl std::fmt::Debug for UpdateLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateLoop")
            .field("interval", &self.interval)
            .field("stopped", &self.stopped.load(Ordering::SeqCst))
            .finish()
    }
}
