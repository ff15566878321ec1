//! Timer-driven bridge from a paintable surface to a SwitchBlade display.

use crate::sdk::{PixelBuffer, RenderTarget};
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Finest interval the render timer is expected to honor. Shorter intervals
/// are accepted but ticks will not arrive any faster in practice.
pub const MIN_RENDER_INTERVAL: Duration = Duration::from_millis(55);

/// Something that can draw itself and hand back the resulting pixels.
pub trait PaintableSurface: Send + 'static {
    /// Draws the current state.
    fn paint(&mut self) -> Result<()>;

    /// Returns the pixels produced by the last paint.
    fn capture(&self) -> Result<PixelBuffer>;
}

/// Destination for rendered frames.
pub trait FrameSink: Send + Sync {
    fn upload(&self, target: RenderTarget, buffer: &PixelBuffer) -> Result<()>;
}

struct Shared<S> {
    surface: Weak<Mutex<S>>,
    sink: Arc<dyn FrameSink>,
    target: RenderTarget,
    /// Held for the whole tick; the flag is false once stopped.
    running: Mutex<bool>,
    busy: AtomicBool,
    frames: AtomicU64,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: PaintableSurface> Shared<S> {
    fn lock_running(&self) -> MutexGuard<'_, bool> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn render_once(&self) -> Result<bool> {
        if self.busy.load(Ordering::Acquire) {
            debug!("Previous frame still in flight, waiting");
        }
        let running = self.lock_running();
        if !*running {
            return Ok(false);
        }
        self.busy.store(true, Ordering::Release);
        let _busy = BusyGuard(&self.busy);

        let Some(surface) = self.surface.upgrade() else {
            debug!("Render surface dropped, skipping frame");
            return Ok(false);
        };

        let buffer = {
            let mut surface = surface.lock().unwrap_or_else(PoisonError::into_inner);
            surface.paint()?;
            surface.capture()?
        };
        self.sink.upload(self.target, &buffer)?;

        self.frames.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }
}

/// Periodically paints a surface and uploads it to a display.
///
/// The bridge holds only a weak reference to the surface; once the
/// application drops it, ticks become no-ops.
pub struct RenderBridge<S: PaintableSurface> {
    shared: Arc<Shared<S>>,
    task: Mutex<Option<JoinHandle<()>>>,
    interval: Duration,
}

impl<S: PaintableSurface> RenderBridge<S> {
    /// Starts rendering `surface` to `target` every `interval`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        surface: Weak<Mutex<S>>,
        sink: Arc<dyn FrameSink>,
        target: RenderTarget,
        interval: Duration,
    ) -> Result<Self> {
        let handle =
            tokio::runtime::Handle::try_current().map_err(|e| Error::NoRuntime(e.to_string()))?;

        let interval = if interval.is_zero() {
            warn!(
                "Render interval of zero is not a timer, using {:?}",
                MIN_RENDER_INTERVAL
            );
            MIN_RENDER_INTERVAL
        } else {
            if interval < MIN_RENDER_INTERVAL {
                warn!(
                    "Render interval {:?} is below the {:?} timer floor",
                    interval, MIN_RENDER_INTERVAL
                );
            }
            interval
        };

        let shared = Arc::new(Shared {
            surface,
            sink,
            target,
            running: Mutex::new(true),
            busy: AtomicBool::new(false),
            frames: AtomicU64::new(0),
        });

        let task = handle.spawn(render_loop(shared.clone(), interval));
        info!("Rendering to {} every {:?}", target, interval);

        Ok(Self {
            shared,
            task: Mutex::new(Some(task)),
            interval,
        })
    }

    /// Paints and uploads a single frame now.
    ///
    /// Returns `Ok(false)` if the bridge is stopped or the surface is gone.
    /// Waits for any tick already in progress.
    pub fn render_once(&self) -> Result<bool> {
        self.shared.render_once()
    }

    /// Returns true while the timer is running.
    pub fn is_active(&self) -> bool {
        *self.shared.lock_running()
    }

    /// Returns true while a frame is being painted or uploaded.
    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    /// Number of frames uploaded so far.
    pub fn frames_rendered(&self) -> u64 {
        self.shared.frames.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stops the timer. No frame is uploaded after this returns.
    pub fn stop(&self) {
        {
            let mut running = self.shared.lock_running();
            if !*running {
                return;
            }
            *running = false;
        }

        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        info!("Stopped rendering to {}", self.shared.target);
    }
}

impl<S: PaintableSurface> Drop for RenderBridge<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn render_loop<S: PaintableSurface>(shared: Arc<Shared<S>>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the timer fires after one interval
    ticker.tick().await;

    let mut errors = ErrorThrottle::new(ERROR_LOG_WINDOW);

    loop {
        ticker.tick().await;
        match shared.render_once() {
            Ok(_) if !*shared.lock_running() => break,
            Ok(_) => {}
            Err(e) => match errors.record(Instant::now()) {
                Some(0) => warn!("Render error: {}", e),
                Some(suppressed) => warn!(
                    "Render error (repeated {} more times in the last {:?}): {}",
                    suppressed, ERROR_LOG_WINDOW, e
                ),
                None => {}
            },
        }
    }
}

/// Render errors are logged at most once per window.
const ERROR_LOG_WINDOW: Duration = Duration::from_secs(60);

/// Rate limit for repeated error logs.
struct ErrorThrottle {
    window: Duration,
    last_log: Option<Instant>,
    suppressed: u32,
}

impl ErrorThrottle {
    fn new(window: Duration) -> Self {
        Self {
            window,
            last_log: None,
            suppressed: 0,
        }
    }

    /// Records an error at `now`. Returns the number of errors suppressed
    /// since the last log when this one should be logged.
    fn record(&mut self, now: Instant) -> Option<u32> {
        match self.last_log {
            Some(last) if now.duration_since(last) < self.window => {
                self.suppressed += 1;
                None
            }
            _ => {
                self.last_log = Some(now);
                Some(std::mem::take(&mut self.suppressed))
            }
        }
    }
}
