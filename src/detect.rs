//! Periodic card detection over the live capture surface.
//!
//! While started, the poller samples the surface every 500 ms, sends the
//! encoded frame to the backend classifier and republishes the latest
//! "card present" boolean. Failed cycles leave the published value
//! untouched; a cycle that is still in flight when the next tick fires
//! causes that tick to be dropped, never queued, so at most one request
//! is outstanding at any time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::api::ApiClient;
use crate::capture::CaptureSurface;

/// Interval between detection cycles
const DETECTION_INTERVAL: Duration = Duration::from_millis(500);

/// JPEG quality for sampled frames. The classifier only needs rough
/// geometry, so frames are kept small.
const FRAME_JPEG_QUALITY: f32 = 0.6;

/// Latest published detection result, shared by handle with the UI.
/// Reset by constructing a fresh state for each capture session.
#[derive(Clone, Default)]
pub struct DetectionState {
    card_detected: Arc<AtomicBool>,
}

impl DetectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn card_detected(&self) -> bool {
        self.card_detected.load(Ordering::Relaxed)
    }

    fn publish(&self, detected: bool) {
        self.card_detected.store(detected, Ordering::Relaxed);
    }
}

/// Periodic detection task driver.
///
/// `start` and `stop` are both idempotent. Stopping signals the task to
/// exit before its next tick; a cycle that already started finishes and
/// its result is still published, which is harmless once the surface is
/// gone.
pub struct DetectionPoller {
    api: ApiClient,
    surface: Arc<dyn CaptureSurface>,
    state: DetectionState,
    interval: Duration,
    stop_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl DetectionPoller {
    pub fn new(api: ApiClient, surface: Arc<dyn CaptureSurface>, state: DetectionState) -> Self {
        Self {
            api,
            surface,
            state,
            interval: DETECTION_INTERVAL,
            stop_tx: None,
            handle: None,
        }
    }

    /// Override the polling interval (tests poll faster)
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Start polling. No-op when already running, so a double start
    /// never produces a second timer.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let api = self.api.clone();
        let surface = Arc::clone(&self.surface);
        let state = self.state.clone();
        let interval = self.interval;

        self.handle = Some(tokio::spawn(Self::run(
            api, surface, state, interval, stop_rx,
        )));
        self.stop_tx = Some(stop_tx);
        debug!("Detection polling started");
    }

    /// Stop polling. No-op when idle. An in-flight cycle is not aborted;
    /// no further cycle starts after this returns.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
            debug!("Detection polling stopped");
        }
        self.handle = None;
    }

    async fn run(
        api: ApiClient,
        surface: Arc<dyn CaptureSurface>,
        state: DetectionState,
        interval: Duration,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        // A tick that lands while a cycle is in flight is dropped, not
        // replayed in a burst afterwards
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = stop_rx.changed() => break,
                _ = ticker.tick() => {
                    Self::run_cycle(&api, surface.as_ref(), &state).await;
                }
            }
        }
    }

    /// One detection cycle. Never fails: every outcome is either a
    /// published boolean or a silent skip.
    async fn run_cycle(api: &ApiClient, surface: &dyn CaptureSurface, state: &DetectionState) {
        if !surface.has_stream() || surface.width() == 0 {
            return;
        }

        let Some(frame) = surface.to_jpeg(FRAME_JPEG_QUALITY) else {
            return;
        };

        match api.detect_card(frame).await {
            Ok(response) => state.publish(response.card_detected),
            // Transient failures are expected while the operator moves the
            // part around; keep the last published value
            Err(e) => debug!(error = %e, "Detection cycle failed"),
        }
    }
}

impl Drop for DetectionPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
