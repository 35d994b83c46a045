//! Session bridge between the tracker and the page
//!
//! Owns the session lifecycle (`Idle` / `Running`), turns tracking samples
//! into payloads for the page's data callback, and answers the page's
//! inbound commands.
//!
//! Threads:
//! - [`SessionBridge::on_sample`] runs on the tracking delivery thread.
//! - [`SessionBridge::handle_message`] and [`SessionBridge::set_viewport`]
//!   run on the UI / command thread.
//!
//! Both sides meet at one small state lock. Delivery to the page happens
//! while that lock is held, so a stop either lands before a delivery (which
//! is then skipped) or after it, never in between.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::json;
use tracing::{debug, info, trace, warn};

use super::encoder::FrameEncoder;
use super::messages::BridgeMessage;
use super::payload::FramePayload;
use super::script::{invoke_callback, Reply, ScriptSink};
use super::shared_state::FrameCache;
use crate::config::{BridgeConfig, TransferMode};
use crate::tracking::{SessionConfiguration, TrackingSample, TrackingSession};

/// Lifecycle of the (single) tracking session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Running {
        data_callback: String,
    },
}

/// Size of the page's viewport in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Width / height, or `None` while either side is zero
    pub fn aspect(&self) -> Option<f64> {
        (self.width > 0 && self.height > 0).then(|| self.width as f64 / self.height as f64)
    }
}

/// Gate for the expensive image work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameThrottle {
    interval: u64,
}

impl FrameThrottle {
    pub fn new(interval: u32) -> Self {
        Self {
            interval: u64::from(interval.max(1)),
        }
    }

    /// Whether tick number `tick` (1-based) processes an image
    pub fn should_process(&self, tick: u64) -> bool {
        tick % self.interval == 0
    }
}

#[derive(Debug, Default)]
struct BridgeState {
    phase: SessionPhase,
    viewport: Viewport,
}

/// Bridges one tracking session into the page
pub struct SessionBridge {
    config: BridgeConfig,
    encoder: FrameEncoder,
    throttle: FrameThrottle,
    cache: FrameCache,
    tracker: Arc<dyn TrackingSession>,
    script: Arc<dyn ScriptSink>,
    state: Mutex<BridgeState>,
    // touched only from the delivery thread, reset on session start
    ticks: AtomicU64,
}

impl SessionBridge {
    pub fn new(
        config: BridgeConfig,
        cache: FrameCache,
        tracker: Arc<dyn TrackingSession>,
        script: Arc<dyn ScriptSink>,
    ) -> Self {
        Self {
            encoder: FrameEncoder::new(config.jpeg_quality),
            throttle: FrameThrottle::new(config.skip_interval),
            config,
            cache,
            tracker,
            script,
            state: Mutex::new(BridgeState::default()),
            ticks: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.state().phase.clone()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state().phase, SessionPhase::Running { .. })
    }

    pub fn viewport(&self) -> Viewport {
        self.state().viewport
    }

    pub fn set_viewport(&self, width: u32, height: u32) {
        self.state().viewport = Viewport { width, height };
        debug!(width, height, "viewport updated");
    }

    // =========================================================================
    // Tracking delivery
    // =========================================================================

    /// Process one tracking sample. Ignored unless a session is running.
    pub fn on_sample(&self, sample: &TrackingSample) {
        let (data_callback, viewport) = {
            let state = self.state();
            match &state.phase {
                SessionPhase::Running { data_callback } => (data_callback.clone(), state.viewport),
                SessionPhase::Idle => return,
            }
        };

        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let mut payload = FramePayload::from_sample(sample, self.config.default_light_intensity);

        if self.throttle.should_process(tick) {
            self.process_image(sample, viewport, &mut payload);
        }

        let json = match serde_json::to_string(&payload) {
            Ok(json) => json,
            Err(e) => {
                warn!(tick, error = %e, "payload serialization failed, dropping tick");
                return;
            }
        };
        let script = invoke_callback(&data_callback, &json);

        // Recheck under the lock: a stop that arrived mid-tick wins.
        let state = self.state();
        match &state.phase {
            SessionPhase::Running { data_callback: current } if *current == data_callback => {
                if let Err(e) = self.script.evaluate(&script) {
                    warn!(tick, error = %e, "payload delivery failed");
                } else {
                    trace!(tick, bytes = json.len(), "payload delivered");
                }
            }
            _ => debug!(tick, "session stopped mid-tick, payload dropped"),
        }
    }

    fn process_image(
        &self,
        sample: &TrackingSample,
        viewport: Viewport,
        payload: &mut FramePayload,
    ) {
        let Some(aspect) = viewport.aspect() else {
            debug!("viewport size unknown, skipping image");
            return;
        };

        match self.encoder.transform(&sample.camera_image, aspect) {
            Ok(frame) => match self.config.transfer_mode {
                TransferMode::Binary => self.cache.publish(frame),
                TransferMode::Inline => payload.attach_inline(&frame),
            },
            Err(e) => debug!(error = %e, "frame encoding failed, omitting image"),
        }
    }

    // =========================================================================
    // Inbound commands
    // =========================================================================

    pub fn handle_message(&self, message: BridgeMessage) {
        match message {
            BridgeMessage::Init { callback } => {
                info!("page initialised bridge");
                if let Some(callback) = callback {
                    self.reply(&callback, Reply::Text(self.config.device_id.clone()));
                }
            }
            BridgeMessage::RequestSession {
                options,
                data_callback,
                callback,
            } => {
                debug!(?options, "session requested");
                self.start_session(data_callback, callback);
            }
            BridgeMessage::StopSession { .. } => self.stop_session(),
            BridgeMessage::HitTest => debug!("hit testing is not supported, ignoring"),
            BridgeMessage::ErrorReport { message } => {
                warn!(target: "arbridge::page", %message, "script error reported by page");
            }
        }
    }

    fn start_session(&self, data_callback: String, callback: Option<String>) {
        if let Err(e) = self.tracker.start(&SessionConfiguration::world_tracking()) {
            warn!(error = %e, "tracker failed to start, session stays idle");
            return;
        }

        {
            let mut state = self.state();
            self.ticks.store(0, Ordering::Relaxed);
            state.phase = SessionPhase::Running {
                data_callback: data_callback.clone(),
            };
        }
        info!(%data_callback, "session running");

        if let Some(callback) = callback {
            self.reply(
                &callback,
                Reply::Object(json!({
                    "cameraAccess": true,
                    "worldAccess": true,
                    "webXRAccess": true,
                })),
            );
        }
    }

    fn stop_session(&self) {
        let was_running = {
            let mut state = self.state();
            std::mem::take(&mut state.phase) != SessionPhase::Idle
        };
        self.tracker.pause();
        if was_running {
            info!("session stopped");
        }
    }

    /// The tracker ended the session on its own
    pub fn on_session_ended(&self) {
        let mut state = self.state();
        if state.phase != SessionPhase::Idle {
            state.phase = SessionPhase::Idle;
            info!("session ended by tracker");
        }
    }

    fn reply(&self, callback: &str, reply: Reply) {
        let result = reply
            .to_argument()
            .and_then(|argument| self.script.evaluate(&invoke_callback(callback, &argument)));
        if let Err(e) = result {
            warn!(%callback, error = %e, "reply delivery failed");
        }
    }

    fn state(&self) -> MutexGuard<'_, BridgeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording doubles for the bridge's collaborators

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::error::{ScriptError, TrackingError};
    use crate::tauri_bridge::script::ScriptSink;
    use crate::tracking::{SessionConfiguration, TrackingSession};

    #[derive(Default)]
    pub struct RecordingSink {
        pub scripts: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        pub fn scripts(&self) -> Vec<String> {
            self.scripts.lock().unwrap().clone()
        }

        pub fn calls_to(&self, callback: &str) -> Vec<String> {
            let needle = format!("window[\"{callback}\"]");
            self.scripts()
                .into_iter()
                .filter(|s| s.contains(&needle))
                .collect()
        }
    }

    impl ScriptSink for RecordingSink {
        fn evaluate(&self, script: &str) -> Result<(), ScriptError> {
            self.scripts.lock().unwrap().push(script.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct RecordingTracker {
        pub starts: Mutex<Vec<SessionConfiguration>>,
        pub pauses: AtomicUsize,
        pub refuse: bool,
    }

    impl TrackingSession for RecordingTracker {
        fn start(&self, config: &SessionConfiguration) -> Result<(), TrackingError> {
            if self.refuse {
                return Err(TrackingError::Unavailable("no camera".into()));
            }
            self.starts.lock().unwrap().push(config.clone());
            Ok(())
        }

        fn pause(&self) {
            self.pauses.fetch_add(1, Ordering::SeqCst);
        }
    }
}
