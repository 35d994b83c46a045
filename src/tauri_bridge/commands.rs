//! Tauri command handlers
//!
//! The page reaches the bridge through a single command, `post_message`,
//! mirroring a native message-handler channel: a channel name plus a JSON
//! body. Malformed messages are dropped; nothing is reported back.

use std::sync::Arc;

use serde_json::Value;
use tauri::State;
use tracing::debug;

use super::messages::BridgeMessage;
use super::session::SessionBridge;

/// Receive one inbound bridge message from the page
#[tauri::command]
pub fn post_message(bridge: State<'_, Arc<SessionBridge>>, channel: String, body: Value) {
    dispatch(&bridge, &channel, &body);
}

/// Parse and route a message; invalid input is logged and ignored
pub fn dispatch(bridge: &SessionBridge, channel: &str, body: &Value) {
    match BridgeMessage::parse(channel, body) {
        Ok(message) => bridge.handle_message(message),
        Err(e) => debug!(%channel, error = %e, "ignoring inbound message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::tauri_bridge::session::testing::{RecordingSink, RecordingTracker};
    use crate::tauri_bridge::session::SessionPhase;
    use crate::tauri_bridge::shared_state::FrameCache;
    use serde_json::json;

    #[test]
    fn test_malformed_request_is_ignored() {
        let sink = Arc::new(RecordingSink::default());
        let tracker = Arc::new(RecordingTracker::default());
        let bridge = SessionBridge::new(
            BridgeConfig::default(),
            FrameCache::new(),
            tracker.clone(),
            sink.clone(),
        );

        dispatch(&bridge, "requestSession", &json!({"data_callback": "cb", "callback": "ack"}));
        dispatch(&bridge, "warpDrive", &json!({}));

        assert_eq!(bridge.phase(), SessionPhase::Idle);
        assert!(tracker.starts.lock().unwrap().is_empty());
        assert!(sink.scripts().is_empty());
    }

    #[test]
    fn test_valid_request_starts_session() {
        let sink = Arc::new(RecordingSink::default());
        let bridge = SessionBridge::new(
            BridgeConfig::default(),
            FrameCache::new(),
            Arc::new(RecordingTracker::default()),
            sink.clone(),
        );

        dispatch(
            &bridge,
            "requestSession",
            &json!({"options": {}, "data_callback": "cb", "callback": "ack"}),
        );
        assert!(bridge.is_running());
        assert_eq!(sink.calls_to("ack").len(), 1);

        dispatch(&bridge, "stopAR", &json!({}));
        assert!(!bridge.is_running());
    }
}
