//! arbridge: spatial-tracking session bridged into a WebXR-style web runtime
//!
//! A tracking session (device pose, camera imagery, light estimate) is
//! forwarded to a page running a WebXR polyfill inside a Tauri webview.
//!
//! Architecture:
//! - The tracker delivers samples on its own thread (here: a headless Bevy
//!   app simulating a device)
//! - Every sample becomes a JSON payload evaluated into the page's data callback
//! - Every n-th sample also runs the camera image through rotate/crop/scale/JPEG
//! - Encoded frames go to a single-slot cache served over `arframe://`, or are
//!   inlined as Base64 in the payload
//!
//! # Module Structure
//!
//! - `config`: Constants and the runtime [`config::BridgeConfig`]
//! - `error`: Error types
//! - `logging`: Tracing subscriber setup
//! - `tauri_bridge`: Bridge layer between the page and the tracker
//!   - `shared_state`: Single-slot frame cache
//!   - `encoder`: Camera image transform + JPEG
//!   - `protocol`: `arframe://` handler
//!   - `payload`: Per-tick JSON payload
//!   - `messages`: Inbound messages
//!   - `script`: Script evaluation, replies, injected capability script
//!   - `session`: Session state machine
//!   - `commands`: Tauri command handlers
//! - `tracking`: Tracking boundary types and the simulated tracker

pub mod config;
pub mod error;
pub mod logging;
pub mod tauri_bridge;
pub mod tracking;

use std::sync::Arc;

use tauri::{Manager, WebviewUrl, WebviewWindowBuilder, WindowEvent};
use tracing::{error, info, warn};

use config::{BridgeConfig, FRAME_SCHEME};
use tauri_bridge::{
    script::capability_script, FrameCache, FrameResourceServer, SessionBridge, WebviewScriptSink,
};
use tracking::simulator::{start_simulator, SimulatedTracker};

/// Main entry point for the Tauri application
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    if let Err(e) = logging::init(logging::LogFormat::from_env()) {
        eprintln!("logging already initialized: {e}");
    }
    info!("starting");

    let config = BridgeConfig::from_env().unwrap_or_else(|e| {
        warn!(error = %e, "invalid bridge config, using defaults");
        BridgeConfig::default()
    });
    info!(?config, "bridge configured");

    // One frame slot, shared by the bridge (writer) and the protocol (reader)
    let cache = FrameCache::new();
    let server = FrameResourceServer::new(cache.clone());

    tauri::Builder::default()
        // Register custom protocol "arframe://" for direct binary transfer
        .register_asynchronous_uri_scheme_protocol(FRAME_SCHEME, move |_ctx, request, responder| {
            let server = server.clone();
            // Handle the request in a separate thread to avoid blocking
            std::thread::spawn(move || {
                responder.respond(server.respond(&request));
            });
        })
        .setup(move |app| {
            let window = WebviewWindowBuilder::new(app, "main", WebviewUrl::default())
                .title("arbridge")
                .inner_size(420.0, 800.0)
                .initialization_script(capability_script())
                .build()?;

            let (tracker, commands) = SimulatedTracker::new();
            let bridge = Arc::new(SessionBridge::new(
                config,
                cache,
                Arc::new(tracker),
                Arc::new(WebviewScriptSink::new(window.clone())),
            ));

            match window.inner_size() {
                Ok(size) => bridge.set_viewport(size.width, size.height),
                Err(e) => warn!(error = %e, "could not read initial viewport size"),
            }

            start_simulator(bridge.clone(), commands)?;
            app.manage(bridge);
            Ok(())
        })
        .on_window_event(|window, event| {
            if let WindowEvent::Resized(size) = event {
                if let Some(bridge) = window.try_state::<Arc<SessionBridge>>() {
                    bridge.set_viewport(size.width, size.height);
                }
            }
        })
        .invoke_handler(tauri::generate_handler![
            tauri_bridge::commands::post_message
        ])
        .run(tauri::generate_context!())
        .unwrap_or_else(|e| {
            error!(error = %e, "tauri runtime failed");
            std::process::exit(1);
        });
}
