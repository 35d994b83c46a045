//! Simulator application setup and execution
//!
//! Builds the headless Bevy app that plays the tracking delivery thread and
//! runs it in the background at the simulated sample rate.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bevy::app::{App, PluginGroup, ScheduleRunnerPlugin, Update};
use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::MinimalPlugins;
use crossbeam_channel::Receiver;
use tracing::info;

use super::resources::{
    BridgeRes, CameraFeed, DevicePose, SimulationState, TrackerCommandReceiver,
};
use super::systems::{advance_device_pose, apply_tracker_commands, deliver_sample};
use super::TrackerCommand;
use crate::config::simulator::{CAMERA_HEIGHT, CAMERA_WIDTH, SAMPLE_RATE_HZ};
use crate::tauri_bridge::SessionBridge;

/// Create and configure the simulator app
pub fn create_app(bridge: Arc<SessionBridge>, commands: Receiver<TrackerCommand>) -> App {
    let mut app = App::new();

    // No window, no renderer: only the scheduler, time and task pools
    app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(
        Duration::from_secs_f64(1.0 / SAMPLE_RATE_HZ),
    )));

    app.add_systems(
        Update,
        (apply_tracker_commands, advance_device_pose, deliver_sample).chain(),
    );

    app.insert_resource(BridgeRes(bridge));
    app.insert_resource(TrackerCommandReceiver(commands));
    app.insert_resource(SimulationState::default());
    app.insert_resource(DevicePose::default());
    app.insert_resource(CameraFeed::new(CAMERA_WIDTH, CAMERA_HEIGHT));

    info!(rate_hz = SAMPLE_RATE_HZ, "simulator configured");
    app
}

/// Start the simulator on a dedicated tracking delivery thread
pub fn start_simulator(
    bridge: Arc<SessionBridge>,
    commands: Receiver<TrackerCommand>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("tracking-delivery".into())
        .spawn(move || {
            info!("simulator thread started");
            let mut app = create_app(bridge, commands);
            app.run();
        })
}
