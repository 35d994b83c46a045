//! Simulator systems
//!
//! Run every update in order: apply bridge commands, move the device, emit
//! one sample.

use bevy::ecs::prelude::{Res, ResMut};
use bevy::time::Time;
use tracing::{debug, info};

use super::resources::{
    BridgeRes, CameraFeed, DevicePose, SimulationState, TrackerCommandReceiver,
};
use super::TrackerCommand;
use crate::config::simulator::{FIELD_OF_VIEW_Y, ORBIT_SPEED};
use crate::tracking::{projection_for_viewport, TrackingSample};

/// Drain start/pause requests sent by the bridge
pub fn apply_tracker_commands(
    receiver: Res<TrackerCommandReceiver>,
    mut state: ResMut<SimulationState>,
) {
    while let Ok(command) = receiver.0.try_recv() {
        match command {
            TrackerCommand::Start(config) => {
                info!(?config, "simulated tracking started");
                state.session = Some(config);
                state.samples = 0;
            }
            TrackerCommand::Pause => {
                if state.session.take().is_some() {
                    info!(samples = state.samples, "simulated tracking paused");
                }
            }
        }
    }
}

/// Advance the device along its orbit
pub fn advance_device_pose(
    time: Res<Time>,
    state: Res<SimulationState>,
    mut pose: ResMut<DevicePose>,
) {
    if !state.is_running() {
        return;
    }
    pose.yaw = (pose.yaw + time.delta_secs() * ORBIT_SPEED) % std::f32::consts::TAU;
}

/// Build a sample from the current pose and camera feed and hand it to the bridge
pub fn deliver_sample(
    time: Res<Time>,
    bridge: Res<BridgeRes>,
    pose: Res<DevicePose>,
    mut state: ResMut<SimulationState>,
    mut feed: ResMut<CameraFeed>,
) {
    let Some(session) = &state.session else {
        return;
    };

    let config = bridge.0.config();
    let viewport = bridge.0.viewport();
    let elapsed = time.elapsed_secs_f64();
    let ambient_intensity = session
        .light_estimation
        .then(|| 1000.0 + 150.0 * (elapsed as f32 * 0.5).sin());

    let sample = TrackingSample {
        timestamp: elapsed,
        camera_transform: pose.camera_transform(),
        view_matrix: pose.view_matrix(),
        projection: projection_for_viewport(
            viewport.width,
            viewport.height,
            FIELD_OF_VIEW_Y,
            config.near_plane,
            config.far_plane,
        ),
        ambient_intensity,
        camera_image: feed.next_image(),
    };

    bridge.0.on_sample(&sample);
    state.samples += 1;
    if state.samples % 600 == 0 {
        debug!(samples = state.samples, "simulated samples delivered");
    }
}
