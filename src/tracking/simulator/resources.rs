//! Simulator resources
//!
//! Singleton state shared by the simulator systems.

use std::sync::Arc;

use bevy::ecs::prelude::Resource;
use bevy::math::{Mat4, Vec3};
use crossbeam_channel::Receiver;

use super::TrackerCommand;
use crate::config::simulator::{EYE_HEIGHT, ORBIT_RADIUS};
use crate::tauri_bridge::SessionBridge;
use crate::tracking::{CameraImage, PixelFormat, SessionConfiguration};

// =============================================================================
// Bridge & Control
// =============================================================================

/// Bridge receiving the generated samples
#[derive(Resource, Clone)]
pub struct BridgeRes(pub Arc<SessionBridge>);

/// Start/pause requests from the bridge
#[derive(Resource)]
pub struct TrackerCommandReceiver(pub Receiver<TrackerCommand>);

/// Whether a session is running, and with which configuration
#[derive(Resource, Default)]
pub struct SimulationState {
    pub session: Option<SessionConfiguration>,
    /// Samples delivered in the current session
    pub samples: u64,
}

impl SimulationState {
    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }
}

// =============================================================================
// Device Pose
// =============================================================================

/// Device orbiting the tracking origin at eye height, looking at the centre
#[derive(Resource)]
pub struct DevicePose {
    /// Horizontal angle around the centre (radians)
    pub yaw: f32,
    pub radius: f32,
    pub height: f32,
    pub center: Vec3,
}

impl Default for DevicePose {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            radius: ORBIT_RADIUS,
            height: EYE_HEIGHT,
            center: Vec3::ZERO,
        }
    }
}

impl DevicePose {
    pub fn eye(&self) -> Vec3 {
        self.center + Vec3::new(self.radius * self.yaw.sin(), self.height, self.radius * self.yaw.cos())
    }

    /// World-to-camera
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.center, Vec3::Y)
    }

    /// Camera-to-world
    pub fn camera_transform(&self) -> Mat4 {
        self.view_matrix().inverse()
    }
}

// =============================================================================
// Camera Feed
// =============================================================================

/// Synthetic landscape NV12 camera
#[derive(Resource)]
pub struct CameraFeed {
    pub width: u32,
    pub height: u32,
    pub frame: u64,
}

impl CameraFeed {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame: 0,
        }
    }

    /// Next frame of a diagonal stripe pattern drifting to the right
    pub fn next_image(&mut self) -> CameraImage {
        let (width, height) = (self.width as usize, self.height as usize);
        let shift = (self.frame * 3) as usize;
        self.frame += 1;

        let mut data = Vec::with_capacity(width * height * 3 / 2);
        for y in 0..height {
            data.extend((0..width).map(|x| ((x + y + 256 - shift % 256) & 0xFF) as u8));
        }
        let tint = (self.frame % 64) as u8;
        for _ in 0..height / 2 {
            for _ in 0..width / 2 {
                data.extend_from_slice(&[96 + tint, 160 - tint]);
            }
        }

        CameraImage::packed(self.width, self.height, PixelFormat::Nv12, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_produces_valid_nv12() {
        let mut feed = CameraFeed::new(64, 36);
        let first = feed.next_image();
        let second = feed.next_image();
        assert_eq!(first.data.len(), 64 * 36 * 3 / 2);
        assert_eq!(first.format, PixelFormat::Nv12);
        assert_ne!(first.data, second.data);
    }

    #[test]
    fn test_pose_looks_at_center() {
        let pose = DevicePose {
            yaw: 0.7,
            ..Default::default()
        };
        let camera = pose.camera_transform();
        let eye = camera.transform_point3(Vec3::ZERO);
        assert!((eye - pose.eye()).length() < 1e-4);
        // camera looks down its -Z axis
        let forward = camera.transform_vector3(Vec3::NEG_Z).normalize();
        let to_center = (pose.center - pose.eye()).normalize();
        assert!(forward.dot(to_center) > 0.9999);
        assert!((camera * pose.view_matrix()).abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }
}
