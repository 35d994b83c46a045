//! Boundary with the spatial-tracking subsystem
//!
//! The bridge never talks to tracking hardware directly. It receives
//! [`TrackingSample`]s on the delivery thread and drives the subsystem
//! through the [`TrackingSession`] trait. [`simulator`] provides a
//! desktop implementation.

pub mod simulator;

use bevy::math::Mat4;

use crate::error::TrackingError;

/// Memory layout of a raw camera buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit RGBA, alpha ignored
    Rgba8,
    /// 8-bit BGRA, alpha ignored
    Bgra8,
    /// Bi-planar full-range YCbCr 4:2:0. Luma plane of `height` rows, then an
    /// interleaved CbCr plane of `height / 2` rows, both with the same stride.
    Nv12,
}

/// Raw camera buffer as delivered by the sensor (landscape, pre-rotation)
#[derive(Debug, Clone)]
pub struct CameraImage {
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes; may include alignment padding
    pub bytes_per_row: usize,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl CameraImage {
    /// Tightly packed buffer (no row padding)
    pub fn packed(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        let bytes_per_row = match format {
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => width as usize * 4,
            PixelFormat::Nv12 => width as usize,
        };
        Self {
            width,
            height,
            bytes_per_row,
            format,
            data,
        }
    }
}

/// One timestamped update from the tracking subsystem
///
/// Lent to the bridge for the duration of a single callback.
#[derive(Debug, Clone)]
pub struct TrackingSample {
    /// Seconds on the tracker's monotonic clock
    pub timestamp: f64,
    /// Camera-to-world
    pub camera_transform: Mat4,
    /// World-to-camera
    pub view_matrix: Mat4,
    pub projection: Mat4,
    /// Ambient intensity in lumens, when the tracker estimates light
    pub ambient_intensity: Option<f32>,
    pub camera_image: CameraImage,
}

/// Plane orientations the tracker should detect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaneDetection {
    pub horizontal: bool,
    pub vertical: bool,
}

/// Configuration handed to [`TrackingSession::start`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfiguration {
    pub plane_detection: PlaneDetection,
    pub light_estimation: bool,
}

impl SessionConfiguration {
    /// The fixed capability set requested by `requestSession`
    pub fn world_tracking() -> Self {
        Self {
            plane_detection: PlaneDetection {
                horizontal: true,
                vertical: true,
            },
            light_estimation: true,
        }
    }
}

/// Control surface of the tracking subsystem
pub trait TrackingSession: Send + Sync {
    /// Start (or restart) tracking with `config`
    fn start(&self, config: &SessionConfiguration) -> Result<(), TrackingError>;

    /// Pause tracking; no further samples are expected until the next start
    fn pause(&self);
}

/// Right-handed perspective projection for a viewport
///
/// Degenerate viewports fall back to a square aspect.
pub fn projection_for_viewport(
    width: u32,
    height: u32,
    fov_y: f32,
    near: f32,
    far: f32,
) -> Mat4 {
    let aspect = if width == 0 || height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    };
    Mat4::perspective_rh_gl(fov_y, aspect, near, far)
}
