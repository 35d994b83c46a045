//! Per-tick JSON payload pushed to the page's data callback

use serde::Serialize;
use serde_json::Value;

use super::shared_state::EncodedFrame;
use crate::config::session::WORLD_MAPPING_STATUS;
use crate::tracking::TrackingSample;

/// Outbound frame data, shaped for the WebXR polyfill
///
/// Matrices are column-major, 16 floats each. Image fields are present only
/// on ticks that inline a frame.
#[derive(Debug, Clone, Serialize)]
pub struct FramePayload {
    /// Milliseconds
    pub timestamp: f64,
    pub light_intensity: f64,
    pub camera_transform: [f32; 16],
    pub camera_view: [f32; 16],
    pub projection_camera: [f32; 16],
    #[serde(rename = "worldMappingStatus")]
    pub world_mapping_status: &'static str,
    // Object detection is not implemented; the lists are always empty.
    pub objects: Vec<Value>,
    #[serde(rename = "newObjects")]
    pub new_objects: Vec<Value>,
    #[serde(rename = "removedObjects")]
    pub removed_objects: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_height: Option<u32>,
}

impl FramePayload {
    pub fn from_sample(sample: &TrackingSample, default_light: f64) -> Self {
        Self {
            timestamp: sample.timestamp * 1000.0,
            light_intensity: sample
                .ambient_intensity
                .map(f64::from)
                .unwrap_or(default_light),
            camera_transform: sample.camera_transform.to_cols_array(),
            camera_view: sample.view_matrix.to_cols_array(),
            projection_camera: sample.projection.to_cols_array(),
            world_mapping_status: WORLD_MAPPING_STATUS,
            objects: Vec::new(),
            new_objects: Vec::new(),
            removed_objects: Vec::new(),
            video_data: None,
            video_width: None,
            video_height: None,
        }
    }

    /// Embed `frame` as Base64 (inline transfer mode)
    pub fn attach_inline(&mut self, frame: &EncodedFrame) {
        self.video_data = Some(frame.to_base64());
        self.video_width = Some(frame.width());
        self.video_height = Some(frame.height());
    }

    pub fn has_image(&self) -> bool {
        self.video_data.is_some()
    }
}
