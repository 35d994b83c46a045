//! Shared state between the tracking thread and the frame protocol
//!
//! The only cross-thread mutable value in the bridge is the latest encoded
//! camera frame. It lives in a single slot behind one mutex; publishing
//! swaps the whole value, reading clones a handle to it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

// =============================================================================
// Encoded Frame
// =============================================================================

/// JPEG camera frame after rotation, crop and downscale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    data: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl EncodedFrame {
    pub const CONTENT_TYPE: &'static str = "image/jpeg";

    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data: data.into(),
            width,
            height,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Base64 of the encoded bytes. Recomputed on every call.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

// =============================================================================
// Frame Cache
// =============================================================================

/// Size and availability of the cached frame, served as `arframe://metadata`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameMetadata {
    pub width: u32,
    pub height: u32,
    pub available: bool,
}

/// Consistent view of the cache at one instant
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot(Option<EncodedFrame>);

impl CacheSnapshot {
    pub fn frame(&self) -> Option<&EncodedFrame> {
        self.0.as_ref()
    }

    pub fn into_frame(self) -> Option<EncodedFrame> {
        self.0
    }

    pub fn metadata(&self) -> FrameMetadata {
        match &self.0 {
            Some(frame) => FrameMetadata {
                width: frame.width,
                height: frame.height,
                available: true,
            },
            None => FrameMetadata::default(),
        }
    }
}

/// Single-slot store of the most recently published frame
///
/// Cloning yields another handle to the same slot. Written by the tracking
/// thread, read by protocol handler threads.
#[derive(Clone, Default)]
pub struct FrameCache(Arc<Mutex<Option<EncodedFrame>>>);

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached frame
    pub fn publish(&self, frame: EncodedFrame) {
        let previous = self.slot().replace(frame);
        // old bytes are released outside the lock
        drop(previous);
    }

    pub fn read(&self) -> CacheSnapshot {
        CacheSnapshot(self.slot().clone())
    }

    pub fn metadata(&self) -> FrameMetadata {
        self.read().metadata()
    }

    // The slot always holds a whole value, so a poisoned lock is still usable.
    fn slot(&self) -> MutexGuard<'_, Option<EncodedFrame>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
