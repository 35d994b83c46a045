//! Bridge layer between the web runtime and the tracking session
//!
//! This module handles all communication between the page and the tracker:
//! frame encoding, the shared frame slot, the `arframe://` protocol, the
//! per-tick payload, and the inbound command channel.

pub mod commands;
pub mod encoder;
pub mod messages;
pub mod payload;
pub mod protocol;
pub mod script;
pub mod session;
pub mod shared_state;

// Re-export commonly used types
pub use encoder::FrameEncoder;
pub use messages::BridgeMessage;
pub use protocol::FrameResourceServer;
pub use script::{ScriptSink, WebviewScriptSink};
pub use session::{SessionBridge, SessionPhase};
pub use shared_state::{EncodedFrame, FrameCache, FrameMetadata};
