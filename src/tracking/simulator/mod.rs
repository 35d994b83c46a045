//! Simulated tracking subsystem
//!
//! Stands in for native tracking on desktop: a headless Bevy app on its own
//! thread emits samples at a fixed rate while a session is running. The
//! device orbits the origin, the camera feed is a moving NV12 test pattern,
//! and light is estimated when the session asks for it.

pub mod app;
pub mod resources;
pub mod systems;

use crossbeam_channel::{Receiver, Sender};
use tracing::warn;

use super::{SessionConfiguration, TrackingSession};
use crate::error::TrackingError;

pub use app::start_simulator;

/// Control message sent from the bridge to the simulator thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCommand {
    Start(SessionConfiguration),
    Pause,
}

/// [`TrackingSession`] handle to the simulator thread
#[derive(Clone)]
pub struct SimulatedTracker {
    commands: Sender<TrackerCommand>,
}

impl SimulatedTracker {
    /// Create the handle and the receiving end for [`start_simulator`]
    pub fn new() -> (Self, Receiver<TrackerCommand>) {
        let (commands, receiver) = crossbeam_channel::unbounded();
        (Self { commands }, receiver)
    }
}

impl TrackingSession for SimulatedTracker {
    fn start(&self, config: &SessionConfiguration) -> Result<(), TrackingError> {
        self.commands
            .send(TrackerCommand::Start(config.clone()))
            .map_err(|_| TrackingError::Unavailable("simulator thread has exited".into()))
    }

    fn pause(&self) {
        if self.commands.send(TrackerCommand::Pause).is_err() {
            warn!("simulator thread has exited, pause dropped");
        }
    }
}
