//! Control-channel glue between the network client and the rendering core
//!
//! The external control client owns the socket; it hands parsed (or raw JSON)
//! commands to the [`TileController`], which routes them into the layout slot
//! and the readiness gate. Malformed input is logged and dropped so a bad
//! payload can never take down the render loop.

pub mod protocol;

pub use protocol::{
    CornerPoint, GridInfo, GridPos, LayoutDocument, LayoutEntry, PlaybackLayout, ProtocolError,
    RelativeRect, ServerCommand,
};

use std::sync::Arc;

use crate::layout::LayoutSlot;
use crate::session::ReadinessCoordinator;

/// What the host should currently present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Calibration marker image (host-owned asset keyed by marker id)
    #[default]
    Marker,
    /// The warped video tile
    Tile,
}

/// Routes server commands into the core's state
pub struct TileController {
    /// This device's marker id, once assigned
    marker_id: Option<i32>,
    display_mode: DisplayMode,
    slot: LayoutSlot,
    coordinator: Arc<ReadinessCoordinator>,
}

impl TileController {
    pub fn new(slot: LayoutSlot, coordinator: Arc<ReadinessCoordinator>) -> Self {
        Self {
            marker_id: None,
            display_mode: DisplayMode::default(),
            slot,
            coordinator,
        }
    }

    /// Assigned marker id, if any
    pub fn marker_id(&self) -> Option<i32> {
        self.marker_id
    }

    /// What the host should show right now
    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    /// Writer side of the layout channel
    pub fn layout_slot(&self) -> &LayoutSlot {
        &self.slot
    }

    /// Parse and apply one raw control message
    pub fn apply_json(&mut self, text: &str) {
        match ServerCommand::from_json(text) {
            Ok(cmd) => self.apply(cmd),
            Err(e) => log::warn!("Discarding unparseable control message: {}", e),
        }
    }

    /// Apply a parsed server command.
    ///
    /// A `start_playback` whose payload fails to decode or resolve counts as
    /// no layout update: the previous mapping stays live.
    pub fn apply(&mut self, command: ServerCommand) {
        match command {
            ServerCommand::AssignId { marker_id } => {
                log::info!("Assigned marker id {}", marker_id);
                self.marker_id = Some(marker_id);
            }
            ServerCommand::ShowMarker => {
                log::info!("Showing calibration marker");
                self.display_mode = DisplayMode::Marker;
            }
            ServerCommand::StartPlayback { data } => self.start_playback(&data),
            ServerCommand::StopPlayback => {
                log::info!("Stop requested; hiding tile");
                self.display_mode = DisplayMode::Marker;
                self.coordinator.disconnect();
            }
        }
    }

    fn start_playback(&mut self, data: &LayoutDocument) {
        let Some(marker_id) = self.marker_id else {
            log::warn!("start_playback before assign_id; ignoring");
            return;
        };

        let layout = match data.decode().and_then(|doc| doc.resolve(marker_id)) {
            Ok(layout) => layout,
            Err(e) => {
                log::warn!("Discarding bad layout update: {}", e);
                return;
            }
        };

        self.slot.publish(layout);
        self.display_mode = DisplayMode::Tile;
        self.coordinator.layout_ready();
    }

    /// The control connection dropped.
    ///
    /// Stops the active session and disarms the layout flag; GPU resources
    /// and the surface flag persist for the reconnect.
    pub fn connection_lost(&mut self) {
        log::warn!("Control connection lost");
        self.display_mode = DisplayMode::Marker;
        self.coordinator.disconnect();
    }
}
