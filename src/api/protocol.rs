//! Control-channel message definitions
//!
//! JSON shapes of the coordinating server's commands. Transport and framing
//! belong to the external control client; this module only parses payloads
//! and resolves this device's layout entry. The layout document went through
//! three server iterations (grid cell, percent rect, corner list) and all
//! three remain accepted.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::{Rect, TileLayout};

/// Parse or resolution failure for a control payload
///
/// Callers log these and keep the previous layout live; a malformed update is
/// "no update", never a crash in the render path.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no layout entry for marker id {0}")]
    NoEntryForMarker(i32),
    #[error("expected 4 corners, got {0}")]
    CornerCount(usize),
    #[error("layout entry {0} has no placement fields")]
    MissingPlacement(i32),
    #[error("grid placement requires grid_info")]
    MissingGridInfo,
    #[error("grid position ({row},{col}) outside {rows}x{cols} grid")]
    GridPositionOutOfRange {
        row: u32,
        col: u32,
        rows: u32,
        cols: u32,
    },
}

/// Commands sent by the coordinating server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ServerCommand {
    /// Assign this device its wall marker id
    AssignId { marker_id: i32 },
    /// Show the calibration marker instead of video
    ShowMarker,
    /// Deliver the wall layout and begin playback
    StartPlayback { data: LayoutDocument },
    /// Hide the tile and stop playback
    StopPlayback,
}

impl ServerCommand {
    /// Parse a raw control message
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Layout document payload of `start_playback`
///
/// Early servers stringified the document into the `data` field; later ones
/// inline it. Both deserialize here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayoutDocument {
    Inline(PlaybackLayout),
    Encoded(String),
}

impl LayoutDocument {
    /// Decode to the layout document, parsing the stringified form if needed
    pub fn decode(&self) -> Result<PlaybackLayout, ProtocolError> {
        match self {
            LayoutDocument::Inline(layout) => Ok(layout.clone()),
            LayoutDocument::Encoded(text) => Ok(serde_json::from_str(text)?),
        }
    }
}

/// The wall layout for every device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackLayout {
    /// Grid dimensions; only present for grid-cell entries
    pub grid_info: Option<GridInfo>,
    /// One entry per device
    pub layout: Vec<LayoutEntry>,
}

/// Grid dimensions for the legacy grid-cell form
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridInfo {
    pub rows: u32,
    pub cols: u32,
}

/// Cell index within the grid, 0-based
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridPos {
    pub row: u32,
    pub col: u32,
}

/// Fractional source rectangle, each field in [0,1]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RelativeRect {
    pub x_percent: f32,
    pub y_percent: f32,
    pub w_percent: f32,
    pub h_percent: f32,
}

/// One corner point in normalized source coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CornerPoint {
    pub x: f32,
    pub y: f32,
}

/// One device's placement within the wall
///
/// Exactly one of the placement forms is expected; when several are present
/// the most general wins: corners, then relative rect, then grid cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutEntry {
    /// Marker id of the device this entry addresses
    pub id: i32,
    /// Rotation in server clockwise degrees (grid and rect forms)
    pub rotation: Option<f32>,
    /// Legacy grid-cell placement
    pub grid_pos: Option<GridPos>,
    /// Fractional-rectangle placement
    pub relative_rect: Option<RelativeRect>,
    /// Quadrilateral placement, wire order [TL, TR, BR, BL]
    pub relative_corners: Option<Vec<CornerPoint>>,
}

impl PlaybackLayout {
    /// Resolve the layout for the device with the given marker id
    pub fn resolve(&self, marker_id: i32) -> Result<TileLayout, ProtocolError> {
        let entry = self
            .layout
            .iter()
            .find(|e| e.id == marker_id)
            .ok_or(ProtocolError::NoEntryForMarker(marker_id))?;
        entry.resolve(self.grid_info)
    }
}

impl LayoutEntry {
    /// Resolve this entry to a tile layout
    pub fn resolve(&self, grid_info: Option<GridInfo>) -> Result<TileLayout, ProtocolError> {
        if let Some(corners) = &self.relative_corners {
            if corners.len() != 4 {
                return Err(ProtocolError::CornerCount(corners.len()));
            }
            return Ok(TileLayout::Corners([
                Vec2::new(corners[0].x, corners[0].y),
                Vec2::new(corners[1].x, corners[1].y),
                Vec2::new(corners[2].x, corners[2].y),
                Vec2::new(corners[3].x, corners[3].y),
            ]));
        }

        let rotation = self.rotation.unwrap_or(0.0);

        if let Some(rect) = &self.relative_rect {
            return Ok(TileLayout::Region {
                rect: Rect::new(
                    rect.x_percent,
                    rect.y_percent,
                    rect.w_percent,
                    rect.h_percent,
                ),
                rotation_degrees: rotation,
            });
        }

        if let Some(pos) = &self.grid_pos {
            let grid = grid_info.ok_or(ProtocolError::MissingGridInfo)?;
            if grid.rows == 0 || grid.cols == 0 || pos.row >= grid.rows || pos.col >= grid.cols {
                return Err(ProtocolError::GridPositionOutOfRange {
                    row: pos.row,
                    col: pos.col,
                    rows: grid.rows,
                    cols: grid.cols,
                });
            }
            return Ok(TileLayout::grid_cell(
                grid.rows, grid.cols, pos.row, pos.col, rotation,
            ));
        }

        Err(ProtocolError::MissingPlacement(self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assign_id() {
        let cmd = ServerCommand::from_json(r#"{"command":"assign_id","marker_id":3}"#).unwrap();
        match cmd {
            ServerCommand::AssignId { marker_id } => assert_eq!(marker_id, 3),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_stringified_grid_layout() {
        // The original server wraps the layout document in a JSON string.
        let inner = r#"{"grid_info":{"rows":2,"cols":2},"layout":[
            {"id":0,"grid_pos":{"row":0,"col":0},"rotation":0},
            {"id":7,"grid_pos":{"row":1,"col":0},"rotation":90}
        ]}"#;
        let msg = serde_json::json!({ "command": "start_playback", "data": inner }).to_string();

        let cmd = ServerCommand::from_json(&msg).unwrap();
        let ServerCommand::StartPlayback { data } = cmd else {
            panic!("expected start_playback");
        };
        let layout = data.decode().unwrap();
        let tile = layout.resolve(7).unwrap();
        assert_eq!(tile, TileLayout::grid_cell(2, 2, 1, 0, 90.0));
    }

    #[test]
    fn test_parse_inline_corner_layout() {
        let msg = r#"{"command":"start_playback","data":{"layout":[
            {"id":1,"relative_corners":[
                {"x":0.0,"y":0.0},{"x":0.5,"y":0.1},
                {"x":0.5,"y":0.6},{"x":0.0,"y":0.5}
            ]}
        ]}}"#;

        let cmd = ServerCommand::from_json(msg).unwrap();
        let ServerCommand::StartPlayback { data } = cmd else {
            panic!("expected start_playback");
        };
        let tile = data.decode().unwrap().resolve(1).unwrap();
        match tile {
            TileLayout::Corners(c) => {
                assert_eq!(c[1], Vec2::new(0.5, 0.1));
                assert_eq!(c[3], Vec2::new(0.0, 0.5));
            }
            other => panic!("expected corners, got {:?}", other),
        }
    }

    #[test]
    fn test_relative_rect_layout() {
        let entry = LayoutEntry {
            id: 2,
            rotation: Some(45.0),
            grid_pos: None,
            relative_rect: Some(RelativeRect {
                x_percent: 0.25,
                y_percent: 0.0,
                w_percent: 0.5,
                h_percent: 1.0,
            }),
            relative_corners: None,
        };
        let tile = entry.resolve(None).unwrap();
        assert_eq!(
            tile,
            TileLayout::Region {
                rect: Rect::new(0.25, 0.0, 0.5, 1.0),
                rotation_degrees: 45.0,
            }
        );
    }

    #[test]
    fn test_corners_take_precedence() {
        let entry = LayoutEntry {
            id: 2,
            rotation: Some(90.0),
            grid_pos: Some(GridPos { row: 0, col: 0 }),
            relative_rect: None,
            relative_corners: Some(vec![
                CornerPoint { x: 0.0, y: 0.0 },
                CornerPoint { x: 1.0, y: 0.0 },
                CornerPoint { x: 1.0, y: 1.0 },
                CornerPoint { x: 0.0, y: 1.0 },
            ]),
        };
        assert!(matches!(
            entry.resolve(None).unwrap(),
            TileLayout::Corners(_)
        ));
    }

    #[test]
    fn test_wrong_corner_count_is_rejected() {
        let entry = LayoutEntry {
            id: 5,
            rotation: None,
            grid_pos: None,
            relative_rect: None,
            relative_corners: Some(vec![
                CornerPoint { x: 0.0, y: 0.0 },
                CornerPoint { x: 1.0, y: 0.0 },
                CornerPoint { x: 1.0, y: 1.0 },
            ]),
        };
        assert!(matches!(
            entry.resolve(None),
            Err(ProtocolError::CornerCount(3))
        ));
    }

    #[test]
    fn test_missing_entry_for_marker() {
        let layout = PlaybackLayout {
            grid_info: None,
            layout: vec![],
        };
        assert!(matches!(
            layout.resolve(9),
            Err(ProtocolError::NoEntryForMarker(9))
        ));
    }

    #[test]
    fn test_grid_pos_out_of_range() {
        let entry = LayoutEntry {
            id: 0,
            rotation: None,
            grid_pos: Some(GridPos { row: 2, col: 0 }),
            relative_rect: None,
            relative_corners: None,
        };
        let grid = Some(GridInfo { rows: 2, cols: 2 });
        assert!(matches!(
            entry.resolve(grid),
            Err(ProtocolError::GridPositionOutOfRange { .. })
        ));
    }

    #[test]
    fn test_malformed_inner_document() {
        let doc = LayoutDocument::Encoded("{not json".to_string());
        assert!(matches!(doc.decode(), Err(ProtocolError::Json(_))));
    }
}
