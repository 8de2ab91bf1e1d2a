//! Layout model for a wall tile
//!
//! A tile's layout describes which part of the shared source frame this
//! device displays, either as an axis-aligned rectangle with a rotation or as
//! an arbitrary quadrilateral.

mod mapper;
mod slot;

pub use mapper::{map, rotation, Rotation, TexCoords, IDENTITY_TEX_COORDS};
pub use slot::{LayoutReceiver, LayoutSlot};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Rect structure for source regions, normalized to [0,1] of the frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Full-frame rect covering the whole source
    pub fn full_frame() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    /// A rect that cannot produce a visible region
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// The current placement of this tile within the source frame
///
/// Corner coordinates outside [0,1] are passed through untouched; the GPU
/// sampler's clamp mode decides what they show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TileLayout {
    /// Axis-aligned source rectangle plus a rotation about its center.
    /// Rotation uses the server's clockwise-degree convention.
    Region { rect: Rect, rotation_degrees: f32 },
    /// Four corner points in wire order [top-left, top-right, bottom-right,
    /// bottom-left], normalized source coordinates.
    Corners([Vec2; 4]),
}

impl TileLayout {
    /// Create an unrotated rectangular layout
    pub fn region(rect: Rect) -> Self {
        Self::Region {
            rect,
            rotation_degrees: 0.0,
        }
    }

    /// Layout for one cell of a rows x cols grid split of the source frame
    pub fn grid_cell(rows: u32, cols: u32, row: u32, col: u32, rotation_degrees: f32) -> Self {
        let w = 1.0 / cols as f32;
        let h = 1.0 / rows as f32;
        Self::Region {
            rect: Rect::new(col as f32 * w, row as f32 * h, w, h),
            rotation_degrees,
        }
    }

    /// Whether this layout carries a non-trivial rotation stage
    pub fn is_rotated(&self) -> bool {
        matches!(self, Self::Region { rotation_degrees, .. } if *rotation_degrees != 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_cell_rect() {
        let layout = TileLayout::grid_cell(2, 2, 1, 0, 0.0);
        match layout {
            TileLayout::Region { rect, .. } => {
                assert_eq!(rect, Rect::new(0.0, 0.5, 0.5, 0.5));
            }
            _ => panic!("expected region layout"),
        }
    }

    #[test]
    fn test_degenerate_rect() {
        assert!(Rect::new(0.0, 0.0, 0.0, 1.0).is_degenerate());
        assert!(Rect::new(0.0, 0.0, 0.5, -0.1).is_degenerate());
        assert!(!Rect::full_frame().is_degenerate());
    }

    #[test]
    fn test_rect_center() {
        let rect = Rect::new(0.25, 0.5, 0.5, 0.5);
        assert_eq!(rect.center(), Vec2::new(0.5, 0.75));
    }
}
