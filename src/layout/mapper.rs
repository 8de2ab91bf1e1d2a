//! Texture coordinate mapper
//!
//! Pure functions turning a [`TileLayout`] into the per-vertex texture
//! coordinates and the rotation uniforms the compositor feeds to the warp
//! shader. The coordinate system is the source frame's: (0,0) top-left,
//! (1,1) bottom-right.

use super::TileLayout;

/// Per-vertex texture coordinates in renderer vertex order:
/// [bottom-left, bottom-right, top-left, top-right], two floats each.
///
/// The order matches the full-viewport triangle strip and must not vary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexCoords(pub [f32; 8]);

/// Full-frame mapping: the tile shows the unmodified source.
pub const IDENTITY_TEX_COORDS: TexCoords =
    TexCoords([0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0]);

/// Rotation stage applied per vertex in the shader as `v' = M * (v - c) + c`.
///
/// The matrix is stored column-major to match the shader's `mat2x2`
/// construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    /// Columns of the 2x2 rotation matrix
    pub matrix: [[f32; 2]; 2],
    /// Rotation center in source coordinates
    pub center: [f32; 2],
}

impl Rotation {
    pub const IDENTITY: Rotation = Rotation {
        matrix: [[1.0, 0.0], [0.0, 1.0]],
        center: [0.0, 0.0],
    };

    /// Apply this rotation to a single texture coordinate
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let dx = x - self.center[0];
        let dy = y - self.center[1];
        (
            self.matrix[0][0] * dx + self.matrix[1][0] * dy + self.center[0],
            self.matrix[0][1] * dx + self.matrix[1][1] * dy + self.center[1],
        )
    }
}

/// Map a layout to the texture coordinate buffer.
///
/// Absent or degenerate layouts fall back to [`IDENTITY_TEX_COORDS`] so the
/// tile shows the whole source rather than a blank frame. Corner layouts are
/// reordered from wire order [TL,TR,BR,BL] to vertex order [BL,BR,TL,TR] with
/// no value altered; out-of-range coordinates pass through (clamping belongs
/// to the sampler).
pub fn map(layout: Option<&TileLayout>) -> TexCoords {
    match layout {
        Some(TileLayout::Region { rect, .. }) if !rect.is_degenerate() => {
            let left = rect.x;
            let right = rect.x + rect.width;
            let top = rect.y;
            let bottom = rect.y + rect.height;
            TexCoords([left, bottom, right, bottom, left, top, right, top])
        }
        Some(TileLayout::Corners(c)) => TexCoords([
            c[3].x, c[3].y, // bottom-left
            c[2].x, c[2].y, // bottom-right
            c[0].x, c[0].y, // top-left
            c[1].x, c[1].y, // top-right
        ]),
        _ => IDENTITY_TEX_COORDS,
    }
}

/// Compute the rotation stage for a layout.
///
/// Only the rectangle path rotates: the server sends clockwise degrees, which
/// are negated to the shader's counter-clockwise convention before `cos/sin`.
/// Corner layouts already encode any rotation in their points and get the
/// identity, as do absent and degenerate layouts.
pub fn rotation(layout: Option<&TileLayout>) -> Rotation {
    match layout {
        Some(TileLayout::Region {
            rect,
            rotation_degrees,
        }) if !rect.is_degenerate() && *rotation_degrees != 0.0 => {
            let angle = (-rotation_degrees).to_radians();
            let (sin, cos) = angle.sin_cos();
            let center = rect.center();
            Rotation {
                matrix: [[cos, sin], [-sin, cos]],
                center: [center.x, center.y],
            }
        }
        _ => Rotation::IDENTITY,
    }
}
