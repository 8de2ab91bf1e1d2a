//! Video wall tile rendering core
//!
//! Each device in the wall runs this core embedded in its host application.
//! The host wires in the platform render loop, the video decoder, and the
//! control-channel client; the core maps this device's assigned region of the
//! shared source frame onto the full viewport, warped to its assigned
//! quadrilateral, and gates playback start on surface and layout readiness.

pub mod api;
pub mod layout;
pub mod render;
pub mod session;
pub mod video;

// Re-export commonly used types
pub use api::{DisplayMode, ServerCommand, TileController};
pub use layout::{LayoutReceiver, LayoutSlot, Rect, TexCoords, TileLayout};
pub use render::FrameCompositor;
pub use session::{GatePhase, PlaybackSession, ReadinessCoordinator, SessionEvent};
pub use video::VideoTexture;
