//! Final output: canvas composition, overlays and export encoding.

/// Surface to canvas.
pub mod compose;
/// Export encoders.
pub mod encode;
/// Date-imprint overlay.
pub mod stamp;
