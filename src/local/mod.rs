//! Masked local adjustment layers.

/// Layer adjustment derivation and blending.
pub mod compositor;
/// Mask rasterization and range refinement.
pub mod mask;
