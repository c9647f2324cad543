//! Rendering backends and the incremental multi-pass pipeline.

/// Backend trait, kinds and factory.
pub mod backend;
pub(crate) mod blur;
/// Always-available CPU backend.
pub mod cpu;
pub(crate) mod frame_state;
/// Resolved geometry stage.
pub mod geometry;
/// wgpu compute backend.
#[cfg(feature = "gpu")]
pub mod gpu;
pub(crate) mod multipass;
pub(crate) mod mutex;
/// Adjustment passes and their uniforms.
pub mod passes;
pub(crate) mod surface_pool;
