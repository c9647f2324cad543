//! Host-facing entry points: the shared renderer context and the export worker.

/// Renderer context and request types.
pub mod context;
/// Off-thread export protocol.
pub mod worker;
