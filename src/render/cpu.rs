use crate::render::backend::{BackendKind, RendererBackend};

/// Always-available backend: every pass runs the reference CPU implementation.
#[derive(Clone, Copy, Debug)]
pub struct CpuBackend {
    max_texture_size: u32,
}

impl CpuBackend {
    /// Backend accepting surfaces up to `max_texture_size` on either edge.
    pub fn new(max_texture_size: u32) -> Self {
        Self { max_texture_size }
    }
}

impl RendererBackend for CpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Cpu
    }

    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }
}
