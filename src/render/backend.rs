use std::sync::Arc;

use crate::config::{BackendChoice, RendererOpts};
use crate::foundation::cancel::CancellationToken;
use crate::foundation::core::Surface;
use crate::foundation::error::{FilmError, FilmResult};
use crate::render::geometry::GeometryPlan;
use crate::render::passes::{PassUniforms, run_pass_cpu};

/// Available backend kinds.
///
/// - `Cpu` is always available.
/// - `Gpu` requires the `gpu` cargo feature and a usable adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackendKind {
    /// Rayon-parallel pixel loops.
    Cpu,
    /// wgpu compute passes.
    Gpu,
}

/// Executes the geometry stage and the adjustment passes.
///
/// Backends are shared across render slots; per-slot ordering is enforced by the caller's
/// render mutex, so implementations only need to be internally thread-safe.
///
/// Default methods run the reference CPU implementation, so a backend only overrides what it
/// accelerates.
pub trait RendererBackend: Send + Sync {
    /// Which kind of backend this is.
    fn kind(&self) -> BackendKind;

    /// Acquire device resources. Called before every render; cheap once warm.
    fn warm_up(&self) -> FilmResult<()> {
        Ok(())
    }

    /// Largest accepted surface dimension.
    fn max_texture_size(&self) -> u32;

    /// Resample `src` through `plan` into `output`.
    fn run_geometry(
        &self,
        plan: &GeometryPlan,
        src: &Surface,
        output: &mut Surface,
        cancel: &CancellationToken,
    ) -> FilmResult<()> {
        plan.execute_into(src, output, cancel)
    }

    /// Run one adjustment pass from `input` into `output`.
    fn run_pass(
        &self,
        pass: PassUniforms<'_>,
        input: &Surface,
        output: &mut Surface,
        cancel: &CancellationToken,
    ) -> FilmResult<()> {
        run_pass_cpu(pass, input, output, cancel)
    }

    /// Release device resources. The backend must not be used afterwards.
    fn dispose(&self) {}
}

/// Constructs backends on demand; used to recreate a backend after a device failure.
pub type BackendFactory = Arc<dyn Fn() -> FilmResult<Arc<dyn RendererBackend>> + Send + Sync>;

/// Create a rendering backend.
///
/// `Auto` prefers the GPU when the `gpu` feature is compiled in and an adapter exists, and
/// otherwise returns the CPU backend. An explicit `Gpu` request fails with
/// [`FilmError::ContextUnavailable`] when no GPU can be used.
pub fn create_backend(opts: &RendererOpts) -> FilmResult<Arc<dyn RendererBackend>> {
    match opts.backend {
        BackendChoice::Cpu => Ok(Arc::new(crate::render::cpu::CpuBackend::new(
            opts.max_texture_size,
        ))),
        BackendChoice::Gpu => create_gpu(opts),
        BackendChoice::Auto => match create_gpu(opts) {
            Ok(b) => Ok(b),
            Err(err) => {
                tracing::debug!(error = %err, "gpu backend unavailable; using cpu");
                Ok(Arc::new(crate::render::cpu::CpuBackend::new(
                    opts.max_texture_size,
                )))
            }
        },
    }
}

/// Factory that calls [`create_backend`] with a snapshot of `opts`.
pub fn default_backend_factory(opts: &RendererOpts) -> BackendFactory {
    let opts = opts.clone();
    Arc::new(move || create_backend(&opts))
}

#[cfg(feature = "gpu")]
fn create_gpu(opts: &RendererOpts) -> FilmResult<Arc<dyn RendererBackend>> {
    let backend = crate::render::gpu::GpuBackend::new(opts.max_texture_size);
    backend.warm_up()?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "gpu"))]
fn create_gpu(_opts: &RendererOpts) -> FilmResult<Arc<dyn RendererBackend>> {
    Err(FilmError::context_unavailable(
        "filmlab was built without the `gpu` feature",
    ))
}

/// Reject surfaces larger than `backend` accepts.
pub(crate) fn check_texture_size(
    backend: &dyn RendererBackend,
    width: u32,
    height: u32,
) -> FilmResult<()> {
    let max = backend.max_texture_size();
    if width > max || height > max {
        return Err(FilmError::TextureSizeExceeded { width, height, max });
    }
    Ok(())
}
