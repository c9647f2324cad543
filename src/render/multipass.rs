//! Incremental multi-pass renderer.
//!
//! Stages form a chain `geometry -> pre-film (master, hsl, curve, detail) -> film+optics`.
//! Each cached surface remembers the dirty key it was produced under; a stage re-runs only
//! when its key differs, and a re-run invalidates everything after it.

use std::sync::Arc;

use crate::adjust::model::EditingAdjustments;
use crate::compile::keys::{FilmSeeds, StageKeys};
use crate::film::lut::HaldLut;
use crate::film::model::ResolvedRenderProfile;
use crate::foundation::cancel::CancellationToken;
use crate::foundation::core::Surface;
use crate::foundation::error::{FilmError, FilmResult, RenderStage};
use crate::render::backend::{RendererBackend, check_texture_size};
use crate::render::frame_state::{FrameState, FrameSurface, SurfaceId};
use crate::render::geometry::GeometryPlan;
use crate::render::passes::PassUniforms;
use crate::render::surface_pool::SurfacePool;

/// Everything one slot render reads.
pub(crate) struct FrameRequest<'a> {
    pub(crate) source: &'a Arc<Surface>,
    /// Normalized adjustments.
    pub(crate) adjustments: &'a EditingAdjustments,
    pub(crate) profile: &'a ResolvedRenderProfile,
    pub(crate) keys: &'a StageKeys,
    pub(crate) plan: &'a GeometryPlan,
    pub(crate) seeds: FilmSeeds,
    pub(crate) lut: Option<Arc<HaldLut>>,
}

/// Which stages ran and which were served from cache.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct FrameReport {
    pub(crate) executed: Vec<RenderStage>,
    pub(crate) skipped: Vec<RenderStage>,
}

impl FrameReport {
    pub(crate) fn ran(&mut self, stage: RenderStage) {
        self.executed.push(stage);
    }

    pub(crate) fn skip(&mut self, stage: RenderStage) {
        self.skipped.push(stage);
    }

    pub(crate) fn merge(&mut self, other: FrameReport) {
        self.executed.extend(other.executed);
        self.skipped.extend(other.skipped);
    }
}

const PRE_FILM_STAGES: [RenderStage; 4] = [
    RenderStage::Master,
    RenderStage::Hsl,
    RenderStage::Curve,
    RenderStage::Detail,
];
const FINISH_STAGES: [RenderStage; 2] = [RenderStage::Film, RenderStage::Optics];

/// Bring `state` up to date with `req` and return the handle of the finished surface.
///
/// On failure the failing stage and everything after it are left invalidated, so the next
/// call retries from there.
pub(crate) fn render_frame(
    backend: &dyn RendererBackend,
    state: &mut FrameState,
    req: &FrameRequest<'_>,
    cancel: &CancellationToken,
) -> FilmResult<(SurfaceId, FrameReport)> {
    let mut report = FrameReport::default();
    let keys = req.keys;
    let (out_w, out_h) = req.plan.output_size();
    check_texture_size(backend, req.source.width, req.source.height)
        .and_then(|()| check_texture_size(backend, out_w, out_h))
        .map_err(|e| FilmError::stage(RenderStage::Upload, e))?;

    if state.upload_key != keys.upload || state.geometry.is_none() {
        state.invalidate_from(FrameSurface::Geometry);
        let mut out = state.pool.borrow(out_w, out_h);
        backend
            .run_geometry(req.plan, req.source, &mut out, cancel)
            .map_err(|e| FilmError::stage(RenderStage::Geometry, e))?;
        state.store(FrameSurface::Geometry, out);
        state.source = Some(Arc::clone(req.source));
        state.upload_key.clone_from(&keys.upload);
        report.ran(RenderStage::Geometry);
        report.ran(RenderStage::Upload);
    } else {
        tracing::debug!("geometry unchanged; reusing upload");
        report.skip(RenderStage::Geometry);
        report.skip(RenderStage::Upload);
    }
    cancel.check()?;

    if state.pre_film_key != keys.pre_film || state.pre_film.is_none() {
        state.invalidate_from(FrameSurface::PreFilm);
        let FrameState {
            arena,
            pool,
            scratch,
            geometry,
            ..
        } = &mut *state;
        let input = arena.get(geometry.ok_or_else(missing_geometry)?)?;
        let passes = scratch.fill_pre_film(req.adjustments);
        let out = run_chain(backend, &passes, input, pool, cancel, &mut report)?;
        state.store(FrameSurface::PreFilm, out);
        state.pre_film_key.clone_from(&keys.pre_film);
    } else {
        tracing::debug!("pre-film stages unchanged; reusing cached composite");
        for stage in PRE_FILM_STAGES {
            report.skip(stage);
        }
    }
    cancel.check()?;

    if state.pixi_key != keys.pixi || state.pixi.is_none() {
        state.invalidate_from(FrameSurface::Pixi);
        let FrameState {
            arena,
            pool,
            scratch,
            pre_film,
            ..
        } = &mut *state;
        let input = arena.get(pre_film.ok_or_else(missing_geometry)?)?;
        let passes = scratch.fill_finish(
            req.adjustments,
            req.profile,
            req.seeds,
            req.lut.clone(),
            (out_w, out_h),
        );
        let out = run_chain(backend, &passes, input, pool, cancel, &mut report)?;
        state.store(FrameSurface::Pixi, out);
        state.pixi_key.clone_from(&keys.pixi);
    } else {
        tracing::debug!("film and optics unchanged; reusing final surface");
        for stage in FINISH_STAGES {
            report.skip(stage);
        }
    }

    let id = state.pixi.ok_or_else(missing_geometry)?;
    Ok((id, report))
}

/// Run `passes` in order, ping-ponging through pooled surfaces. Identity passes are skipped.
fn run_chain(
    backend: &dyn RendererBackend,
    passes: &[PassUniforms<'_>],
    input: &Surface,
    pool: &mut SurfacePool,
    cancel: &CancellationToken,
    report: &mut FrameReport,
) -> FilmResult<Surface> {
    let mut current: Option<Surface> = None;
    for pass in passes {
        cancel.check()?;
        let stage = pass.stage();
        if pass.is_identity() {
            report.skip(stage);
            continue;
        }
        let src = current.as_ref().unwrap_or(input);
        let mut out = pool.borrow(src.width, src.height);
        backend
            .run_pass(*pass, src, &mut out, cancel)
            .map_err(|e| FilmError::stage(stage, e))?;
        if let Some(prev) = current.replace(out) {
            pool.release(prev);
        }
        report.ran(stage);
    }
    Ok(match current {
        Some(s) => s,
        None => {
            let mut s = pool.borrow(input.width, input.height);
            s.copy_from(input);
            s
        }
    })
}

fn missing_geometry() -> FilmError {
    FilmError::validation("frame state lost its upstream surface")
}

#[cfg(test)]
#[path = "../../tests/unit/render/multipass.rs"]
mod tests;
