use super::*;
use crate::adjust::normalize::normalize_adjustments;
use crate::compile::keys::{KeyInputs, compute_stage_keys};
use crate::film::resolve::resolve_render_profile;
use crate::foundation::core::TargetSize;
use crate::render::backend::BackendKind;
use crate::render::cpu::CpuBackend;
use std::sync::Mutex;

#[derive(Default)]
struct Recording {
    calls: Mutex<Vec<RenderStage>>,
    fail_on: Option<RenderStage>,
}

impl RendererBackend for Recording {
    fn kind(&self) -> BackendKind {
        BackendKind::Cpu
    }

    fn max_texture_size(&self) -> u32 {
        64
    }

    fn run_geometry(
        &self,
        plan: &GeometryPlan,
        src: &Surface,
        output: &mut Surface,
        cancel: &CancellationToken,
    ) -> FilmResult<()> {
        self.calls.lock().unwrap().push(RenderStage::Geometry);
        CpuBackend::new(64).run_geometry(plan, src, output, cancel)
    }

    fn run_pass(
        &self,
        pass: PassUniforms<'_>,
        input: &Surface,
        output: &mut Surface,
        cancel: &CancellationToken,
    ) -> FilmResult<()> {
        self.calls.lock().unwrap().push(pass.stage());
        if self.fail_on == Some(pass.stage()) {
            return Err(FilmError::validation("injected"));
        }
        CpuBackend::new(64).run_pass(pass, input, output, cancel)
    }
}

impl Recording {
    fn take(&self) -> Vec<RenderStage> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}

fn source(w: u32, h: u32) -> Arc<Surface> {
    let mut s = Surface::new(w, h);
    for (i, px) in s.data.chunks_exact_mut(4).enumerate() {
        let t = i as f32 / (w * h) as f32;
        px.copy_from_slice(&[t, 1.0 - t, 0.5, 1.0]);
    }
    Arc::new(s)
}

fn render(
    backend: &dyn RendererBackend,
    state: &mut FrameState,
    src: &Arc<Surface>,
    adj: &EditingAdjustments,
) -> FilmResult<(SurfaceId, FrameReport)> {
    let adj = normalize_adjustments(adj);
    let profile = resolve_render_profile(&adj, None).unwrap();
    let plan = GeometryPlan::new(&adj, src.width, src.height, TargetSize::Source, 0).unwrap();
    let keys = compute_stage_keys(&KeyInputs {
        source_key: "src:test",
        adjustments: &adj,
        profile: &profile,
        output_size: plan.output_size(),
        seeds: FilmSeeds { grain: 7, defects: 9 },
    });
    let req = FrameRequest {
        source: src,
        adjustments: &adj,
        profile: &profile,
        keys: &keys,
        plan: &plan,
        seeds: FilmSeeds { grain: 7, defects: 9 },
        lut: None,
    };
    render_frame(backend, state, &req, &CancellationToken::new())
}

#[test]
fn identical_render_is_served_from_cache() {
    let b = Recording::default();
    let mut state = FrameState::default();
    let src = source(8, 6);
    let mut adj = EditingAdjustments::default();
    adj.exposure = 20.0;

    let (_, first) = render(&b, &mut state, &src, &adj).unwrap();
    assert_eq!(b.take(), vec![RenderStage::Geometry, RenderStage::Master]);
    assert!(first.executed.contains(&RenderStage::Upload));

    let (_, second) = render(&b, &mut state, &src, &adj).unwrap();
    assert!(b.take().is_empty());
    assert!(second.executed.is_empty());
    assert!(second.skipped.contains(&RenderStage::Geometry));
}

#[test]
fn curve_edit_reruns_pre_film_but_not_geometry() {
    let b = Recording::default();
    let mut state = FrameState::default();
    let src = source(8, 6);
    let mut adj = EditingAdjustments::default();
    adj.exposure = 20.0;
    render(&b, &mut state, &src, &adj).unwrap();
    b.take();

    adj.curves.tone.darks = 30.0;
    render(&b, &mut state, &src, &adj).unwrap();
    assert_eq!(b.take(), vec![RenderStage::Master, RenderStage::Curve]);
}

#[test]
fn grain_edit_reruns_only_the_film_pass() {
    let b = Recording::default();
    let mut state = FrameState::default();
    let src = source(8, 6);
    let mut adj = EditingAdjustments::default();
    adj.contrast = 15.0;
    render(&b, &mut state, &src, &adj).unwrap();
    b.take();

    adj.grain_amount = 40.0;
    let (id, _) = render(&b, &mut state, &src, &adj).unwrap();
    assert_eq!(b.take(), vec![RenderStage::Film]);
    let pre = state.surface(FrameSurface::PreFilm).unwrap();
    assert_ne!(state.arena.get(id).unwrap(), pre);
}

#[test]
fn failed_pass_is_retried_on_the_next_call() {
    let b = Recording {
        fail_on: Some(RenderStage::Hsl),
        ..Recording::default()
    };
    let mut state = FrameState::default();
    let src = source(4, 4);
    let mut adj = EditingAdjustments::default();
    adj.hsl.red.saturation = 50.0;

    let err = render(&b, &mut state, &src, &adj).unwrap_err();
    assert_eq!(err.failed_stage(), Some(RenderStage::Hsl));
    assert!(state.pre_film_key.is_empty());
    assert!(!state.upload_key.is_empty());
    b.take();

    let err = render(&b, &mut state, &src, &adj).unwrap_err();
    assert_eq!(err.failed_stage(), Some(RenderStage::Hsl));
    assert_eq!(b.take(), vec![RenderStage::Hsl]);
}

#[test]
fn oversized_source_is_rejected_before_any_work() {
    let b = Recording::default();
    let mut state = FrameState::default();
    let src = source(65, 2);
    let err = render(&b, &mut state, &src, &EditingAdjustments::default()).unwrap_err();
    assert_eq!(err.failed_stage(), Some(RenderStage::Upload));
    assert!(b.take().is_empty());
}

#[test]
fn identity_adjustments_copy_geometry_through() {
    let b = Recording::default();
    let mut state = FrameState::default();
    let src = source(5, 3);
    let (id, report) = render(&b, &mut state, &src, &EditingAdjustments::default()).unwrap();
    assert_eq!(state.arena.get(id).unwrap(), src.as_ref());
    assert_eq!(report.executed, vec![RenderStage::Geometry, RenderStage::Upload]);
}
