//! The renderer context: owner of every cache, the backend and the per-slot render mutex.
//!
//! One context is built by the host at startup and shared by reference with every render and
//! export call. Nothing in filmlab keeps global state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::adjust::model::{DateStamp, EditingAdjustments, LocalAdjustment};
use crate::adjust::normalize::normalize_adjustments;
use crate::assets::source::{BitmapCacheStats, SourceInput, SourceLoader};
use crate::compile::keys::{
    FilmSeeds, KeyInputs, StageKeys, compute_stage_keys, local_adjustment_key,
    source_key_for_bytes,
};
use crate::config::RendererOpts;
use crate::film::lut::{HaldLut, LutCache, LutSource};
use crate::film::model::{FilmProfileInput, ResolvedRenderProfile, SeedMode};
use crate::film::presets::ProfileRegistry;
use crate::film::resolve::{ProfileSelection, resolve_film_profile};
use crate::foundation::cancel::CancellationToken;
use crate::foundation::core::{Canvas, RenderMode, SlotKey, Surface, TargetSize};
use crate::foundation::error::{FilmError, FilmResult, RenderStage};
use crate::foundation::math::{Fnv1a64, mix64};
use crate::local::compositor::{blend_layer, layer_mask, local_layer_adjustments};
use crate::output::compose::compose_output;
use crate::output::encode::{OutputFormat, encode_canvas};
use crate::render::backend::{BackendFactory, RendererBackend, default_backend_factory};
use crate::render::frame_state::{FrameState, FrameSurface, SurfaceId};
use crate::render::geometry::GeometryPlan;
use crate::render::multipass::{FrameReport, FrameRequest, render_frame};
use crate::render::mutex::RenderMutex;

/// Slot used when a request does not name one.
pub const DEFAULT_SLOT: &str = "main";

/// Resolution policy for renders that do not request an explicit size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QualityProfile {
    /// Capped at `previewMaxDimension`.
    #[default]
    Interactive,
    /// Capped at `exportMaxDimension` (source size when that is `0`).
    Full,
}

/// One render call.
#[derive(Clone, Debug)]
pub struct RenderRequest {
    /// Encoded source image.
    pub source: SourceInput,
    /// Stable identity of the source; a content hash is used when absent.
    pub source_cache_key: Option<String>,
    /// Adjustment stack; normalized before use.
    pub adjustments: EditingAdjustments,
    /// Explicit film profile of either schema generation.
    pub film_profile: Option<FilmProfileInput>,
    /// Built-in preset id; wins over every other profile source.
    pub preset_id: Option<String>,
    /// Cache and strictness partition.
    pub mode: RenderMode,
    /// Default size cap when `target_size` is [`TargetSize::Source`].
    pub quality: QualityProfile,
    /// Requested output size.
    pub target_size: TargetSize,
    /// Per-asset seed identity; defaults to the source key.
    pub seed_key: Option<String>,
    /// Mixed into per-asset seeds.
    pub seed_salt: Option<String>,
    /// Seed for `perRender` modules. Random when absent.
    pub render_seed: Option<u64>,
    /// Seed for `perExport` modules in export mode. Random when absent.
    pub export_seed: Option<u64>,
    /// Propagate every failure instead of falling back. Always on in export mode.
    pub strict_errors: bool,
    /// Frame cache slot; [`DEFAULT_SLOT`] when absent.
    pub render_slot: Option<String>,
    /// Cancellation signal checked between stages.
    pub cancel: CancellationToken,
}

impl RenderRequest {
    /// Preview request for `source` with `adjustments` and every other option at its default.
    pub fn new(source: SourceInput, adjustments: EditingAdjustments) -> Self {
        Self {
            source,
            source_cache_key: None,
            adjustments,
            film_profile: None,
            preset_id: None,
            mode: RenderMode::Preview,
            quality: QualityProfile::Interactive,
            target_size: TargetSize::Source,
            seed_key: None,
            seed_salt: None,
            render_seed: None,
            export_seed: None,
            strict_errors: false,
            render_slot: None,
            cancel: CancellationToken::new(),
        }
    }

    fn slot_key(&self) -> SlotKey {
        SlotKey::new(
            self.mode,
            self.render_slot.as_deref().unwrap_or(DEFAULT_SLOT),
        )
    }

    fn is_strict(&self) -> bool {
        self.strict_errors || self.mode == RenderMode::Export
    }
}

/// One export call: a render plus output encoding.
#[derive(Clone, Debug)]
pub struct ExportRequest {
    /// Render inputs. Mode and strictness are forced to export/strict.
    pub render: RenderRequest,
    /// Output MIME type (`image/png`, `image/jpeg`, `image/webp`).
    pub mime: String,
    /// JPEG quality `1..=100`; the configured default when absent.
    pub quality: Option<u8>,
}

/// Progress phases reported by [`RendererContext::export_with_progress`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportStage {
    /// Reading and decoding the source.
    Decode,
    /// Running the pipeline.
    Render,
    /// Encoding the output blob.
    Encode,
}

/// Context counters, cumulative since construction.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderStats {
    /// Render calls that produced a canvas (including fallbacks).
    pub renders: u64,
    /// Successful exports.
    pub exports: u64,
    /// Executions per stage.
    pub stage_runs: HashMap<RenderStage, u64>,
    /// Cache hits per stage.
    pub stage_skips: HashMap<RenderStage, u64>,
    /// Renders answered from the slot's last output without touching the backend.
    pub output_reuses: u64,
    /// Lenient failures answered with the slot's last good frame.
    pub fallback_last_good: u64,
    /// Lenient failures answered with the geometry-only CPU path.
    pub fallback_geometry: u64,
    /// Backends disposed after a failure and rebuilt on next use.
    pub backend_recreations: u64,
    /// Distinct lenient-mode failures logged.
    pub errors_logged: u64,
    /// Repeats of the previous failure that were not logged again.
    pub errors_suppressed: u64,
    /// Source bitmap cache counters.
    pub source_cache: BitmapCacheStats,
}

impl RenderStats {
    fn record(&mut self, report: &FrameReport) {
        for stage in &report.executed {
            *self.stage_runs.entry(*stage).or_default() += 1;
        }
        for stage in &report.skipped {
            *self.stage_skips.entry(*stage).or_default() += 1;
        }
    }
}

/// Collapses identical consecutive failures into a repeat count.
#[derive(Debug, Default)]
struct ErrorLog {
    last: Option<String>,
    repeats: u64,
}

impl ErrorLog {
    /// Whether `message` should be logged.
    fn admit(&mut self, message: &str, dedupe: bool) -> bool {
        if dedupe && self.last.as_deref() == Some(message) {
            self.repeats += 1;
            return false;
        }
        if self.repeats > 0 {
            tracing::warn!(repeats = self.repeats, "previous render error repeated");
        }
        self.last = Some(message.to_string());
        self.repeats = 0;
        true
    }
}

#[derive(Default)]
enum BackendState {
    #[default]
    Uninit,
    Ready(Arc<dyn RendererBackend>),
    /// Context creation failed in a way that will not change this session.
    Unavailable(String),
}

/// What a failed render got far enough to produce; feeds the fallback chain.
#[derive(Default)]
struct Attempt {
    source: Option<Arc<Surface>>,
    plan: Option<GeometryPlan>,
    backend_used: bool,
}

/// Shared rendering context.
///
/// Render calls on the same `(mode, slot)` are serialized in arrival order; distinct slots run
/// concurrently. All methods take `&self`.
pub struct RendererContext {
    opts: RendererOpts,
    factory: BackendFactory,
    backend: RwLock<BackendState>,
    sources: SourceLoader,
    luts: Mutex<LutCache>,
    profiles: RwLock<ProfileRegistry>,
    mutex: RenderMutex,
    frames: Mutex<HashMap<SlotKey, Arc<Mutex<FrameState>>>>,
    errors: Mutex<ErrorLog>,
    stats: Mutex<RenderStats>,
    disposed: AtomicBool,
}

impl std::fmt::Debug for RendererContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererContext")
            .field("opts", &self.opts)
            .field("disposed", &self.disposed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RendererContext {
    /// Context using the backend selected by `opts.backend`.
    pub fn new(opts: RendererOpts) -> Self {
        let factory = default_backend_factory(&opts);
        Self::with_backend_factory(opts, factory)
    }

    /// Context whose backend is built (and rebuilt after failures) by `factory`.
    pub fn with_backend_factory(mut opts: RendererOpts, factory: BackendFactory) -> Self {
        for warning in opts.sanitize() {
            tracing::warn!("{warning}");
        }
        Self {
            sources: SourceLoader::new(opts.source_cache_entries, opts.source_cache_bytes),
            luts: Mutex::new(LutCache::new(None, LutCache::DEFAULT_CAPACITY)),
            profiles: RwLock::new(ProfileRegistry::with_builtins()),
            mutex: RenderMutex::default(),
            frames: Mutex::new(HashMap::new()),
            errors: Mutex::new(ErrorLog::default()),
            stats: Mutex::new(RenderStats::default()),
            backend: RwLock::new(BackendState::Uninit),
            disposed: AtomicBool::new(false),
            factory,
            opts,
        }
    }

    /// Resolve LUT paths through `source` before the procedural stock fallback.
    pub fn with_lut_source(self, source: Box<dyn LutSource>) -> Self {
        *lock(&self.luts) = LutCache::new(Some(source), LutCache::DEFAULT_CAPACITY);
        self
    }

    /// Effective (sanitized) options.
    pub fn opts(&self) -> &RendererOpts {
        &self.opts
    }

    /// Make `profile` resolvable through `filmProfileId`.
    pub fn register_profile(&self, profile: FilmProfileInput) -> FilmResult<()> {
        self.profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(profile)
    }

    /// Snapshot of the context counters.
    pub fn stats(&self) -> RenderStats {
        let mut stats = lock(&self.stats).clone();
        stats.source_cache = self.sources.stats();
        stats
    }

    /// Last lenient-mode error recorded for a slot, if its most recent render failed.
    pub fn last_render_error(&self, mode: RenderMode, slot: &str) -> Option<String> {
        let frame = lock(&self.frames).get(&SlotKey::new(mode, slot)).cloned()?;
        lock(&frame).last_render_error.clone()
    }

    /// Render `req` into `canvas`, resizing it to the output size.
    ///
    /// Strict requests (and every export-mode request) propagate failures. Lenient requests
    /// recover with the slot's last good frame, then with a geometry-only CPU render, and only
    /// return an error when neither is possible. Cancellation always propagates.
    #[tracing::instrument(skip_all, fields(slot = %req.slot_key()))]
    pub fn render_to_canvas(&self, req: &RenderRequest, canvas: &mut Canvas) -> FilmResult<()> {
        self.ensure_live()?;
        let slot = req.slot_key();
        let _permit = self.mutex.acquire(&slot, &req.cancel)?;
        let frame = self.frame(&slot);
        let mut frame = lock(&frame);

        let mut attempt = Attempt::default();
        let result = self.render_locked(req, &slot, &mut frame, canvas, &mut attempt);
        let result = match result {
            Ok(()) => {
                frame.last_render_error = None;
                Ok(())
            }
            Err(err) if err.is_abort() || req.is_strict() => Err(err),
            Err(err) => self.recover(err, &slot, &mut frame, &attempt, canvas, &req.cancel),
        };
        if result.is_ok() {
            lock(&self.stats).renders += 1;
        }
        result
    }

    /// Render in export mode and encode as `req.mime`.
    pub fn render_image_to_blob(&self, req: &ExportRequest) -> FilmResult<Vec<u8>> {
        self.export_with_progress(req, &mut |_, _| {})
    }

    /// [`Self::render_image_to_blob`] with phase callbacks. Progress is monotonic in `[0, 1]`.
    #[tracing::instrument(skip_all, fields(mime = %req.mime))]
    pub fn export_with_progress(
        &self,
        req: &ExportRequest,
        progress: &mut dyn FnMut(ExportStage, f32),
    ) -> FilmResult<Vec<u8>> {
        self.ensure_live()?;
        let format = OutputFormat::from_mime(&req.mime)?;
        let mut render = req.render.clone();
        render.mode = RenderMode::Export;
        render.strict_errors = true;

        let slot = render.slot_key();
        let result = self.export_render(&render, req.quality, format, progress);
        self.dispose_slot(RenderMode::Export, &slot.slot);
        result
    }

    fn export_render(
        &self,
        render: &RenderRequest,
        quality: Option<u8>,
        format: OutputFormat,
        progress: &mut dyn FnMut(ExportStage, f32),
    ) -> FilmResult<Vec<u8>> {
        progress(ExportStage::Decode, 0.0);
        let key = render
            .source
            .cache_key(render.source_cache_key.as_deref())?;
        self.sources
            .load(&render.source, &key, &render.cancel)
            .map_err(|e| FilmError::stage(RenderStage::Source, e))?;
        progress(ExportStage::Render, 0.2);

        let mut canvas = Canvas::default();
        self.render_to_canvas(render, &mut canvas)?;
        progress(ExportStage::Encode, 0.85);

        render.cancel.check()?;
        let quality = quality.unwrap_or(self.opts.default_jpeg_quality);
        let blob = encode_canvas(&canvas, format, quality)?;
        progress(ExportStage::Encode, 1.0);
        lock(&self.stats).exports += 1;
        tracing::debug!(bytes = blob.len(), "export encoded");
        Ok(blob)
    }

    /// Drop the frame caches of one slot and of its local layer slots.
    pub fn dispose_slot(&self, mode: RenderMode, slot: &str) {
        let layer_prefix = format!("{slot}:local:");
        lock(&self.frames).retain(|k, _| {
            k.mode != mode || (k.slot != slot && !k.slot.starts_with(&layer_prefix))
        });
        let freed = self.sources.reap();
        if freed > 0 {
            tracing::debug!(freed, "released evicted source bitmaps");
        }
    }

    /// Drop the cached bitmap of a deleted asset, identified by its `source_cache_key`.
    ///
    /// Slots still rendering from it keep their lease until they are disposed or re-rendered.
    pub fn forget_source(&self, source_cache_key: &str) {
        self.sources
            .forget(&source_key_for_bytes(&[], Some(source_cache_key)));
    }

    /// Invalidate a slot's cached surfaces while keeping its last good frame.
    pub fn reset_slot(&self, mode: RenderMode, slot: &str) {
        let key = SlotKey::new(mode, slot);
        let frame = lock(&self.frames).get(&key).cloned();
        if let Some(frame) = frame {
            lock(&frame).reset();
        }
    }

    /// Release the backend and every cache. Later calls fail with
    /// [`FilmError::ContextUnavailable`].
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let state = std::mem::take(
            &mut *self.backend.write().unwrap_or_else(PoisonError::into_inner),
        );
        if let BackendState::Ready(backend) = state {
            backend.dispose();
        }
        lock(&self.frames).clear();
        lock(&self.luts).clear();
        self.sources.clear();
        tracing::debug!("renderer context disposed");
    }

    fn ensure_live(&self) -> FilmResult<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(FilmError::context_unavailable("renderer context disposed"));
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn slot_count(&self, mode: RenderMode) -> usize {
        lock(&self.frames).keys().filter(|k| k.mode == mode).count()
    }

    fn frame(&self, slot: &SlotKey) -> Arc<Mutex<FrameState>> {
        Arc::clone(lock(&self.frames).entry(slot.clone()).or_default())
    }

    /// The live backend, built on first use.
    fn backend(&self) -> FilmResult<Arc<dyn RendererBackend>> {
        {
            let state = self.backend.read().unwrap_or_else(PoisonError::into_inner);
            match &*state {
                BackendState::Ready(b) => return Ok(Arc::clone(b)),
                BackendState::Unavailable(msg) => {
                    return Err(FilmError::context_unavailable(msg.clone()));
                }
                BackendState::Uninit => {}
            }
        }
        let mut state = self.backend.write().unwrap_or_else(PoisonError::into_inner);
        if let BackendState::Ready(b) = &*state {
            return Ok(Arc::clone(b));
        }
        match (self.factory)() {
            Ok(b) => {
                tracing::debug!(kind = ?b.kind(), "renderer backend ready");
                *state = BackendState::Ready(Arc::clone(&b));
                Ok(b)
            }
            Err(err) => {
                if err.is_context_unavailable() {
                    *state = BackendState::Unavailable(err.to_string());
                }
                Err(err)
            }
        }
    }

    /// Dispose the backend after a failure so the next call starts from a fresh one.
    fn drop_backend(&self, permanent: Option<&str>) {
        let mut state = self.backend.write().unwrap_or_else(PoisonError::into_inner);
        let next = match permanent {
            Some(msg) => BackendState::Unavailable(msg.to_string()),
            None => BackendState::Uninit,
        };
        if let BackendState::Ready(old) = std::mem::replace(&mut *state, next) {
            old.dispose();
            if permanent.is_none() {
                lock(&self.stats).backend_recreations += 1;
            }
        }
    }

    fn max_dimension(&self, req: &RenderRequest) -> u32 {
        match (req.mode, req.quality) {
            (RenderMode::Preview, QualityProfile::Interactive) => self.opts.preview_max_dimension,
            _ => self.opts.export_max_dimension,
        }
    }

    fn render_locked(
        &self,
        req: &RenderRequest,
        slot: &SlotKey,
        frame: &mut FrameState,
        canvas: &mut Canvas,
        attempt: &mut Attempt,
    ) -> FilmResult<()> {
        let adjustments = normalize_adjustments(&req.adjustments);
        let profile = {
            let registry = self.profiles.read().unwrap_or_else(PoisonError::into_inner);
            resolve_film_profile(
                &adjustments,
                ProfileSelection {
                    preset_id: req.preset_id.as_deref(),
                    explicit: req.film_profile.as_ref(),
                },
                &registry,
            )?
        };

        let source_key = req.source.cache_key(req.source_cache_key.as_deref())?;
        let source = self
            .sources
            .load(&req.source, &source_key, &req.cancel)
            .map_err(|e| FilmError::stage(RenderStage::Source, e))?;
        attempt.source = Some(Arc::clone(&source));
        let plan = GeometryPlan::new(
            &adjustments,
            source.width,
            source.height,
            req.target_size,
            self.max_dimension(req),
        )
        .map_err(|e| FilmError::stage(RenderStage::Geometry, e))?;
        attempt.plan = Some(plan);

        let seeds = film_seeds(req, &profile, &source_key);
        let keys = stage_keys(&source_key, &adjustments, &profile, &plan, seeds);
        if frame.output_key == keys.output
            && let Some(good) = frame.last_good.as_ref()
        {
            tracing::debug!("output unchanged; reusing last frame");
            canvas.copy_from(good);
            lock(&self.stats).output_reuses += 1;
            return Ok(());
        }

        let lut = self.lut(&profile)?;
        let backend = self.backend()?;
        attempt.backend_used = true;
        backend.warm_up()?;
        let job = Job {
            backend: backend.as_ref(),
            source: &source,
            source_key: &source_key,
            adjustments: &adjustments,
            profile: &profile,
            plan: &plan,
            seeds,
            lut,
            cancel: &req.cancel,
        };
        let (base, mut report) =
            render_frame(job.backend, frame, &job.frame_request(&keys), job.cancel)?;
        let id = self.composite_locals(&job, slot, frame, base, &mut report)?;
        compose_output(frame.arena.get(id)?, &adjustments.date_stamp, canvas)?;

        frame.output_key = keys.output;
        match frame.last_good.as_mut() {
            Some(good) => good.copy_from(canvas),
            None => frame.last_good = Some(canvas.clone()),
        }
        lock(&self.stats).record(&report);
        Ok(())
    }

    /// Blend every active local layer over the slot's finished surface.
    fn composite_locals(
        &self,
        job: &Job<'_>,
        slot: &SlotKey,
        frame: &mut FrameState,
        base: SurfaceId,
        report: &mut FrameReport,
    ) -> FilmResult<SurfaceId> {
        let layers: Vec<(&LocalAdjustment, EditingAdjustments)> = job
            .adjustments
            .local_adjustments
            .iter()
            .filter(|l| l.is_active())
            .map(|l| (l, local_layer_adjustments(job.adjustments, l)))
            .collect();
        if layers.is_empty() {
            return Ok(base);
        }
        let layer_keys: Vec<StageKeys> = layers
            .iter()
            .map(|(_, adj)| job.keys_for(adj))
            .collect();

        let mut blend_key = frame.pixi_key.clone();
        for ((local, _), keys) in layers.iter().zip(&layer_keys) {
            blend_key.push('|');
            blend_key.push_str(&keys.pixi);
            blend_key.push('|');
            blend_key.push_str(&local_adjustment_key(local));
        }
        if frame.local_blend_key == blend_key
            && let Some(id) = frame.local_blend
        {
            tracing::debug!(layers = layers.len(), "local layers unchanged; reusing blend");
            report.skip(RenderStage::Local);
            return Ok(id);
        }
        frame.invalidate_from(FrameSurface::LocalBlend);

        let base_surface = frame.arena.get(base)?;
        let mut working = frame.pool.borrow(base_surface.width, base_surface.height);
        working.copy_from(base_surface);
        let mut composite_key = frame.pixi_key.clone();
        for ((local, adj), keys) in layers.iter().zip(&layer_keys) {
            job.cancel.check()?;
            let layer_slot = slot.local(&local.id);
            let _permit = self.mutex.acquire(&layer_slot, job.cancel)?;
            let layer_frame = self.frame(&layer_slot);
            let mut layer_frame = lock(&layer_frame);
            let layer_job = Job {
                adjustments: adj,
                lut: job.lut.clone(),
                ..*job
            };
            let (id, layer_report) = render_frame(
                job.backend,
                &mut layer_frame,
                &layer_job.frame_request(keys),
                job.cancel,
            )?;
            report.merge(layer_report);

            let FrameState {
                arena, local_mask, ..
            } = &mut *layer_frame;
            let mask = layer_mask(local_mask, local, &working, &composite_key)
                .map_err(|e| FilmError::stage(RenderStage::Local, e))?;
            blend_layer(&mut working, arena.get(id)?, mask, local.amount / 100.0)?;
            composite_key.push('|');
            composite_key.push_str(&local_adjustment_key(local));
        }
        let id = frame.store(FrameSurface::LocalBlend, working);
        frame.local_blend_key = blend_key;
        report.ran(RenderStage::Local);
        Ok(id)
    }

    fn lut(&self, profile: &ResolvedRenderProfile) -> FilmResult<Option<Arc<HaldLut>>> {
        profile
            .lut
            .as_ref()
            .map(|l| lock(&self.luts).get(&l.path))
            .transpose()
            .map_err(|e| FilmError::stage(RenderStage::Film, e))
    }

    /// Lenient-mode fallback chain: last good frame, then geometry-only CPU output.
    fn recover(
        &self,
        err: FilmError,
        slot: &SlotKey,
        frame: &mut FrameState,
        attempt: &Attempt,
        canvas: &mut Canvas,
        cancel: &CancellationToken,
    ) -> FilmResult<()> {
        let message = err.to_string();
        let admitted = lock(&self.errors).admit(&message, self.opts.dedupe_errors);
        {
            let mut stats = lock(&self.stats);
            if admitted {
                stats.errors_logged += 1;
            } else {
                stats.errors_suppressed += 1;
            }
        }
        if admitted {
            tracing::warn!(slot = %slot, error = %err, "render failed; falling back");
        }
        frame.last_render_error = Some(message.clone());
        if err.is_context_unavailable() {
            self.drop_backend(Some(&message));
        } else if attempt.backend_used {
            self.drop_backend(None);
        }

        if let Some(good) = frame.last_good.as_ref() {
            canvas.copy_from(good);
            lock(&self.stats).fallback_last_good += 1;
            return Ok(());
        }
        if let (Some(source), Some(plan)) = (attempt.source.as_ref(), attempt.plan.as_ref()) {
            let geometry_only = plan
                .execute(source, cancel)
                .and_then(|s| compose_output(&s, &DateStamp::default(), canvas));
            match geometry_only {
                Ok(()) => {
                    lock(&self.stats).fallback_geometry += 1;
                    return Ok(());
                }
                Err(e) if e.is_abort() => return Err(e),
                Err(e) => tracing::warn!(error = %e, "geometry-only fallback failed"),
            }
        }
        Err(err)
    }
}

impl Drop for RendererContext {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Inputs shared by the main slot and its local layers for one render.
#[derive(Clone)]
struct Job<'a> {
    backend: &'a dyn RendererBackend,
    source: &'a Arc<Surface>,
    source_key: &'a str,
    adjustments: &'a EditingAdjustments,
    profile: &'a ResolvedRenderProfile,
    plan: &'a GeometryPlan,
    seeds: FilmSeeds,
    lut: Option<Arc<HaldLut>>,
    cancel: &'a CancellationToken,
}

impl Job<'_> {
    fn frame_request<'k>(&'k self, keys: &'k StageKeys) -> FrameRequest<'k> {
        FrameRequest {
            source: self.source,
            adjustments: self.adjustments,
            profile: self.profile,
            keys,
            plan: self.plan,
            seeds: self.seeds,
            lut: self.lut.clone(),
        }
    }

    fn keys_for(&self, adjustments: &EditingAdjustments) -> StageKeys {
        stage_keys(
            self.source_key,
            adjustments,
            self.profile,
            self.plan,
            self.seeds,
        )
    }
}

fn stage_keys(
    source_key: &str,
    adjustments: &EditingAdjustments,
    profile: &ResolvedRenderProfile,
    plan: &GeometryPlan,
    seeds: FilmSeeds,
) -> StageKeys {
    compute_stage_keys(&KeyInputs {
        source_key,
        adjustments,
        profile,
        output_size: plan.output_size(),
        seeds,
    })
}

/// Per-module seeds for this request.
fn film_seeds(req: &RenderRequest, profile: &ResolvedRenderProfile, source_key: &str) -> FilmSeeds {
    let grain = &profile.v2.grain;
    let defects = profile.v2.defects.as_ref();
    FilmSeeds {
        grain: module_seed(req, source_key, "grain", grain.seed_mode, grain.seed),
        defects: defects.map_or(0, |d| {
            module_seed(req, source_key, "defects", d.seed_mode, d.seed)
        }),
    }
}

fn module_seed(
    req: &RenderRequest,
    source_key: &str,
    tag: &str,
    mode: SeedMode,
    locked: u32,
) -> u64 {
    let salted = |seed: u64| {
        let mut h = Fnv1a64::new(seed);
        h.write_str(tag);
        mix64(h.finish())
    };
    let per_asset = || {
        let mut h = Fnv1a64::new_default();
        h.write_str(req.seed_key.as_deref().unwrap_or(source_key));
        h.write_u8(0);
        h.write_str(req.seed_salt.as_deref().unwrap_or_default());
        h.write_u8(0);
        h.write_str(tag);
        mix64(h.finish())
    };
    match mode {
        SeedMode::Locked => u64::from(locked),
        SeedMode::PerAsset => per_asset(),
        SeedMode::PerRender => {
            let explicit = match req.mode {
                RenderMode::Export => req.render_seed.or(req.export_seed),
                RenderMode::Preview => req.render_seed,
            };
            explicit.map_or_else(rand::random, salted)
        }
        SeedMode::PerExport if req.mode == RenderMode::Export => {
            req.export_seed.map_or_else(rand::random, salted)
        }
        SeedMode::PerExport => per_asset(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/context.rs"]
mod tests;
