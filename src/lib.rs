//! filmlab renders a parametric film-emulation adjustment stack onto photographs.
//!
//! The public API is context-oriented:
//!
//! - Build one [`RendererContext`] from [`RendererOpts`] at startup
//! - Describe a render with a [`RenderRequest`] ([`EditingAdjustments`] plus an optional
//!   [`FilmProfileInput`]) and draw it into a [`Canvas`] with
//!   [`RendererContext::render_to_canvas`]
//! - Export encoded blobs with [`RendererContext::render_image_to_blob`], or off-thread through
//!   an [`ExportWorker`]
//!
//! Every render slot keeps a dirty-key cache of its intermediate surfaces, so repeated calls only
//! re-run the stages whose inputs changed.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod foundation;

pub(crate) mod adjust;
pub(crate) mod assets;
pub(crate) mod compile;
/// Renderer options and config file loading.
pub mod config;
pub(crate) mod film;
/// Masked local adjustment layers.
pub mod local;
/// Canvas composition, overlays and export encoding.
pub mod output;
/// Rendering backends and the multi-pass pipeline.
pub mod render;
/// Renderer context and export worker.
pub mod session;

pub use crate::foundation::cancel::CancellationToken;
pub use crate::foundation::core::{Canvas, RenderMode, SlotKey, Surface, TargetSize};
pub use crate::foundation::error::{FilmError, FilmResult, RenderStage};

pub use crate::adjust::model::{
    BrushPoint, ChromaticAberration, ColorGrading, CropRect, CurvePoint, Curves, DateStamp,
    EditingAdjustments, FilmOverrides, Geometry, GradeWheel, HslAdjustments, HslBand,
    LocalAdjustment, LocalDelta, LocalMask, MaskRange, MaskShape, OpticsCorrection, StampCorner,
    ToneCurve,
};
pub use crate::adjust::normalize::{MAX_CURVE_POINTS, MIN_CROP_EXTENT, normalize_adjustments};
pub use crate::assets::decode::decode_source;
pub use crate::assets::source::{BitmapCacheStats, SourceInput};
pub use crate::compile::keys::{
    FilmSeeds, KeyInputs, StageKeys, compute_stage_keys, local_adjustment_key,
    source_key_for_bytes,
};
pub use crate::config::{BackendChoice, RendererOpts, RendererOptsHandle, load_opts};
pub use crate::film::lut::{
    DirLutSource, HaldLut, LutCache, LutSource, MemoryLutSource, STOCK_IDS, generate_stock_lut,
};
pub use crate::film::migrate::{MIGRATED_LUT_LEVEL, migrate_film_profile_v1_to_v2};
pub use crate::film::model::{
    Bloom, ColorCast, ColorMatrix, ColorScienceParams, DefectsParams, FilmModule,
    FilmModuleConfig, FilmModules, FilmProfile, FilmProfileInput, FilmProfileV2, GrainLayer,
    GrainParams, Halation, IDENTITY_MATRIX, LutLayer, ProfileMode, ProfileSource, ResolvedLut,
    ResolvedRenderProfile, ScanParams, SeedMode, ToneParams, ToneResponse, VignetteLayer,
};
pub use crate::film::normalize::{normalize_film_profile, normalize_film_profile_v2};
pub use crate::film::presets::{
    ProfileRegistry, STOCK_LUT_DIR, builtin_preset, builtin_presets, stock_lut_path,
};
pub use crate::film::resolve::{
    ProfileSelection, apply_film_overrides, apply_film_overrides_v2, derive_film_profile,
    normalize_lut_path, resolve_film_profile, resolve_render_profile, scale_film_profile_amount,
    scale_film_profile_v2,
};
pub use crate::output::encode::OutputFormat;
pub use crate::render::backend::{
    BackendFactory, BackendKind, RendererBackend, create_backend, default_backend_factory,
};
pub use crate::render::cpu::CpuBackend;
pub use crate::render::geometry::GeometryPlan;
pub use crate::render::passes::{PassUniforms, run_pass_cpu};
pub use crate::session::context::{
    DEFAULT_SLOT, ExportRequest, ExportStage, QualityProfile, RenderRequest, RenderStats,
    RendererContext,
};
pub use crate::session::worker::{ExportWorker, StartPayload, WorkerRequest, WorkerResponse};
