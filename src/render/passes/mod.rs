//! The six adjustment passes and their uniforms.
//!
//! Each pass reads one [`Surface`] and produces another of the same size. Uniforms are
//! resolved once per render into a [`ScratchUniforms`] owned by the slot's frame state.

pub(crate) mod curve;
pub(crate) mod detail;
pub(crate) mod film;
pub(crate) mod hsl;
pub(crate) mod master;
pub(crate) mod optics;

use std::sync::Arc;

use crate::adjust::model::EditingAdjustments;
use crate::compile::keys::FilmSeeds;
use crate::film::lut::HaldLut;
use crate::film::model::ResolvedRenderProfile;
use crate::foundation::cancel::CancellationToken;
use crate::foundation::core::Surface;
use crate::foundation::error::{FilmResult, RenderStage};

pub use curve::CurveUniforms;
pub use detail::DetailUniforms;
pub use film::FilmUniforms;
pub use hsl::HslUniforms;
pub use master::MasterUniforms;
pub use optics::OpticsUniforms;

/// Borrowed uniforms for a single pass invocation.
#[derive(Clone, Copy, Debug)]
pub enum PassUniforms<'a> {
    /// Exposure, white balance, tone masks, saturation and grading.
    Master(&'a MasterUniforms),
    /// Per-band hue/saturation/luminance.
    Hsl(&'a HslUniforms),
    /// Baked tone curves.
    Curve(&'a CurveUniforms),
    /// Local contrast, dehaze, sharpening and noise reduction.
    Detail(&'a DetailUniforms),
    /// LUT, tone response, cast, grain and defects.
    Film(&'a FilmUniforms),
    /// Halation, bloom and vignette.
    Optics(&'a OpticsUniforms),
}

impl PassUniforms<'_> {
    /// Stage this pass belongs to.
    pub fn stage(&self) -> RenderStage {
        match self {
            Self::Master(_) => RenderStage::Master,
            Self::Hsl(_) => RenderStage::Hsl,
            Self::Curve(_) => RenderStage::Curve,
            Self::Detail(_) => RenderStage::Detail,
            Self::Film(_) => RenderStage::Film,
            Self::Optics(_) => RenderStage::Optics,
        }
    }

    /// Whether running the pass would leave its input unchanged.
    pub fn is_identity(&self) -> bool {
        match self {
            Self::Master(u) => u.is_identity(),
            Self::Hsl(u) => u.is_identity(),
            Self::Curve(u) => u.is_identity(),
            Self::Detail(u) => u.is_identity(),
            Self::Film(u) => u.is_identity(),
            Self::Optics(u) => u.is_identity(),
        }
    }
}

/// Reference CPU implementation of every pass, writing into `output`.
///
/// Backends without a native path for a pass delegate here. `output` is resized as needed.
pub fn run_pass_cpu(
    pass: PassUniforms<'_>,
    input: &Surface,
    output: &mut Surface,
    cancel: &CancellationToken,
) -> FilmResult<()> {
    cancel.check()?;
    match pass {
        _ if pass.is_identity() => output.copy_from(input),
        PassUniforms::Master(u) => {
            output.copy_from(input);
            u.apply(output);
        }
        PassUniforms::Hsl(u) => {
            output.copy_from(input);
            u.apply(output);
        }
        PassUniforms::Curve(u) => {
            output.copy_from(input);
            u.apply(output);
        }
        PassUniforms::Film(u) => {
            output.copy_from(input);
            u.apply(output);
        }
        PassUniforms::Detail(u) => *output = u.apply(input, cancel)?,
        PassUniforms::Optics(u) => *output = u.apply(input, cancel)?,
    }
    Ok(())
}

/// Per-slot uniform scratch, rewritten in place on every render.
///
/// `fill_*` hands back borrows into this storage; the next fill overwrites it, so a borrowed
/// value must be consumed before the same scratch is filled again.
#[derive(Clone, Debug, Default)]
pub(crate) struct ScratchUniforms {
    pub(crate) master: MasterUniforms,
    pub(crate) hsl: HslUniforms,
    pub(crate) curve: CurveUniforms,
    pub(crate) detail: DetailUniforms,
    pub(crate) film: FilmUniforms,
    pub(crate) optics: OpticsUniforms,
}

impl ScratchUniforms {
    /// Resolve the four pre-film passes.
    pub(crate) fn fill_pre_film(&mut self, a: &EditingAdjustments) -> [PassUniforms<'_>; 4] {
        self.master.fill(a);
        self.hsl.fill(a);
        self.curve.fill(a);
        self.detail.fill(a);
        [
            PassUniforms::Master(&self.master),
            PassUniforms::Hsl(&self.hsl),
            PassUniforms::Curve(&self.curve),
            PassUniforms::Detail(&self.detail),
        ]
    }

    /// Resolve film and optics.
    pub(crate) fn fill_finish(
        &mut self,
        a: &EditingAdjustments,
        profile: &ResolvedRenderProfile,
        seeds: FilmSeeds,
        lut: Option<Arc<HaldLut>>,
        size: (u32, u32),
    ) -> [PassUniforms<'_>; 2] {
        self.film.fill(profile, a.fade, seeds, lut, size);
        self.optics.fill(a, profile);
        [
            PassUniforms::Film(&self.film),
            PassUniforms::Optics(&self.optics),
        ]
    }
}
