use crate::adjust::model::{CurvePoint, EditingAdjustments, LocalAdjustment, MaskShape};
use crate::film::model::{ProfileMode, ResolvedRenderProfile};
use crate::foundation::error::RenderStage;
use crate::foundation::math::key_f32;
use xxhash_rust::xxh3::Xxh3;

const XXH3_SEED: u64 = 0x6f1d_2a4c_93b7_e805;

/// Seeds resolved for the stochastic film modules of one render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FilmSeeds {
    /// Grain noise seed.
    pub grain: u64,
    /// Light leak / dust / scratch placement seed.
    pub defects: u64,
}

/// Dirty keys for one render, one per stage plus the aggregates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageKeys {
    /// Source identity (cache key or content hash).
    pub source: String,
    /// Crop, rotation, perspective, scale, flips, lens warp and output size.
    pub geometry: String,
    /// Source plus geometry.
    pub upload: String,
    /// Exposure, white balance, tone zones, presence and grading.
    pub master: String,
    /// Per-band hue, saturation and luminance.
    pub hsl: String,
    /// Point and parametric curves.
    pub curve: String,
    /// Texture, clarity, sharpening and noise reduction.
    pub detail: String,
    /// Resolved profile film layers, seeds and fade.
    pub film: String,
    /// Halation, bloom, vignette and vignette correction.
    pub optics: String,
    /// Geometry, upload, master, HSL, curve and detail.
    pub pre_film: String,
    /// `pre_film` plus film and optics.
    pub pixi: String,
    /// `pixi` plus local layers, overlay text and output size.
    pub output: String,
}

/// Everything the key computation reads.
#[derive(Clone, Copy, Debug)]
pub struct KeyInputs<'a> {
    /// Source identity from [`source_key_for_bytes`].
    pub source_key: &'a str,
    /// Normalized adjustments.
    pub adjustments: &'a EditingAdjustments,
    /// Resolved film profile.
    pub profile: &'a ResolvedRenderProfile,
    /// Output size after geometry.
    pub output_size: (u32, u32),
    /// Seeds of the stochastic film modules.
    pub seeds: FilmSeeds,
}

/// Textual key builder: stage tag followed by comma-separated fixed-precision fields.
pub(crate) struct KeyWriter {
    buf: String,
}

impl KeyWriter {
    pub(crate) fn new(tag: &str) -> Self {
        let mut buf = String::with_capacity(128);
        buf.push_str(tag);
        buf.push(':');
        Self { buf }
    }

    fn sep(&mut self) {
        if !self.buf.ends_with(':') {
            self.buf.push(',');
        }
    }

    pub(crate) fn f(&mut self, v: f32) -> &mut Self {
        self.sep();
        self.buf.push_str(&key_f32(v));
        self
    }

    pub(crate) fn fs(&mut self, vs: &[f32]) -> &mut Self {
        for &v in vs {
            self.f(v);
        }
        self
    }

    pub(crate) fn b(&mut self, v: bool) -> &mut Self {
        self.sep();
        self.buf.push(if v { '1' } else { '0' });
        self
    }

    pub(crate) fn u(&mut self, v: u64) -> &mut Self {
        self.sep();
        self.buf.push_str(&v.to_string());
        self
    }

    /// Free text; length-prefixed so separators inside it cannot alias other fields.
    pub(crate) fn s(&mut self, v: &str) -> &mut Self {
        self.sep();
        self.buf.push_str(&v.len().to_string());
        self.buf.push('#');
        self.buf.push_str(v);
        self
    }

    pub(crate) fn points(&mut self, pts: &[CurvePoint]) -> &mut Self {
        self.u(pts.len() as u64);
        for p in pts {
            self.f(p.x).f(p.y);
        }
        self
    }

    pub(crate) fn finish(&mut self) -> String {
        std::mem::take(&mut self.buf)
    }
}

/// Source identity: the caller's cache key when given, else a content hash.
pub fn source_key_for_bytes(bytes: &[u8], cache_key: Option<&str>) -> String {
    match cache_key {
        Some(k) if !k.is_empty() => format!("{}:k#{k}", RenderStage::Source.tag()),
        _ => {
            let mut h = Xxh3::with_seed(XXH3_SEED);
            h.update(bytes);
            format!("{}:{:032x}", RenderStage::Source.tag(), h.digest128())
        }
    }
}

fn geometry_key(a: &EditingAdjustments, size: (u32, u32)) -> String {
    let g = &a.geometry;
    let o = &a.optics;
    let mut w = KeyWriter::new(RenderStage::Geometry.tag());
    w.fs(&[g.crop.x, g.crop.y, g.crop.width, g.crop.height, g.rotation])
        .u(u64::from(g.quarter_turns))
        .fs(&[g.perspective_vertical, g.perspective_horizontal, g.scale])
        .b(g.flip_horizontal)
        .b(g.flip_vertical)
        .b(o.enabled);
    if o.enabled {
        w.fs(&[
            o.distortion,
            o.distortion_k2,
            o.chromatic_aberration.red,
            o.chromatic_aberration.blue,
        ]);
    }
    w.u(u64::from(size.0)).u(u64::from(size.1)).finish()
}

fn master_key(a: &EditingAdjustments) -> String {
    let cg = &a.color_grading;
    let mut w = KeyWriter::new(RenderStage::Master.tag());
    w.fs(&[
        a.exposure,
        a.contrast,
        a.highlights,
        a.shadows,
        a.whites,
        a.blacks,
        a.temperature,
        a.tint,
        a.saturation,
        a.vibrance,
    ]);
    for wheel in [&cg.shadows, &cg.midtones, &cg.highlights] {
        w.fs(&[wheel.hue, wheel.saturation, wheel.luminance]);
    }
    w.fs(&[cg.blend, cg.balance]).finish()
}

fn hsl_key(a: &EditingAdjustments) -> String {
    let mut w = KeyWriter::new(RenderStage::Hsl.tag());
    for band in a.hsl.bands() {
        w.fs(&[band.hue, band.saturation, band.luminance]);
    }
    w.finish()
}

fn curve_key(a: &EditingAdjustments) -> String {
    let c = &a.curves;
    let mut w = KeyWriter::new(RenderStage::Curve.tag());
    w.fs(&[c.tone.highlights, c.tone.lights, c.tone.darks, c.tone.shadows])
        .points(&c.rgb)
        .points(&c.red)
        .points(&c.green)
        .points(&c.blue)
        .finish()
}

fn detail_key(a: &EditingAdjustments) -> String {
    let mut w = KeyWriter::new(RenderStage::Detail.tag());
    w.fs(&[
        a.texture,
        a.clarity,
        a.dehaze,
        a.sharpening,
        a.sharpen_radius,
        a.noise_reduction,
        a.color_noise_reduction,
    ])
    .finish()
}

fn film_key(a: &EditingAdjustments, p: &ResolvedRenderProfile, seeds: FilmSeeds) -> String {
    let v2 = &p.v2;
    let mut w = KeyWriter::new(RenderStage::Film.tag());
    w.b(p.mode == ProfileMode::V2);
    match &p.lut {
        Some(l) => {
            w.s(&l.path).u(u64::from(l.size)).f(l.intensity);
        }
        None => {
            w.s("");
        }
    }
    let t = &v2.tone_response;
    w.b(t.enabled)
        .fs(&[t.shoulder, t.toe, t.gamma, t.exposure, t.contrast])
        .fs(&[t.highlights, t.shadows, t.whites, t.blacks])
        .fs(&t.curve);
    match &v2.color_matrix {
        Some(m) if m.enabled => {
            w.fs(&m.matrix);
        }
        _ => {
            w.b(false);
        }
    }
    match &v2.color_cast {
        Some(c) if c.enabled => {
            w.fs(&c.shadows).fs(&c.midtones).fs(&c.highlights);
        }
        _ => {
            w.b(false);
        }
    }
    let g = &v2.grain;
    w.b(g.enabled);
    if g.enabled {
        w.fs(&[g.amount, g.size, g.roughness, g.color, g.shadow_bias])
            .u(seeds.grain);
    }
    match &v2.defects {
        Some(d) if d.enabled && !d.params.is_neutral() => {
            w.f(d.amount)
                .fs(&[
                    d.params.leak_probability,
                    d.params.leak_strength,
                    d.params.dust_amount,
                    d.params.scratch_amount,
                ])
                .u(seeds.defects);
        }
        _ => {
            w.b(false);
        }
    }
    w.f(a.fade).finish()
}

fn optics_key(a: &EditingAdjustments, p: &ResolvedRenderProfile) -> String {
    let v2 = &p.v2;
    let mut w = KeyWriter::new(RenderStage::Optics.tag());
    let h = &v2.halation;
    w.b(h.enabled)
        .fs(&[h.threshold, h.amount, h.radius])
        .fs(&h.tint);
    let b = &v2.bloom;
    w.b(b.enabled).fs(&[b.threshold, b.amount, b.radius]);
    let v = &v2.vignette;
    w.b(v.enabled)
        .fs(&[v.amount, v.midpoint, v.roundness, v.feather]);
    let correction = if a.optics.enabled {
        a.optics.vignette_correction
    } else {
        0.0
    };
    w.f(correction).finish()
}

/// Key of one local layer: mask, range, opacity and delta.
pub fn local_adjustment_key(l: &LocalAdjustment) -> String {
    let mut w = KeyWriter::new(RenderStage::Local.tag());
    w.s(&l.id).b(l.enabled).f(l.amount).b(l.mask.invert);
    match &l.mask.shape {
        MaskShape::Brush {
            size,
            feather,
            flow,
            points,
        } => {
            w.s("brush").fs(&[*size, *feather, *flow]).u(points.len() as u64);
            for p in points {
                w.fs(&[p.x, p.y, p.pressure]);
            }
        }
        MaskShape::Radial {
            center_x,
            center_y,
            radius_x,
            radius_y,
            feather,
        } => {
            w.s("radial")
                .fs(&[*center_x, *center_y, *radius_x, *radius_y, *feather]);
        }
        MaskShape::Linear {
            start_x,
            start_y,
            end_x,
            end_y,
            feather,
        } => {
            w.s("linear")
                .fs(&[*start_x, *start_y, *end_x, *end_y, *feather]);
        }
    }
    let r = &l.mask.range;
    w.fs(&[
        r.luma_min,
        r.luma_max,
        r.luma_feather,
        r.hue_center,
        r.hue_range,
        r.hue_feather,
        r.sat_min,
        r.sat_feather,
    ])
    .fs(&l.adjustments.fields())
    .finish()
}

/// Compute every stage key. Pure: identical inputs give identical keys.
///
/// Per-stage keys cover only that stage's own parameters; the aggregates chain them, so a
/// change in any stage changes `pre_film`/`pixi`/`output` but leaves sibling stage keys alone.
pub fn compute_stage_keys(inputs: &KeyInputs<'_>) -> StageKeys {
    let a = inputs.adjustments;
    let source = inputs.source_key.to_string();
    let geometry = geometry_key(a, inputs.output_size);
    let upload = format!("{}:{source}|{geometry}", RenderStage::Upload.tag());
    let master = master_key(a);
    let hsl = hsl_key(a);
    let curve = curve_key(a);
    let detail = detail_key(a);
    let film = film_key(a, inputs.profile, inputs.seeds);
    let optics = optics_key(a, inputs.profile);

    let pre_film = [upload.as_str(), &master, &hsl, &curve, &detail].join("|");
    let pixi = [pre_film.as_str(), &film, &optics].join("|");

    let mut out = KeyWriter::new(RenderStage::Output.tag());
    out.u(u64::from(inputs.output_size.0))
        .u(u64::from(inputs.output_size.1));
    let locals: Vec<&LocalAdjustment> = a
        .local_adjustments
        .iter()
        .filter(|l| l.is_active())
        .collect();
    out.u(locals.len() as u64);
    for l in locals {
        out.s(&local_adjustment_key(l));
    }
    let stamp = &a.date_stamp;
    if stamp.enabled && !stamp.text.is_empty() {
        out.s(&stamp.text)
            .u(stamp.corner as u64)
            .f(stamp.scale);
    } else {
        out.b(false);
    }
    let output = format!("{pixi}|{}", out.finish());

    StageKeys {
        source,
        geometry,
        upload,
        master,
        hsl,
        curve,
        detail,
        film,
        optics,
        pre_film,
        pixi,
        output,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compile/keys.rs"]
mod tests;
