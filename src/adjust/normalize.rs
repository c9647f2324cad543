use crate::adjust::model::{
    BrushPoint, ColorGrading, CropRect, CurvePoint, Curves, DateStamp, EditingAdjustments,
    Geometry, GradeWheel, LocalAdjustment, LocalMask, MaskRange, MaskShape, OpticsCorrection,
    identity_curve,
};
use std::collections::HashSet;

/// Maximum control points kept per point curve.
pub const MAX_CURVE_POINTS: usize = 16;
/// Smallest crop extent along either axis.
pub const MIN_CROP_EXTENT: f32 = 0.01;
const CURVE_X_EPS: f32 = 1e-4;

/// Clamp and fill `input` into its canonical form.
///
/// Pure and idempotent: `normalize(normalize(x)) == normalize(x)`. Non-finite numbers take the
/// field default.
pub fn normalize_adjustments(input: &EditingAdjustments) -> EditingAdjustments {
    let d = EditingAdjustments::default();
    let mut out = input.clone();

    for (v, def) in [
        (&mut out.exposure, d.exposure),
        (&mut out.contrast, d.contrast),
        (&mut out.highlights, d.highlights),
        (&mut out.shadows, d.shadows),
        (&mut out.whites, d.whites),
        (&mut out.blacks, d.blacks),
        (&mut out.temperature, d.temperature),
        (&mut out.tint, d.tint),
        (&mut out.saturation, d.saturation),
        (&mut out.vibrance, d.vibrance),
        (&mut out.texture, d.texture),
        (&mut out.clarity, d.clarity),
        (&mut out.dehaze, d.dehaze),
        (&mut out.vignette, d.vignette),
    ] {
        *v = clamp_or(*v, -100.0, 100.0, def);
    }
    for (v, def) in [
        (&mut out.sharpening, d.sharpening),
        (&mut out.noise_reduction, d.noise_reduction),
        (&mut out.color_noise_reduction, d.color_noise_reduction),
        (&mut out.grain_amount, d.grain_amount),
        (&mut out.grain_size, d.grain_size),
        (&mut out.grain_roughness, d.grain_roughness),
        (&mut out.halation, d.halation),
        (&mut out.bloom, d.bloom),
        (&mut out.vignette_midpoint, d.vignette_midpoint),
        (&mut out.fade, d.fade),
        (&mut out.film_intensity, d.film_intensity),
    ] {
        *v = clamp_or(*v, 0.0, 100.0, def);
    }
    out.sharpen_radius = clamp_or(out.sharpen_radius, 0.5, 3.0, d.sharpen_radius);

    for band in out.hsl.bands_mut() {
        band.hue = clamp_or(band.hue, -100.0, 100.0, 0.0);
        band.saturation = clamp_or(band.saturation, -100.0, 100.0, 0.0);
        band.luminance = clamp_or(band.luminance, -100.0, 100.0, 0.0);
    }

    normalize_curves(&mut out.curves);
    normalize_color_grading(&mut out.color_grading);
    normalize_geometry(&mut out.geometry);
    normalize_optics(&mut out.optics);
    normalize_stamp(&mut out.date_stamp);

    out.film_profile_id = out
        .film_profile_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    out.film_overrides.retain(|_, v| v.is_object());

    let mut seen = HashSet::new();
    out.local_adjustments = out
        .local_adjustments
        .iter()
        .filter(|l| seen.insert(l.id.clone()))
        .map(normalize_local)
        .collect();

    out
}

fn clamp_or(v: f32, lo: f32, hi: f32, default: f32) -> f32 {
    if v.is_finite() {
        // `+ 0.0` folds -0.0 so serialized output is stable.
        v.clamp(lo, hi) + 0.0
    } else {
        default
    }
}

fn normalize_curves(c: &mut Curves) {
    for pts in [&mut c.rgb, &mut c.red, &mut c.green, &mut c.blue] {
        *pts = normalize_curve_points(pts);
    }
    c.tone.highlights = clamp_or(c.tone.highlights, -100.0, 100.0, 0.0);
    c.tone.lights = clamp_or(c.tone.lights, -100.0, 100.0, 0.0);
    c.tone.darks = clamp_or(c.tone.darks, -100.0, 100.0, 0.0);
    c.tone.shadows = clamp_or(c.tone.shadows, -100.0, 100.0, 0.0);
}

/// Sort, deduplicate, clamp, pin endpoints and cap a point curve.
pub(crate) fn normalize_curve_points(points: &[CurvePoint]) -> Vec<CurvePoint> {
    let mut pts: Vec<CurvePoint> = points
        .iter()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .map(|p| {
            let mut x = p.x.clamp(0.0, 1.0);
            if x < CURVE_X_EPS {
                x = 0.0;
            } else if x > 1.0 - CURVE_X_EPS {
                x = 1.0;
            }
            CurvePoint::new(x, p.y.clamp(0.0, 1.0) + 0.0)
        })
        .collect();
    if pts.is_empty() {
        return identity_curve();
    }
    pts.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut deduped: Vec<CurvePoint> = Vec::with_capacity(pts.len());
    for p in pts {
        match deduped.last_mut() {
            Some(last) if p.x - last.x < CURVE_X_EPS => last.y = p.y,
            _ => deduped.push(p),
        }
    }

    if deduped.first().is_some_and(|p| p.x > 0.0) {
        deduped.insert(0, CurvePoint::new(0.0, 0.0));
    }
    if deduped.last().is_some_and(|p| p.x < 1.0) {
        deduped.push(CurvePoint::new(1.0, 1.0));
    }

    if deduped.len() > MAX_CURVE_POINTS {
        let n = deduped.len();
        let keep = MAX_CURVE_POINTS;
        deduped = (0..keep)
            .map(|i| deduped[i * (n - 1) / (keep - 1)])
            .collect();
    }
    deduped
}

fn normalize_wheel(w: &mut GradeWheel) {
    w.hue = if w.hue.is_finite() {
        w.hue.rem_euclid(360.0) + 0.0
    } else {
        0.0
    };
    if w.hue >= 360.0 {
        w.hue = 0.0;
    }
    w.saturation = clamp_or(w.saturation, 0.0, 100.0, 0.0);
    w.luminance = clamp_or(w.luminance, -100.0, 100.0, 0.0);
}

fn normalize_color_grading(g: &mut ColorGrading) {
    normalize_wheel(&mut g.shadows);
    normalize_wheel(&mut g.midtones);
    normalize_wheel(&mut g.highlights);
    g.blend = clamp_or(g.blend, 0.0, 100.0, 50.0);
    g.balance = clamp_or(g.balance, -100.0, 100.0, 0.0);
}

fn normalize_crop(c: &mut CropRect) {
    let d = CropRect::default();
    c.x = clamp_or(c.x, 0.0, 1.0 - MIN_CROP_EXTENT, d.x);
    c.y = clamp_or(c.y, 0.0, 1.0 - MIN_CROP_EXTENT, d.y);
    c.width = clamp_or(c.width, MIN_CROP_EXTENT, 1.0 - c.x, 1.0 - c.x);
    c.height = clamp_or(c.height, MIN_CROP_EXTENT, 1.0 - c.y, 1.0 - c.y);
}

fn normalize_geometry(g: &mut Geometry) {
    normalize_crop(&mut g.crop);
    g.rotation = clamp_or(g.rotation, -45.0, 45.0, 0.0);
    g.quarter_turns %= 4;
    g.perspective_vertical = clamp_or(g.perspective_vertical, -100.0, 100.0, 0.0);
    g.perspective_horizontal = clamp_or(g.perspective_horizontal, -100.0, 100.0, 0.0);
    g.scale = clamp_or(g.scale, 50.0, 200.0, 100.0);
}

fn normalize_optics(o: &mut OpticsCorrection) {
    o.distortion = clamp_or(o.distortion, -100.0, 100.0, 0.0);
    o.distortion_k2 = clamp_or(o.distortion_k2, -100.0, 100.0, 0.0);
    o.chromatic_aberration.red = clamp_or(o.chromatic_aberration.red, -8.0, 8.0, 0.0);
    o.chromatic_aberration.blue = clamp_or(o.chromatic_aberration.blue, -8.0, 8.0, 0.0);
    o.vignette_correction = clamp_or(o.vignette_correction, -100.0, 100.0, 0.0);
}

fn normalize_stamp(s: &mut DateStamp) {
    s.text = s.text.trim().to_string();
    s.scale = clamp_or(s.scale, 0.01, 0.2, DateStamp::default().scale);
}

fn normalize_range(r: &mut MaskRange) {
    let d = MaskRange::default();
    r.luma_min = clamp_or(r.luma_min, 0.0, 1.0, d.luma_min);
    r.luma_max = clamp_or(r.luma_max, r.luma_min, 1.0, d.luma_max.max(r.luma_min));
    r.luma_feather = clamp_or(r.luma_feather, 0.0, 1.0, d.luma_feather);
    r.hue_center = if r.hue_center.is_finite() {
        r.hue_center.rem_euclid(360.0) + 0.0
    } else {
        d.hue_center
    };
    if r.hue_center >= 360.0 {
        r.hue_center = 0.0;
    }
    r.hue_range = clamp_or(r.hue_range, 0.0, 180.0, d.hue_range);
    r.hue_feather = clamp_or(r.hue_feather, 0.0, 180.0, d.hue_feather);
    r.sat_min = clamp_or(r.sat_min, 0.0, 1.0, d.sat_min);
    r.sat_feather = clamp_or(r.sat_feather, 0.0, 1.0, d.sat_feather);
}

fn normalize_shape(shape: &mut MaskShape) {
    match shape {
        MaskShape::Brush {
            size,
            feather,
            flow,
            points,
        } => {
            *size = clamp_or(*size, 0.001, 1.0, 0.05);
            *feather = clamp_or(*feather, 0.0, 1.0, 0.5);
            *flow = clamp_or(*flow, 0.0, 1.0, 1.0);
            *points = points
                .iter()
                .filter(|p| p.x.is_finite() && p.y.is_finite())
                .map(|p| BrushPoint {
                    x: p.x.clamp(0.0, 1.0) + 0.0,
                    y: p.y.clamp(0.0, 1.0) + 0.0,
                    pressure: clamp_or(p.pressure, 0.0, 1.0, 1.0),
                })
                .collect();
        }
        MaskShape::Radial {
            center_x,
            center_y,
            radius_x,
            radius_y,
            feather,
        } => {
            *center_x = clamp_or(*center_x, -1.0, 2.0, 0.5);
            *center_y = clamp_or(*center_y, -1.0, 2.0, 0.5);
            *radius_x = clamp_or(*radius_x, 0.001, 2.0, 0.25);
            *radius_y = clamp_or(*radius_y, 0.001, 2.0, 0.25);
            *feather = clamp_or(*feather, 0.0, 1.0, 0.5);
        }
        MaskShape::Linear {
            start_x,
            start_y,
            end_x,
            end_y,
            feather,
        } => {
            *start_x = clamp_or(*start_x, -1.0, 2.0, 0.5);
            *start_y = clamp_or(*start_y, -1.0, 2.0, 0.3);
            *end_x = clamp_or(*end_x, -1.0, 2.0, 0.5);
            *end_y = clamp_or(*end_y, -1.0, 2.0, 0.7);
            *feather = clamp_or(*feather, 0.0, 1.0, 0.5);
        }
    }
}

fn normalize_mask(m: &mut LocalMask) {
    normalize_shape(&mut m.shape);
    normalize_range(&mut m.range);
}

fn normalize_local(l: &LocalAdjustment) -> LocalAdjustment {
    let mut out = l.clone();
    out.amount = clamp_or(out.amount, 0.0, 100.0, 100.0);
    normalize_mask(&mut out.mask);
    for v in out.adjustments.fields_mut() {
        *v = clamp_or(*v, -100.0, 100.0, 0.0);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/adjust/normalize.rs"]
mod tests;
