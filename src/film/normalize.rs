use crate::film::model::{
    ColorCast, ColorMatrix, ColorScienceParams, DefectsParams, FilmModuleConfig, FilmProfile,
    FilmProfileV2, GrainParams, LutLayer, ScanParams, ToneParams,
};

fn clamp_or(v: f32, lo: f32, hi: f32, default: f32) -> f32 {
    if v.is_finite() {
        v.clamp(lo, hi) + 0.0
    } else {
        default
    }
}

/// Module amounts are fractional percents in `[0, 100]`.
pub(crate) fn normalize_amount(v: f32) -> f32 {
    clamp_or(v, 0.0, 100.0, 100.0)
}

fn normalize_envelope<P>(m: &mut FilmModuleConfig<P>) {
    m.amount = normalize_amount(m.amount);
}

fn normalize_color_science(p: &mut ColorScienceParams) {
    p.lut_asset_id = p
        .lut_asset_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    p.lut_strength = clamp_or(p.lut_strength, 0.0, 1.0, 1.0);
    for c in &mut p.rgb_mix {
        *c = clamp_or(*c, 0.5, 1.5, 1.0);
    }
    p.temp_shift = clamp_or(p.temp_shift, -100.0, 100.0, 0.0);
    p.tint_shift = clamp_or(p.tint_shift, -100.0, 100.0, 0.0);
}

fn normalize_tone(p: &mut ToneParams) {
    for v in [
        &mut p.exposure,
        &mut p.contrast,
        &mut p.highlights,
        &mut p.shadows,
        &mut p.whites,
        &mut p.blacks,
        &mut p.curve_highlights,
        &mut p.curve_lights,
        &mut p.curve_darks,
        &mut p.curve_shadows,
    ] {
        *v = clamp_or(*v, -100.0, 100.0, 0.0);
    }
}

fn normalize_scan(p: &mut ScanParams) {
    let d = ScanParams::default();
    p.halation_threshold = clamp_or(p.halation_threshold, 0.5, 1.0, d.halation_threshold);
    p.halation_amount = clamp_or(p.halation_amount, 0.0, 1.0, 0.0);
    p.bloom_threshold = clamp_or(p.bloom_threshold, 0.5, 1.0, d.bloom_threshold);
    p.bloom_amount = clamp_or(p.bloom_amount, 0.0, 1.0, 0.0);
    p.vignette_amount = clamp_or(p.vignette_amount, -1.0, 1.0, 0.0);
    p.scan_warmth = clamp_or(p.scan_warmth, -100.0, 100.0, 0.0);
}

fn normalize_grain(p: &mut GrainParams) {
    let d = GrainParams::default();
    p.amount = clamp_or(p.amount, 0.0, 1.0, d.amount);
    p.size = clamp_or(p.size, 0.5, 2.0, d.size);
    p.roughness = clamp_or(p.roughness, 0.0, 1.0, d.roughness);
    p.color = clamp_or(p.color, 0.0, 1.0, d.color);
    p.shadow_boost = clamp_or(p.shadow_boost, 0.0, 1.0, d.shadow_boost);
}

pub(crate) fn normalize_defects(p: &mut DefectsParams) {
    p.leak_probability = clamp_or(p.leak_probability, 0.0, 1.0, 0.0);
    p.leak_strength = clamp_or(p.leak_strength, 0.0, 1.0, 0.0);
    p.dust_amount = clamp_or(p.dust_amount, 0.0, 1.0, 0.0);
    p.scratch_amount = clamp_or(p.scratch_amount, 0.0, 1.0, 0.0);
}

/// Clamp every v1 module to its documented range. Idempotent.
pub fn normalize_film_profile(profile: &FilmProfile) -> FilmProfile {
    let mut p = profile.clone();
    p.version = 1;
    let m = &mut p.modules;
    normalize_envelope(&mut m.color_science);
    normalize_color_science(&mut m.color_science.params);
    normalize_envelope(&mut m.tone);
    normalize_tone(&mut m.tone.params);
    normalize_envelope(&mut m.scan);
    normalize_scan(&mut m.scan.params);
    normalize_envelope(&mut m.grain);
    normalize_grain(&mut m.grain.params);
    normalize_envelope(&mut m.defects);
    normalize_defects(&mut m.defects.params);
    p
}

/// Clamp every v2 layer to its documented range. Idempotent.
pub fn normalize_film_profile_v2(profile: &FilmProfileV2) -> FilmProfileV2 {
    let mut p = profile.clone();
    p.version = 2;

    let t = &mut p.tone_response;
    t.shoulder = clamp_or(t.shoulder, 0.0, 1.0, 0.8);
    t.toe = clamp_or(t.toe, 0.0, 1.0, 0.2);
    t.gamma = clamp_or(t.gamma, 0.5, 2.0, 1.0);
    for v in [
        &mut t.exposure,
        &mut t.contrast,
        &mut t.highlights,
        &mut t.shadows,
        &mut t.whites,
        &mut t.blacks,
    ] {
        *v = clamp_or(*v, -100.0, 100.0, 0.0);
    }
    for v in &mut t.curve {
        *v = clamp_or(*v, -100.0, 100.0, 0.0);
    }

    if let Some(ColorMatrix { matrix, .. }) = &mut p.color_matrix {
        for (i, v) in matrix.iter_mut().enumerate() {
            let identity = if i % 4 == 0 { 1.0 } else { 0.0 };
            *v = clamp_or(*v, -2.0, 2.0, identity);
        }
    }
    if let Some(LutLayer {
        path,
        size,
        intensity,
        ..
    }) = &mut p.lut
    {
        *path = path.trim().to_string();
        *size = (*size).clamp(2, 16);
        *intensity = clamp_or(*intensity, 0.0, 1.0, 1.0);
    }
    if let Some(ColorCast {
        shadows,
        midtones,
        highlights,
        ..
    }) = &mut p.color_cast
    {
        for v in shadows.iter_mut().chain(midtones.iter_mut()).chain(highlights.iter_mut()) {
            *v = clamp_or(*v, -0.25, 0.25, 0.0);
        }
    }

    let h = &mut p.halation;
    h.threshold = clamp_or(h.threshold, 0.0, 1.0, 0.9);
    h.amount = clamp_or(h.amount, 0.0, 1.0, 0.0);
    h.radius = clamp_or(h.radius, 0.0, 0.2, 0.012);
    for v in &mut h.tint {
        *v = clamp_or(*v, 0.0, 2.0, 1.0);
    }
    let b = &mut p.bloom;
    b.threshold = clamp_or(b.threshold, 0.0, 1.0, 0.85);
    b.amount = clamp_or(b.amount, 0.0, 1.0, 0.0);
    b.radius = clamp_or(b.radius, 0.0, 0.2, 0.03);

    let g = &mut p.grain;
    g.amount = clamp_or(g.amount, 0.0, 1.0, 0.0);
    g.size = clamp_or(g.size, 0.5, 2.0, 1.0);
    g.roughness = clamp_or(g.roughness, 0.0, 1.0, 0.5);
    g.color = clamp_or(g.color, 0.0, 1.0, 0.0);
    g.shadow_bias = clamp_or(g.shadow_bias, 0.0, 1.0, 0.3);

    let v = &mut p.vignette;
    v.amount = clamp_or(v.amount, -1.0, 1.0, 0.0);
    v.midpoint = clamp_or(v.midpoint, 0.0, 1.0, 0.5);
    v.roundness = clamp_or(v.roundness, -1.0, 1.0, 0.0);
    v.feather = clamp_or(v.feather, 0.0, 1.0, 0.5);

    if let Some(d) = &mut p.defects {
        normalize_envelope(d);
        normalize_defects(&mut d.params);
    }
    p
}
