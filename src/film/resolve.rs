use crate::adjust::model::{EditingAdjustments, FilmOverrides};
use crate::film::migrate::migrate_film_profile_v1_to_v2;
use crate::film::model::{
    Bloom, ColorCast, ColorMatrix, DefectsParams, FilmModuleConfig, FilmProfile, FilmProfileInput,
    FilmProfileV2, GrainLayer, GrainParams, Halation, LutLayer, ProfileMode, ProfileSource,
    ResolvedLut, ResolvedRenderProfile, ScanParams, ToneResponse, VignetteLayer,
};
use crate::film::normalize::{
    normalize_amount, normalize_film_profile, normalize_film_profile_v2,
};
use crate::film::presets::{ProfileRegistry, builtin_preset};
use crate::foundation::error::{FilmError, FilmResult};
use serde_json::Value;

/// Caller-side profile choices, highest precedence first.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProfileSelection<'a> {
    /// Built-in preset id picked by the caller.
    pub preset_id: Option<&'a str>,
    /// Profile object passed with the request.
    pub explicit: Option<&'a FilmProfileInput>,
}

/// Resolve an explicit profile, or the adjustments-derived fallback, into render form.
///
/// With `profile == None` the result is always `legacy-v1` with no LUT.
pub fn resolve_render_profile(
    adjustments: &EditingAdjustments,
    profile: Option<&FilmProfileInput>,
) -> FilmResult<ResolvedRenderProfile> {
    match profile {
        Some(p) => resolve_input(adjustments, p, ProfileSource::Explicit),
        None => resolve_derived(adjustments),
    }
}

/// Full resolution: preset, then `filmProfileId`, then explicit profile, then adjustments.
///
/// Unknown preset or profile ids fall through to the next candidate.
pub fn resolve_film_profile(
    adjustments: &EditingAdjustments,
    selection: ProfileSelection<'_>,
    registry: &ProfileRegistry,
) -> FilmResult<ResolvedRenderProfile> {
    if let Some(id) = selection.preset_id {
        match builtin_preset(id) {
            Some(p) => {
                return resolve_input(adjustments, &FilmProfileInput::V1(p), ProfileSource::Preset);
            }
            None => tracing::warn!(preset = id, "unknown film preset; ignoring"),
        }
    }
    if let Some(id) = adjustments.film_profile_id.as_deref() {
        match registry.get(id) {
            Some(p) => return resolve_input(adjustments, p, ProfileSource::ProfileId),
            None => tracing::warn!(profile = id, "unknown film profile id; ignoring"),
        }
    }
    resolve_render_profile(adjustments, selection.explicit)
}

fn resolve_input(
    adjustments: &EditingAdjustments,
    input: &FilmProfileInput,
    source: ProfileSource,
) -> FilmResult<ResolvedRenderProfile> {
    let intensity = adjustments.film_intensity;
    let (mode, legacy_v1, mut v2) = match input {
        FilmProfileInput::V1(p) => {
            let p = normalize_film_profile(p);
            let p = apply_film_overrides(&p, &adjustments.film_overrides)?;
            let p = scale_film_profile_amount(&p, intensity);
            let v2 = migrate_film_profile_v1_to_v2(&p);
            (ProfileMode::LegacyV1, Some(p), v2)
        }
        FilmProfileInput::V2(p) => {
            let p = normalize_film_profile_v2(p);
            let p = apply_film_overrides_v2(&p, &adjustments.film_overrides)?;
            (ProfileMode::V2, None, scale_film_profile_v2(&p, intensity))
        }
    };
    layer_adjustment_extras(&mut v2, adjustments);
    let v2 = normalize_film_profile_v2(&v2);
    Ok(finish(mode, source, legacy_v1, v2))
}

fn resolve_derived(adjustments: &EditingAdjustments) -> FilmResult<ResolvedRenderProfile> {
    let p = normalize_film_profile(&derive_film_profile(adjustments));
    let p = apply_film_overrides(&p, &adjustments.film_overrides)?;
    let mut v2 = migrate_film_profile_v1_to_v2(&p);
    if adjustments.vignette != 0.0 {
        v2.vignette.midpoint = adjustments.vignette_midpoint / 100.0;
    }
    let v2 = normalize_film_profile_v2(&v2);
    Ok(finish(
        ProfileMode::LegacyV1,
        ProfileSource::Adjustments,
        Some(p),
        v2,
    ))
}

fn finish(
    mode: ProfileMode,
    source: ProfileSource,
    legacy_v1: Option<FilmProfile>,
    v2: FilmProfileV2,
) -> ResolvedRenderProfile {
    let lut = v2.lut.as_ref().and_then(|l| {
        if !l.enabled {
            return None;
        }
        normalize_lut_path(&l.path).map(|path| ResolvedLut {
            path,
            size: l.size,
            intensity: l.intensity,
        })
    });
    ResolvedRenderProfile {
        mode,
        source,
        legacy_v1,
        v2,
        lut,
    }
}

/// Trim, use `/` separators and ensure exactly one leading `/`. Empty paths yield `None`.
pub fn normalize_lut_path(path: &str) -> Option<String> {
    let cleaned = path.trim().replace('\\', "/");
    let rest = cleaned.trim_start_matches('/');
    if rest.is_empty() {
        None
    } else {
        Some(format!("/{rest}"))
    }
}

/// v1 profile mirroring the adjustments' grain, halation, bloom and vignette sliders.
pub fn derive_film_profile(adjustments: &EditingAdjustments) -> FilmProfile {
    let a = adjustments;
    let mut p = FilmProfile {
        id: "adjustments".to_string(),
        version: 1,
        name: "Adjustments".to_string(),
        ..FilmProfile::default()
    };
    let m = &mut p.modules;
    m.color_science.enabled = false;
    m.tone.enabled = false;
    m.defects.enabled = false;
    m.scan = FilmModuleConfig {
        enabled: a.halation > 0.0 || a.bloom > 0.0 || a.vignette != 0.0,
        params: ScanParams {
            halation_amount: a.halation / 100.0,
            bloom_amount: a.bloom / 100.0,
            vignette_amount: a.vignette / 100.0,
            ..ScanParams::default()
        },
        ..FilmModuleConfig::default()
    };
    m.grain = FilmModuleConfig {
        enabled: a.grain_amount > 0.0,
        params: GrainParams {
            amount: a.grain_amount / 100.0,
            size: grain_size_from_slider(a.grain_size),
            roughness: a.grain_roughness / 100.0,
            ..GrainParams::default()
        },
        ..FilmModuleConfig::default()
    };
    p
}

fn grain_size_from_slider(v: f32) -> f32 {
    0.5 + v.clamp(0.0, 100.0) / 100.0 * 1.5
}

/// Add the user's own grain/halation/bloom/vignette sliders on top of a resolved profile.
fn layer_adjustment_extras(v2: &mut FilmProfileV2, a: &EditingAdjustments) {
    if a.grain_amount > 0.0 {
        let g = &mut v2.grain;
        if !g.enabled {
            g.size = grain_size_from_slider(a.grain_size);
            g.roughness = a.grain_roughness / 100.0;
        }
        g.enabled = true;
        g.amount += a.grain_amount / 100.0;
    }
    if a.halation > 0.0 {
        v2.halation.enabled = true;
        v2.halation.amount += a.halation / 100.0;
    }
    if a.bloom > 0.0 {
        v2.bloom.enabled = true;
        v2.bloom.amount += a.bloom / 100.0;
    }
    if a.vignette != 0.0 {
        v2.vignette.enabled = true;
        v2.vignette.amount += a.vignette / 100.0;
        v2.vignette.midpoint = a.vignette_midpoint / 100.0;
    }
}

/// Multiply every module amount by `clamp(intensity, 0, 100) / 100` and reclamp to
/// `[0, 100]`. Amounts stay fractional, so a factor of 50 halves them exactly.
///
/// Not associative for amounts outside `[0, 100]`: each application reclamps, so scaling an
/// amount of 300 by 50 twice gives 50 while scaling once by 25 gives 75.
pub fn scale_film_profile_amount(profile: &FilmProfile, intensity: f32) -> FilmProfile {
    let factor = scale_factor(intensity);
    let mut p = profile.clone();
    let m = &mut p.modules;
    m.color_science.amount = normalize_amount(m.color_science.amount * factor);
    m.tone.amount = normalize_amount(m.tone.amount * factor);
    m.scan.amount = normalize_amount(m.scan.amount * factor);
    m.grain.amount = normalize_amount(m.grain.amount * factor);
    m.defects.amount = normalize_amount(m.defects.amount * factor);
    p
}

/// v2 counterpart of [`scale_film_profile_amount`]: scales layer strengths.
pub fn scale_film_profile_v2(profile: &FilmProfileV2, intensity: f32) -> FilmProfileV2 {
    let k = scale_factor(intensity);
    let mut p = profile.clone();
    let t = &mut p.tone_response;
    for v in [
        &mut t.exposure,
        &mut t.contrast,
        &mut t.highlights,
        &mut t.shadows,
        &mut t.whites,
        &mut t.blacks,
    ] {
        *v *= k;
    }
    for v in &mut t.curve {
        *v *= k;
    }
    if let Some(cm) = &mut p.color_matrix {
        for (i, v) in cm.matrix.iter_mut().enumerate() {
            let identity = if i % 4 == 0 { 1.0 } else { 0.0 };
            *v = identity + (*v - identity) * k;
        }
    }
    if let Some(l) = &mut p.lut {
        l.intensity *= k;
    }
    if let Some(c) = &mut p.color_cast {
        for v in c
            .shadows
            .iter_mut()
            .chain(c.midtones.iter_mut())
            .chain(c.highlights.iter_mut())
        {
            *v *= k;
        }
    }
    p.halation.amount *= k;
    p.bloom.amount *= k;
    p.grain.amount *= k;
    p.vignette.amount *= k;
    if let Some(d) = &mut p.defects {
        d.amount = normalize_amount(d.amount * k);
    }
    normalize_film_profile_v2(&p)
}

fn scale_factor(intensity: f32) -> f32 {
    if intensity.is_finite() {
        intensity.clamp(0.0, 100.0) / 100.0
    } else {
        1.0
    }
}

/// Recursive JSON merge: objects merge key by key, everything else replaces.
pub(crate) fn deep_merge(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(b), Value::Object(p)) => {
            for (k, v) in p {
                deep_merge(b.entry(k.clone()).or_insert(Value::Null), v);
            }
        }
        (b, p) => *b = p.clone(),
    }
}

/// Deep-merge per-module patches (`{enabled, amount, params, ...}`) into a v1 profile and
/// renormalize. Keys that are not v1 module ids are ignored.
pub fn apply_film_overrides(
    profile: &FilmProfile,
    overrides: &FilmOverrides,
) -> FilmResult<FilmProfile> {
    if overrides.is_empty() {
        return Ok(profile.clone());
    }
    let mut value = serde_json::to_value(profile).map_err(anyhow::Error::from)?;
    if let Some(Value::Array(modules)) = value.get_mut("modules") {
        for module in modules.iter_mut() {
            let id = module
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string);
            if let Some(patch) = id.as_deref().and_then(|id| overrides.get(id)) {
                let mut patch = patch.clone();
                if let Value::Object(obj) = &mut patch {
                    obj.remove("id");
                }
                deep_merge(module, &patch);
            }
        }
    }
    let merged: FilmProfile = serde_json::from_value(value)
        .map_err(|e| FilmError::validation(format!("film override rejected: {e}")))?;
    Ok(normalize_film_profile(&merged))
}

const V2_LAYERS: [&str; 9] = [
    "toneResponse",
    "colorMatrix",
    "lut",
    "colorCast",
    "halation",
    "bloom",
    "grain",
    "vignette",
    "defects",
];

fn default_layer(key: &str) -> Value {
    let v = match key {
        "toneResponse" => serde_json::to_value(ToneResponse::default()),
        "colorMatrix" => serde_json::to_value(ColorMatrix::default()),
        "lut" => serde_json::to_value(LutLayer::default()),
        "colorCast" => serde_json::to_value(ColorCast::default()),
        "halation" => serde_json::to_value(Halation::default()),
        "bloom" => serde_json::to_value(Bloom::default()),
        "grain" => serde_json::to_value(GrainLayer::default()),
        "vignette" => serde_json::to_value(VignetteLayer::default()),
        _ => serde_json::to_value(FilmModuleConfig::<DefectsParams>::default()),
    };
    v.unwrap_or(Value::Null)
}

/// Deep-merge per-layer patches into a v2 profile and renormalize. Patching an absent optional
/// layer starts from that layer's defaults.
pub fn apply_film_overrides_v2(
    profile: &FilmProfileV2,
    overrides: &FilmOverrides,
) -> FilmResult<FilmProfileV2> {
    if overrides.is_empty() {
        return Ok(profile.clone());
    }
    let mut value = serde_json::to_value(profile).map_err(anyhow::Error::from)?;
    if let Value::Object(obj) = &mut value {
        for key in V2_LAYERS {
            let Some(patch) = overrides.get(key) else {
                continue;
            };
            let slot = obj.entry(key.to_string()).or_insert(Value::Null);
            if slot.is_null() {
                *slot = default_layer(key);
            }
            deep_merge(slot, patch);
        }
    }
    let merged: FilmProfileV2 = serde_json::from_value(value)
        .map_err(|e| FilmError::validation(format!("film override rejected: {e}")))?;
    Ok(normalize_film_profile_v2(&merged))
}

#[cfg(test)]
#[path = "../../tests/unit/film/resolve.rs"]
mod tests;
