use crate::film::model::{
    Bloom, ColorCast, ColorMatrix, FilmProfile, FilmProfileV2, GrainLayer, Halation,
    IDENTITY_MATRIX, LutLayer, ToneResponse, VignetteLayer,
};
use crate::film::normalize::{normalize_film_profile, normalize_film_profile_v2};

/// Hald level assigned to LUTs referenced by v1 profiles.
pub const MIGRATED_LUT_LEVEL: u32 = 8;

/// Offset per unit of v1 `tempShift` / 100 on the midtone red and blue channels.
const TEMP_CAST: f32 = 0.04;
/// Offset per unit of v1 `tintShift` / 100 on the midtone green channel.
const TINT_CAST: f32 = 0.04;
/// Offset per unit of v1 `scanWarmth` / 100 on highlights; shadows get half.
const WARMTH_CAST: f32 = 0.03;

/// Deterministic, lossless v1 to v2 field mapping.
///
/// Every v1 parameter of an enabled module influences some v2 field. Module strength
/// (`amount / 100`, zero when disabled) scales the carried amounts. Defects are copied through.
pub fn migrate_film_profile_v1_to_v2(profile: &FilmProfile) -> FilmProfileV2 {
    let p = normalize_film_profile(profile);
    let m = &p.modules;

    let cs = &m.color_science;
    let k_cs = cs.strength();
    let k_tone = m.tone.strength();
    let k_scan = m.scan.strength();
    let k_grain = m.grain.strength();

    let t = &m.tone.params;
    let tone_response = ToneResponse {
        enabled: true,
        shoulder: ToneResponse::DEFAULT_SHOULDER,
        toe: ToneResponse::DEFAULT_TOE,
        gamma: ToneResponse::DEFAULT_GAMMA,
        exposure: t.exposure * k_tone,
        contrast: t.contrast * k_tone,
        highlights: t.highlights * k_tone,
        shadows: t.shadows * k_tone,
        whites: t.whites * k_tone,
        blacks: t.blacks * k_tone,
        curve: [
            t.curve_highlights * k_tone,
            t.curve_lights * k_tone,
            t.curve_darks * k_tone,
            t.curve_shadows * k_tone,
        ],
    };

    let color_matrix = if cs.params.rgb_mix != [1.0, 1.0, 1.0] && k_cs > 0.0 {
        let mut matrix = IDENTITY_MATRIX;
        for (c, mix) in cs.params.rgb_mix.iter().enumerate() {
            matrix[c * 4] = 1.0 + (mix - 1.0) * k_cs;
        }
        Some(ColorMatrix {
            enabled: true,
            matrix,
        })
    } else {
        None
    };

    let lut = cs.params.lut_asset_id.as_ref().map(|path| LutLayer {
        enabled: cs.enabled,
        path: path.clone(),
        size: MIGRATED_LUT_LEVEL,
        intensity: cs.params.lut_strength * k_cs,
    });

    let temp = cs.params.temp_shift / 100.0 * k_cs;
    let tint = cs.params.tint_shift / 100.0 * k_cs;
    let warmth = m.scan.params.scan_warmth / 100.0 * k_scan;
    let color_cast = if temp != 0.0 || tint != 0.0 || warmth != 0.0 {
        Some(ColorCast {
            enabled: true,
            shadows: [
                WARMTH_CAST * 0.5 * warmth,
                0.0,
                -WARMTH_CAST * 0.5 * warmth,
            ],
            midtones: [
                TEMP_CAST * temp + TINT_CAST * 0.5 * tint,
                -TINT_CAST * tint,
                -TEMP_CAST * temp + TINT_CAST * 0.5 * tint,
            ],
            highlights: [
                WARMTH_CAST * warmth,
                WARMTH_CAST * 0.3 * warmth,
                -WARMTH_CAST * warmth,
            ],
        })
    } else {
        None
    };

    let s = &m.scan.params;
    let halation = Halation {
        enabled: s.halation_amount * k_scan > 0.0,
        threshold: s.halation_threshold,
        amount: s.halation_amount * k_scan,
        ..Halation::default()
    };
    let bloom = Bloom {
        enabled: s.bloom_amount * k_scan > 0.0,
        threshold: s.bloom_threshold,
        amount: s.bloom_amount * k_scan,
        ..Bloom::default()
    };
    let vignette = VignetteLayer {
        enabled: s.vignette_amount * k_scan != 0.0,
        amount: s.vignette_amount * k_scan,
        ..VignetteLayer::default()
    };

    let g = &m.grain;
    let grain = GrainLayer {
        enabled: g.params.amount * k_grain > 0.0,
        amount: g.params.amount * k_grain,
        size: g.params.size,
        roughness: g.params.roughness,
        color: g.params.color,
        shadow_bias: g.params.shadow_boost,
        seed_mode: g.seed_mode,
        seed: g.seed,
    };

    normalize_film_profile_v2(&FilmProfileV2 {
        id: p.id.clone(),
        version: 2,
        name: p.name.clone(),
        tone_response,
        color_matrix,
        lut,
        color_cast,
        halation,
        bloom,
        grain,
        vignette,
        defects: Some(m.defects.clone()),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/film/migrate.rs"]
mod tests;
