use super::*;
use crate::adjust::model::{CurvePoint, LocalAdjustment};
use crate::adjust::normalize::normalize_adjustments;
use crate::film::resolve::resolve_render_profile;

fn keys_for(a: &EditingAdjustments) -> StageKeys {
    let a = normalize_adjustments(a);
    let profile = resolve_render_profile(&a, None).unwrap();
    compute_stage_keys(&KeyInputs {
        source_key: "src:k#asset-1",
        adjustments: &a,
        profile: &profile,
        output_size: (640, 480),
        seeds: FilmSeeds { grain: 7, defects: 9 },
    })
}

#[test]
fn identical_inputs_give_identical_keys() {
    let mut a = EditingAdjustments::default();
    a.exposure = 12.5;
    a.hsl.blue.saturation = -30.0;
    assert_eq!(keys_for(&a), keys_for(&a));
}

#[test]
fn curve_change_only_touches_curve_and_aggregates() {
    let base = EditingAdjustments::default();
    let mut edited = base.clone();
    edited.curves.red = vec![
        CurvePoint::new(0.0, 0.0),
        CurvePoint::new(0.5, 0.6),
        CurvePoint::new(1.0, 1.0),
    ];
    let k0 = keys_for(&base);
    let k1 = keys_for(&edited);
    assert_ne!(k0.curve, k1.curve);
    assert_ne!(k0.pre_film, k1.pre_film);
    assert_ne!(k0.pixi, k1.pixi);
    assert_ne!(k0.output, k1.output);
    assert_eq!(k0.master, k1.master);
    assert_eq!(k0.hsl, k1.hsl);
    assert_eq!(k0.detail, k1.detail);
    assert_eq!(k0.film, k1.film);
    assert_eq!(k0.optics, k1.optics);
    assert_eq!(k0.geometry, k1.geometry);
    assert_eq!(k0.upload, k1.upload);
}

#[test]
fn film_change_leaves_pre_film_alone() {
    let base = EditingAdjustments::default();
    let mut edited = base.clone();
    edited.grain_amount = 35.0;
    let k0 = keys_for(&base);
    let k1 = keys_for(&edited);
    assert_eq!(k0.pre_film, k1.pre_film);
    assert_ne!(k0.film, k1.film);
    assert_ne!(k0.pixi, k1.pixi);
}

#[test]
fn geometry_is_embedded_in_upload() {
    let mut a = EditingAdjustments::default();
    a.geometry.rotation = 3.0;
    let k = keys_for(&a);
    assert!(k.upload.contains(&k.geometry));
    assert!(k.upload.contains(&k.source));
    assert_ne!(k.geometry, keys_for(&EditingAdjustments::default()).geometry);
}

#[test]
fn negative_zero_and_tiny_noise_quantize_away() {
    let mut a = EditingAdjustments::default();
    a.contrast = -0.0;
    a.tint = 0.000_01;
    assert_eq!(keys_for(&a).master, keys_for(&EditingAdjustments::default()).master);
}

#[test]
fn grain_seed_only_matters_when_grain_is_on() {
    let a = normalize_adjustments(&EditingAdjustments::default());
    let profile = resolve_render_profile(&a, None).unwrap();
    let film = |grain: u64| {
        compute_stage_keys(&KeyInputs {
            source_key: "s",
            adjustments: &a,
            profile: &profile,
            output_size: (10, 10),
            seeds: FilmSeeds { grain, defects: 0 },
        })
        .film
    };
    assert_eq!(film(1), film(2));

    let mut grainy = EditingAdjustments::default();
    grainy.grain_amount = 50.0;
    let grainy = normalize_adjustments(&grainy);
    let profile = resolve_render_profile(&grainy, None).unwrap();
    let film = |grain: u64| {
        compute_stage_keys(&KeyInputs {
            source_key: "s",
            adjustments: &grainy,
            profile: &profile,
            output_size: (10, 10),
            seeds: FilmSeeds { grain, defects: 0 },
        })
        .film
    };
    assert_ne!(film(1), film(2));
}

#[test]
fn local_layers_and_stamp_fold_into_output_only() {
    let base = EditingAdjustments::default();
    let mut edited = base.clone();
    let mut local = LocalAdjustment {
        id: "dodge".to_string(),
        ..LocalAdjustment::default()
    };
    local.adjustments.exposure = 20.0;
    edited.local_adjustments.push(local);
    edited.date_stamp.enabled = true;
    edited.date_stamp.text = "'24 06 01".to_string();
    let k0 = keys_for(&base);
    let k1 = keys_for(&edited);
    assert_eq!(k0.pixi, k1.pixi);
    assert_ne!(k0.output, k1.output);
}

#[test]
fn source_key_prefers_cache_key_then_content_hash() {
    assert_eq!(source_key_for_bytes(b"abc", Some("asset-1")), "src:k#asset-1");
    let a = source_key_for_bytes(b"abc", None);
    let b = source_key_for_bytes(b"abd", None);
    assert_ne!(a, b);
    assert_eq!(a, source_key_for_bytes(b"abc", Some("")));
    assert!(a.starts_with("src:"));
}

#[test]
fn writer_length_prefixes_text() {
    let mut w = KeyWriter::new("t");
    let a = w.s("a,b").finish();
    let mut w = KeyWriter::new("t");
    let b = w.s("a").s("b").finish();
    assert_ne!(a, b);
}
