use super::*;
use crate::film::presets::builtin_preset;

#[test]
fn absent_profile_resolves_to_legacy_without_lut() {
    let mut a = EditingAdjustments::default();
    a.grain_amount = 40.0;
    a.halation = 20.0;
    let r = resolve_render_profile(&a, None).unwrap();
    assert_eq!(r.mode, ProfileMode::LegacyV1);
    assert_eq!(r.source, ProfileSource::Adjustments);
    assert!(r.lut.is_none());
    assert!(r.legacy_v1.is_some());
    assert!((r.v2.grain.amount - 0.4).abs() < 1e-6);
    assert!((r.v2.halation.amount - 0.2).abs() < 1e-6);
}

#[test]
fn v2_profile_is_wrapped_directly() {
    let p = FilmProfileV2 {
        id: "v2".to_string(),
        lut: Some(LutLayer {
            path: "luts//x.png".to_string(),
            ..LutLayer::default()
        }),
        ..FilmProfileV2::default()
    };
    let r = resolve_render_profile(&EditingAdjustments::default(), Some(&FilmProfileInput::V2(p)))
        .unwrap();
    assert_eq!(r.mode, ProfileMode::V2);
    assert!(r.legacy_v1.is_none());
    assert_eq!(r.lut.map(|l| l.path), Some("/luts//x.png".to_string()));
}

#[test]
fn lut_path_gets_single_leading_separator() {
    assert_eq!(normalize_lut_path("///a/b.png").as_deref(), Some("/a/b.png"));
    assert_eq!(normalize_lut_path("a\\b.png").as_deref(), Some("/a/b.png"));
    assert_eq!(normalize_lut_path("  /  "), None);
    assert_eq!(normalize_lut_path(""), None);
}

#[test]
fn disabled_or_empty_lut_resolves_to_none() {
    for lut in [
        LutLayer {
            enabled: false,
            path: "/x.png".to_string(),
            ..LutLayer::default()
        },
        LutLayer {
            path: "   ".to_string(),
            ..LutLayer::default()
        },
    ] {
        let p = FilmProfileV2 {
            lut: Some(lut),
            ..FilmProfileV2::default()
        };
        let r = resolve_render_profile(
            &EditingAdjustments::default(),
            Some(&FilmProfileInput::V2(p)),
        )
        .unwrap();
        assert!(r.lut.is_none());
    }
}

#[test]
fn precedence_is_preset_then_id_then_explicit() {
    let registry = ProfileRegistry::with_builtins();
    let explicit = FilmProfileInput::V2(FilmProfileV2 {
        id: "explicit".to_string(),
        ..FilmProfileV2::default()
    });
    let mut a = EditingAdjustments {
        film_profile_id: Some("gold200".to_string()),
        ..EditingAdjustments::default()
    };

    let sel = ProfileSelection {
        preset_id: Some("velvia50"),
        explicit: Some(&explicit),
    };
    let r = resolve_film_profile(&a, sel, &registry).unwrap();
    assert_eq!((r.source, r.v2.id.as_str()), (ProfileSource::Preset, "velvia50"));

    let sel = ProfileSelection {
        preset_id: Some("nope"),
        explicit: Some(&explicit),
    };
    let r = resolve_film_profile(&a, sel, &registry).unwrap();
    assert_eq!((r.source, r.v2.id.as_str()), (ProfileSource::ProfileId, "gold200"));

    a.film_profile_id = None;
    let r = resolve_film_profile(&a, sel, &registry).unwrap();
    assert_eq!((r.source, r.v2.id.as_str()), (ProfileSource::Explicit, "explicit"));

    let r = resolve_film_profile(&a, ProfileSelection::default(), &registry).unwrap();
    assert_eq!(r.source, ProfileSource::Adjustments);
}

#[test]
fn preset_lut_resolves_to_stock_path() {
    let registry = ProfileRegistry::with_builtins();
    let sel = ProfileSelection {
        preset_id: Some("portra400"),
        explicit: None,
    };
    let r = resolve_film_profile(&EditingAdjustments::default(), sel, &registry).unwrap();
    assert_eq!(r.mode, ProfileMode::LegacyV1);
    let lut = r.lut.unwrap();
    assert_eq!(lut.path, "/luts/stocks/portra400.png");
    assert_eq!(lut.size, 8);
}

#[test]
fn overrides_deep_merge_and_renormalize() {
    let mut a = EditingAdjustments::default();
    a.film_overrides.insert(
        "grain".to_string(),
        serde_json::json!({"amount": 50, "params": {"size": 9.0}}),
    );
    let p = builtin_preset("trix400").unwrap();
    let merged = apply_film_overrides(&p, &a.film_overrides).unwrap();
    assert_eq!(merged.modules.grain.amount, 50.0);
    assert_eq!(merged.modules.grain.params.size, 2.0);
    assert_eq!(
        merged.modules.grain.params.amount,
        p.modules.grain.params.amount
    );
}

#[test]
fn v2_overrides_create_absent_layers_from_defaults() {
    let mut o = FilmOverrides::new();
    o.insert(
        "colorCast".to_string(),
        serde_json::json!({"midtones": [0.1, 0.0, -0.1]}),
    );
    let out = apply_film_overrides_v2(&FilmProfileV2::default(), &o).unwrap();
    let cast = out.color_cast.unwrap();
    assert!(cast.enabled);
    assert_eq!(cast.midtones, [0.1, 0.0, -0.1]);
}

#[test]
fn malformed_override_is_a_validation_error() {
    let mut o = FilmOverrides::new();
    o.insert("tone".to_string(), serde_json::json!({"amount": "lots"}));
    let err = apply_film_overrides(&FilmProfile::default(), &o).unwrap_err();
    assert!(matches!(err, FilmError::Validation(_)));
}

#[test]
fn scaling_halves_amounts_and_is_not_associative() {
    let mut p = FilmProfile::default();
    p.modules.color_science.amount = 80.0;
    p.modules.tone.amount = 100.0;
    p.modules.scan.amount = 75.0;
    p.modules.grain.amount = 40.0;
    p.modules.defects.amount = 15.0;
    let half = scale_film_profile_amount(&p, 50.0);
    assert_eq!(half.modules.color_science.amount, 40.0);
    assert_eq!(half.modules.tone.amount, 50.0);
    assert_eq!(half.modules.scan.amount, 37.5);
    assert_eq!(half.modules.grain.amount, 20.0);
    assert_eq!(half.modules.defects.amount, 7.5);

    let twice = scale_film_profile_amount(&scale_film_profile_amount(&p, 50.0), 50.0);
    let once = scale_film_profile_amount(&p, 25.0);
    assert_eq!(twice.modules.grain.amount, once.modules.grain.amount);

    p.modules.grain.amount = 300.0;
    let twice = scale_film_profile_amount(&scale_film_profile_amount(&p, 50.0), 50.0);
    let once = scale_film_profile_amount(&p, 25.0);
    assert_eq!(twice.modules.grain.amount, 50.0);
    assert_eq!(once.modules.grain.amount, 75.0);

    let clamped = scale_film_profile_amount(&p, 400.0);
    assert_eq!(clamped.modules.tone.amount, 100.0);
}

#[test]
fn film_intensity_scales_explicit_profiles() {
    let p = FilmProfileInput::V1(builtin_preset("cinestill800t").unwrap());
    let full = resolve_render_profile(&EditingAdjustments::default(), Some(&p)).unwrap();
    let a = EditingAdjustments {
        film_intensity: 50.0,
        ..EditingAdjustments::default()
    };
    let half = resolve_render_profile(&a, Some(&p)).unwrap();
    assert!((half.v2.halation.amount - full.v2.halation.amount * 0.5).abs() < 1e-6);
}

#[test]
fn adjustment_sliders_layer_on_top_of_profiles() {
    let p = FilmProfileInput::V1(builtin_preset("provia100f").unwrap());
    let base = resolve_render_profile(&EditingAdjustments::default(), Some(&p)).unwrap();
    let a = EditingAdjustments {
        bloom: 30.0,
        vignette: -20.0,
        vignette_midpoint: 30.0,
        ..EditingAdjustments::default()
    };
    let r = resolve_render_profile(&a, Some(&p)).unwrap();
    assert!((r.v2.bloom.amount - (base.v2.bloom.amount + 0.3)).abs() < 1e-6);
    assert!((r.v2.vignette.midpoint - 0.3).abs() < 1e-6);
}
