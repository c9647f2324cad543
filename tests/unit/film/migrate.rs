use super::*;
use crate::film::model::{FilmModuleConfig, GrainParams, SeedMode};

fn base() -> FilmProfile {
    FilmProfile {
        id: "t".to_string(),
        name: "Test".to_string(),
        ..FilmProfile::default()
    }
}

#[test]
fn neutral_v1_maps_to_documented_defaults() {
    let v2 = migrate_film_profile_v1_to_v2(&base());
    assert_eq!(v2.version, 2);
    assert_eq!(v2.tone_response.shoulder, 0.8);
    assert_eq!(v2.tone_response.toe, 0.2);
    assert_eq!(v2.tone_response.gamma, 1.0);
    assert!(v2.color_matrix.is_none());
    assert!(v2.lut.is_none());
    assert!(v2.color_cast.is_none());
    assert!(!v2.halation.enabled && !v2.bloom.enabled && !v2.grain.enabled);
    assert!(v2.defects.is_some());
}

#[test]
fn each_module_parameter_reaches_v2() {
    let d = migrate_film_profile_v1_to_v2(&base());

    let mut p = base();
    p.modules.color_science.params.rgb_mix = [1.2, 1.0, 0.9];
    let v = migrate_film_profile_v1_to_v2(&p);
    assert_ne!(v.color_matrix, d.color_matrix);

    let mut p = base();
    p.modules.color_science.params.lut_asset_id = Some("/luts/x.png".to_string());
    p.modules.color_science.params.lut_strength = 0.6;
    let v = migrate_film_profile_v1_to_v2(&p);
    assert_eq!(v.lut.map(|l| l.intensity), Some(0.6));

    let tweaks: [fn(&mut FilmProfile); 3] = [
        |p| p.modules.color_science.params.temp_shift = 30.0,
        |p| p.modules.color_science.params.tint_shift = -20.0,
        |p| p.modules.scan.params.scan_warmth = 40.0,
    ];
    for tweak in tweaks {
        let mut p = base();
        tweak(&mut p);
        assert!(migrate_film_profile_v1_to_v2(&p).color_cast.is_some());
    }

    let mut p = base();
    p.modules.scan.params.halation_amount = 0.4;
    p.modules.scan.params.halation_threshold = 0.7;
    p.modules.scan.params.bloom_threshold = 0.6;
    p.modules.scan.params.vignette_amount = -0.3;
    let v = migrate_film_profile_v1_to_v2(&p);
    assert_eq!(v.halation.amount, 0.4);
    assert_eq!(v.halation.threshold, 0.7);
    assert_eq!(v.bloom.threshold, 0.6);
    assert_eq!(v.vignette.amount, -0.3);

    let mut p = base();
    p.modules.grain = FilmModuleConfig {
        seed_mode: SeedMode::Locked,
        seed: 9,
        params: GrainParams {
            amount: 0.5,
            size: 1.5,
            roughness: 0.2,
            color: 0.4,
            shadow_boost: 0.6,
        },
        ..FilmModuleConfig::default()
    };
    let v = migrate_film_profile_v1_to_v2(&p);
    assert_eq!(
        (v.grain.amount, v.grain.size, v.grain.roughness, v.grain.color, v.grain.shadow_bias),
        (0.5, 1.5, 0.2, 0.4, 0.6)
    );
    assert_eq!((v.grain.seed_mode, v.grain.seed), (SeedMode::Locked, 9));

    let mut p = base();
    p.modules.tone.params.curve_darks = 25.0;
    p.modules.tone.params.whites = -10.0;
    let v = migrate_film_profile_v1_to_v2(&p);
    assert_eq!(v.tone_response.curve[2], 25.0);
    assert_eq!(v.tone_response.whites, -10.0);

    let mut p = base();
    p.modules.defects.params.dust_amount = 0.3;
    let v = migrate_film_profile_v1_to_v2(&p);
    assert_eq!(v.defects.map(|d| d.params.dust_amount), Some(0.3));
}

#[test]
fn module_amount_scales_carried_values() {
    let mut p = base();
    p.modules.scan.amount = 50.0;
    p.modules.scan.params.bloom_amount = 0.8;
    p.modules.color_science.enabled = false;
    p.modules.color_science.params.rgb_mix = [1.4, 1.0, 1.0];
    let v = migrate_film_profile_v1_to_v2(&p);
    assert!((v.bloom.amount - 0.4).abs() < 1e-6);
    assert!(v.color_matrix.is_none());
}

#[test]
fn migration_is_byte_reproducible() {
    let mut p = base();
    p.modules.color_science.params.temp_shift = 12.5;
    p.modules.grain.params.amount = 0.3;
    let a = serde_json::to_vec(&migrate_film_profile_v1_to_v2(&p)).unwrap();
    let b = serde_json::to_vec(&migrate_film_profile_v1_to_v2(&p)).unwrap();
    assert_eq!(a, b);
}
