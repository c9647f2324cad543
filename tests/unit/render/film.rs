use super::*;
use crate::adjust::model::EditingAdjustments;
use crate::film::model::{
    ColorCast, ColorMatrix, DefectsParams, FilmModuleConfig, FilmProfileInput, FilmProfileV2,
    GrainLayer,
};
use crate::film::resolve::resolve_render_profile;

fn grey(n: u32, v: f32) -> Surface {
    let mut s = Surface::new(n, n);
    for px in s.data.chunks_exact_mut(4) {
        px.copy_from_slice(&[v, v, v, 1.0]);
    }
    s
}

fn film_for(p: FilmProfileV2) -> FilmUniforms {
    let a = EditingAdjustments::default();
    let r = resolve_render_profile(&a, Some(&FilmProfileInput::V2(p))).unwrap();
    let mut u = FilmUniforms::default();
    u.fill(&r, 0.0, FilmSeeds { grain: 1, defects: 2 }, None, (64, 64));
    u
}

#[test]
fn derived_default_profile_is_identity() {
    let a = EditingAdjustments::default();
    let r = resolve_render_profile(&a, None).unwrap();
    let mut u = FilmUniforms::default();
    u.fill(&r, 0.0, FilmSeeds::default(), None, (8, 8));
    assert!(u.is_identity());
}

#[test]
fn default_v2_profile_is_identity() {
    assert!(film_for(FilmProfileV2::default()).is_identity());
}

#[test]
fn legacy_mode_skips_response_curve() {
    let a = EditingAdjustments::default();
    let mut r = resolve_render_profile(&a, None).unwrap();
    r.v2.tone_response.shoulder = 1.0;
    let mut u = FilmUniforms::default();
    u.fill(&r, 0.0, FilmSeeds::default(), None, (8, 8));
    assert!(u.response.is_none());

    r.mode = ProfileMode::V2;
    u.fill(&r, 0.0, FilmSeeds::default(), None, (8, 8));
    assert!(u.response.is_some());
}

#[test]
fn response_curve_keeps_endpoints_and_monotonicity() {
    for (s, t, g) in [(0.2, 0.0, 1.0), (-0.5, 0.6, 1.4), (0.0, -0.2, 0.7)] {
        assert!(tone_response(0.0, s, t, g).abs() < 1e-6);
        assert!((tone_response(1.0, s, t, g) - 1.0).abs() < 1e-6);
        let mut prev = 0.0;
        for i in 1..=50 {
            let y = tone_response(i as f32 / 50.0, s, t, g);
            assert!(y >= prev);
            prev = y;
        }
    }
}

#[test]
fn channel_swap_matrix_swaps_channels() {
    let u = film_for(FilmProfileV2 {
        color_matrix: Some(ColorMatrix {
            enabled: true,
            matrix: [0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0],
        }),
        ..FilmProfileV2::default()
    });
    let px = u.grade_pixel([0.9, 0.5, 0.1, 1.0]);
    assert!((px[0] - 0.1).abs() < 1e-6 && (px[2] - 0.9).abs() < 1e-6);
}

#[test]
fn identity_lut_at_full_intensity_is_near_noop() {
    let a = EditingAdjustments::default();
    let mut r = resolve_render_profile(&a, None).unwrap();
    r.lut = Some(crate::film::model::ResolvedLut {
        path: "/x.png".into(),
        size: 4,
        intensity: 1.0,
    });
    let mut u = FilmUniforms::default();
    let lut = Arc::new(HaldLut::identity(4).unwrap());
    u.fill(&r, 0.0, FilmSeeds::default(), Some(lut), (8, 8));
    assert!(!u.is_identity());
    let px = u.grade_pixel([0.3, 0.6, 0.8, 1.0]);
    assert!((px[0] - 0.3).abs() < 1e-4 && (px[2] - 0.8).abs() < 1e-4);
}

#[test]
fn warm_cast_in_highlights_only() {
    let u = film_for(FilmProfileV2 {
        color_cast: Some(ColorCast {
            highlights: [0.1, 0.0, -0.1],
            ..ColorCast::default()
        }),
        ..FilmProfileV2::default()
    });
    let hi = u.grade_pixel([0.9, 0.9, 0.9, 1.0]);
    assert!(hi[0] > hi[2]);
    let lo = u.grade_pixel([0.05, 0.05, 0.05, 1.0]);
    assert_eq!(lo[0], lo[2]);
}

#[test]
fn grain_is_seeded_and_deterministic() {
    let profile = FilmProfileV2 {
        grain: GrainLayer {
            enabled: true,
            amount: 0.8,
            ..GrainLayer::default()
        },
        ..FilmProfileV2::default()
    };
    let a = film_for(profile.clone());
    let mut s1 = grey(32, 0.5);
    let mut s2 = grey(32, 0.5);
    a.apply(&mut s1);
    a.apply(&mut s2);
    assert_eq!(s1, s2);
    assert_ne!(s1, grey(32, 0.5));

    let mut b = film_for(profile);
    b.grain = b.grain.map(|g| GrainUniforms { seed: 99, ..g });
    let mut s3 = grey(32, 0.5);
    b.apply(&mut s3);
    assert_ne!(s1, s3);
}

#[test]
fn dust_darkens_some_pixels() {
    let u = film_for(FilmProfileV2 {
        defects: Some(FilmModuleConfig {
            params: DefectsParams {
                dust_amount: 1.0,
                ..DefectsParams::default()
            },
            ..FilmModuleConfig::default()
        }),
        ..FilmProfileV2::default()
    });
    assert!(u.defects.is_some());
    let mut s = grey(64, 0.8);
    u.apply(&mut s);
    assert!(s.data.chunks_exact(4).any(|p| p[0] < 0.8));
    assert!(s.data.chunks_exact(4).all(|p| p[3] == 1.0));
}

#[test]
fn fade_lifts_black() {
    let a = EditingAdjustments::default();
    let r = resolve_render_profile(&a, None).unwrap();
    let mut u = FilmUniforms::default();
    u.fill(&r, 50.0, FilmSeeds::default(), None, (8, 8));
    assert!(u.grade_pixel([0.0, 0.0, 0.0, 1.0])[0] > 0.0);
}
