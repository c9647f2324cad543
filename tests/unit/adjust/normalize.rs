use super::*;
use crate::adjust::model::{LocalDelta, MaskShape};

fn messy() -> EditingAdjustments {
    let mut a = EditingAdjustments {
        exposure: 250.0,
        contrast: f32::NAN,
        sharpen_radius: 10.0,
        film_intensity: -5.0,
        film_profile_id: Some("  portra400 ".to_string()),
        ..EditingAdjustments::default()
    };
    a.hsl.blue.saturation = -400.0;
    a.curves.rgb = vec![
        CurvePoint::new(0.7, 0.8),
        CurvePoint::new(0.3, 0.2),
        CurvePoint::new(0.30001, 0.25),
        CurvePoint::new(f32::INFINITY, 0.5),
    ];
    a.color_grading.shadows.hue = -30.0;
    a.geometry.crop = CropRect {
        x: 0.995,
        y: -1.0,
        width: 3.0,
        height: 0.0,
    };
    a.geometry.quarter_turns = 7;
    a.optics.chromatic_aberration.red = 20.0;
    a.local_adjustments = vec![
        LocalAdjustment {
            id: "a".to_string(),
            amount: 300.0,
            adjustments: LocalDelta {
                exposure: 500.0,
                ..LocalDelta::default()
            },
            ..LocalAdjustment::default()
        },
        LocalAdjustment {
            id: "a".to_string(),
            ..LocalAdjustment::default()
        },
    ];
    a.film_overrides
        .insert("grain".to_string(), serde_json::json!({"amount": 40}));
    a.film_overrides
        .insert("bogus".to_string(), serde_json::json!(3));
    a
}

#[test]
fn clamps_and_fills_every_field() {
    let n = normalize_adjustments(&messy());
    assert_eq!(n.exposure, 100.0);
    assert_eq!(n.contrast, 0.0);
    assert_eq!(n.sharpen_radius, 3.0);
    assert_eq!(n.film_intensity, 0.0);
    assert_eq!(n.film_profile_id.as_deref(), Some("portra400"));
    assert_eq!(n.hsl.blue.saturation, -100.0);
    assert_eq!(n.color_grading.shadows.hue, 330.0);
    assert_eq!(n.geometry.quarter_turns, 3);
    assert_eq!(n.optics.chromatic_aberration.red, 8.0);
    assert!(n.geometry.crop.x + n.geometry.crop.width <= 1.0 + 1e-6);
    assert!(n.geometry.crop.height >= MIN_CROP_EXTENT);
    assert_eq!(n.geometry.crop.y, 0.0);
    assert_eq!(n.local_adjustments.len(), 1);
    assert_eq!(n.local_adjustments[0].amount, 100.0);
    assert_eq!(n.local_adjustments[0].adjustments.exposure, 100.0);
    assert!(n.film_overrides.contains_key("grain"));
    assert!(!n.film_overrides.contains_key("bogus"));
}

#[test]
fn curves_are_sorted_deduplicated_and_pinned() {
    let n = normalize_adjustments(&messy());
    let xs: Vec<f32> = n.curves.rgb.iter().map(|p| p.x).collect();
    assert_eq!(xs, vec![0.0, 0.3, 0.7, 1.0]);
    assert_eq!(n.curves.rgb[1].y, 0.25);
    assert_eq!(n.curves.red, crate::adjust::model::identity_curve());
}

#[test]
fn curves_are_capped_with_endpoints_kept() {
    let pts: Vec<CurvePoint> = (0..40)
        .map(|i| CurvePoint::new(i as f32 / 39.0, i as f32 / 39.0))
        .collect();
    let out = normalize_curve_points(&pts);
    assert_eq!(out.len(), MAX_CURVE_POINTS);
    assert_eq!(out.first().map(|p| p.x), Some(0.0));
    assert_eq!(out.last().map(|p| p.x), Some(1.0));
}

#[test]
fn normalize_is_idempotent() {
    let once = normalize_adjustments(&messy());
    let twice = normalize_adjustments(&once);
    assert_eq!(once, twice);

    let mut brush = EditingAdjustments::default();
    brush.local_adjustments.push(LocalAdjustment {
        id: "b".to_string(),
        mask: LocalMask {
            shape: MaskShape::Brush {
                size: 9.0,
                feather: -1.0,
                flow: 0.5,
                points: vec![BrushPoint {
                    x: 1.5,
                    y: 0.2,
                    pressure: 3.0,
                }],
            },
            invert: true,
            range: MaskRange {
                luma_min: 0.8,
                luma_max: 0.2,
                hue_center: 725.0,
                ..MaskRange::default()
            },
        },
        ..LocalAdjustment::default()
    });
    let once = normalize_adjustments(&brush);
    assert_eq!(once, normalize_adjustments(&once));
    let range = once.local_adjustments[0].mask.range;
    assert!(range.luma_max >= range.luma_min);
    assert_eq!(range.hue_center, 5.0);
}

#[test]
fn partial_json_becomes_fully_populated() {
    let a: EditingAdjustments =
        serde_json::from_str(r#"{"exposure": 12, "hsl": {"red": {"hue": 5}}}"#).unwrap();
    let n = normalize_adjustments(&a);
    assert_eq!(n.exposure, 12.0);
    assert_eq!(n.hsl.red.hue, 5.0);
    assert_eq!(n.grain_size, 25.0);
    assert_eq!(n.geometry.scale, 100.0);
    assert_eq!(n.curves.rgb.len(), 2);
}
