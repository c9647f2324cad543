use super::*;

fn radial(feather: f32) -> LocalMask {
    LocalMask {
        shape: MaskShape::Radial {
            center_x: 0.5,
            center_y: 0.5,
            radius_x: 0.25,
            radius_y: 0.25,
            feather,
        },
        ..LocalMask::default()
    }
}

fn noisy_base(w: u32, h: u32) -> Surface {
    let mut s = Surface::new(w, h);
    for (i, px) in s.data.chunks_exact_mut(4).enumerate() {
        let t = (i * 37 % 101) as f32 / 100.0;
        px.copy_from_slice(&[t, (t * 3.0).fract(), 1.0 - t, 1.0]);
    }
    s
}

#[test]
fn hard_radial_mask_covers_only_the_ellipse() {
    let m = rasterize_mask(&radial(0.0), 40, 40);
    assert_eq!(m.at(20, 20), 1.0);
    assert_eq!(m.at(0, 0), 0.0);
    assert_eq!(m.at(20, 27), 1.0);
    assert_eq!(m.at(20, 31), 0.0);
}

#[test]
fn feathered_radial_mask_falls_off_smoothly() {
    let m = rasterize_mask(&radial(1.0), 40, 40);
    let center = m.at(20, 20);
    let mid = m.at(20, 25);
    let edge = m.at(20, 29);
    assert!(center > mid && mid > edge, "{center} {mid} {edge}");
}

#[test]
fn invert_flips_coverage() {
    let mut mask = radial(0.0);
    mask.invert = true;
    let m = rasterize_mask(&mask, 40, 40);
    assert_eq!(m.at(20, 20), 0.0);
    assert_eq!(m.at(0, 0), 1.0);
}

#[test]
fn linear_mask_is_full_before_start_and_empty_after_end() {
    let mask = LocalMask {
        shape: MaskShape::Linear {
            start_x: 0.0,
            start_y: 0.25,
            end_x: 0.0,
            end_y: 0.75,
            feather: 1.0,
        },
        ..LocalMask::default()
    };
    let m = rasterize_mask(&mask, 10, 40);
    assert_eq!(m.at(5, 2), 1.0);
    assert_eq!(m.at(5, 38), 0.0);
    let mid = m.at(5, 20);
    assert!(mid > 0.2 && mid < 0.8, "{mid}");
}

#[test]
fn brush_dabs_accumulate_and_scale_with_pressure() {
    let stroke = |pressure: f32| LocalMask {
        shape: MaskShape::Brush {
            size: 0.2,
            feather: 0.0,
            flow: 0.5,
            points: vec![
                BrushPoint {
                    x: 0.5,
                    y: 0.5,
                    pressure,
                },
                BrushPoint {
                    x: 0.5,
                    y: 0.5,
                    pressure,
                },
            ],
        },
        ..LocalMask::default()
    };
    let full = rasterize_mask(&stroke(1.0), 50, 50);
    assert!((full.at(25, 25) - 0.75).abs() < 1e-6);
    assert!(full.at(25, 29) > 0.0);

    let light = rasterize_mask(&stroke(0.5), 50, 50);
    assert!(light.at(25, 25) < full.at(25, 25));
    assert_eq!(light.at(25, 29), 0.0);
}

#[test]
fn default_range_leaves_the_shape_untouched() {
    let range = MaskRange {
        luma_min: 0.0,
        luma_max: 1.0,
        hue_range: 179.9995,
        sat_min: 1e-6,
        ..MaskRange::default()
    };
    assert!(!range_is_active(&range));

    let base = noisy_base(40, 40);
    let shape = rasterize_mask(&radial(0.6), 40, 40);
    let mut refined = shape.clone();
    refine_mask(&mut refined, &range, &base).unwrap();
    assert_eq!(refined, shape);
    for px in base.data.chunks_exact(4) {
        assert_eq!(range_weight(&range, [px[0], px[1], px[2]]), 1.0);
    }
}

#[test]
fn luma_range_rejects_dark_pixels() {
    let range = MaskRange {
        luma_min: 0.5,
        luma_feather: 0.1,
        ..MaskRange::default()
    };
    assert_eq!(range_weight(&range, [0.1, 0.1, 0.1]), 0.0);
    assert_eq!(range_weight(&range, [0.8, 0.8, 0.8]), 1.0);
    let soft = range_weight(&range, [0.45, 0.45, 0.45]);
    assert!(soft > 0.0 && soft < 1.0);
}

#[test]
fn hue_range_selects_matching_colors() {
    let range = MaskRange {
        hue_center: 0.0,
        hue_range: 20.0,
        hue_feather: 10.0,
        ..MaskRange::default()
    };
    assert_eq!(range_weight(&range, [0.9, 0.1, 0.1]), 1.0);
    assert_eq!(range_weight(&range, [0.1, 0.1, 0.9]), 0.0);
}

#[test]
fn refine_rejects_mismatched_sizes() {
    let mut m = MaskRaster::new(4, 4);
    let range = MaskRange {
        luma_min: 0.2,
        ..MaskRange::default()
    };
    assert!(refine_mask(&mut m, &range, &Surface::new(5, 4)).is_err());
}
