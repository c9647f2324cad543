use super::*;

fn gradient(w: u32, h: u32) -> Surface {
    let mut s = Surface::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let i = ((y * w + x) * 4) as usize;
            s.data[i] = x as f32 / w as f32;
            s.data[i + 1] = y as f32 / h as f32;
            s.data[i + 2] = 0.25;
            s.data[i + 3] = 1.0;
        }
    }
    s
}

fn plan(adj: &EditingAdjustments, w: u32, h: u32) -> GeometryPlan {
    GeometryPlan::new(adj, w, h, TargetSize::Source, 0).unwrap()
}

#[test]
fn default_adjustments_plan_identity() {
    let p = plan(&EditingAdjustments::default(), 8, 6);
    assert!(p.is_identity());
    let src = gradient(8, 6);
    let out = p.execute(&src, &CancellationToken::new()).unwrap();
    assert_eq!(out, src);
}

#[test]
fn horizontal_flip_mirrors_columns() {
    let mut a = EditingAdjustments::default();
    a.geometry.flip_horizontal = true;
    let src = gradient(8, 4);
    let out = plan(&a, 8, 4)
        .execute(&src, &CancellationToken::new())
        .unwrap();
    for y in 0..4 {
        for x in 0..8 {
            assert_eq!(out.pixel(x, y), src.pixel(7 - x, y));
        }
    }
}

#[test]
fn quarter_turn_swaps_dimensions_and_rotates_clockwise() {
    let mut a = EditingAdjustments::default();
    a.geometry.quarter_turns = 1;
    let src = gradient(6, 4);
    let p = plan(&a, 6, 4);
    assert_eq!((p.out_w, p.out_h), (4, 6));
    let out = p.execute(&src, &CancellationToken::new()).unwrap();
    // Top-left of the rotated frame is the source's bottom-left.
    assert_eq!(out.pixel(0, 0), src.pixel(0, 3));
    assert_eq!(out.pixel(3, 0), src.pixel(0, 0));
}

#[test]
fn crop_selects_sub_rectangle() {
    let mut a = EditingAdjustments::default();
    a.geometry.crop.x = 0.5;
    a.geometry.crop.width = 0.5;
    let src = gradient(8, 4);
    let p = plan(&a, 8, 4);
    assert_eq!((p.out_w, p.out_h), (4, 4));
    let out = p.execute(&src, &CancellationToken::new()).unwrap();
    assert_eq!(out.pixel(0, 0), src.pixel(4, 0));
}

#[test]
fn rotation_leaves_center_fixed_and_corners_empty() {
    let mut a = EditingAdjustments::default();
    a.geometry.rotation = 30.0;
    let p = plan(&a, 41, 41);
    let c = p.map(20.5, 20.5);
    assert!((c.x - 20.5).abs() < 1e-9 && (c.y - 20.5).abs() < 1e-9);
    let src = gradient(41, 41);
    let out = p.execute(&src, &CancellationToken::new()).unwrap();
    assert_eq!(out.pixel(0, 0)[3], 0.0);
}

#[test]
fn max_dimension_fits_without_upscaling() {
    assert_eq!(output_size(4000, 3000, TargetSize::MaxDimension { max: 1000 }, 0), (1000, 750));
    assert_eq!(output_size(400, 300, TargetSize::MaxDimension { max: 1000 }, 0), (400, 300));
    assert_eq!(output_size(4000, 3000, TargetSize::Source, 2048), (2048, 1536));
    assert_eq!(
        output_size(10, 10, TargetSize::Exact { width: 3, height: 0 }, 0),
        (3, 1)
    );
}

#[test]
fn chromatic_aberration_splits_channels_off_center() {
    let mut a = EditingAdjustments::default();
    a.optics.enabled = true;
    a.optics.chromatic_aberration.red = 4.0;
    let p = plan(&a, 32, 32);
    assert!(!p.is_identity());
    let [r, g, b] = p.lens(kurbo::Point::new(2.0, 2.0));
    assert_ne!(r, g);
    assert_eq!(b, g);
    let [r, g, _] = p.lens(kurbo::Point::new(16.0, 16.0));
    assert_eq!(r, g);
}

#[test]
fn barrel_distortion_pulls_corners_outward() {
    let mut a = EditingAdjustments::default();
    a.optics.enabled = true;
    a.optics.distortion = 100.0;
    let p = plan(&a, 100, 100);
    let [_, g, _] = p.lens(kurbo::Point::new(90.0, 90.0));
    assert!(g.x > 90.0 && g.y > 90.0);
}

#[test]
fn mismatched_source_is_rejected() {
    let p = plan(&EditingAdjustments::default(), 4, 4);
    assert!(p.execute(&gradient(5, 4), &CancellationToken::new()).is_err());
}

#[test]
fn cancelled_token_aborts() {
    let c = CancellationToken::new();
    c.cancel();
    let p = plan(&EditingAdjustments::default(), 4, 4);
    assert!(p.execute(&gradient(4, 4), &c).unwrap_err().is_abort());
}
