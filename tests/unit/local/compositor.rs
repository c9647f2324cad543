use super::*;
use crate::adjust::model::{LocalDelta, LocalMask, MaskRange, MaskShape};

fn layer(id: &str, exposure: f32) -> LocalAdjustment {
    LocalAdjustment {
        id: id.to_string(),
        adjustments: LocalDelta {
            exposure,
            ..LocalDelta::default()
        },
        ..LocalAdjustment::default()
    }
}

fn flat(w: u32, h: u32, v: f32) -> Surface {
    let mut s = Surface::new(w, h);
    for px in s.data.chunks_exact_mut(4) {
        px.copy_from_slice(&[v, v, v, 1.0]);
    }
    s
}

#[test]
fn layer_adjustments_add_the_delta_and_clamp() {
    let mut base = EditingAdjustments::default();
    base.exposure = 80.0;
    base.contrast = 10.0;
    base.local_adjustments.push(layer("a", 40.0));
    base.date_stamp.enabled = true;
    base.date_stamp.text = "98 7 4".into();

    let a = local_layer_adjustments(&base, &layer("a", 40.0));
    assert_eq!(a.exposure, 100.0);
    assert_eq!(a.contrast, 10.0);
    assert!(a.local_adjustments.is_empty());
    assert!(!a.date_stamp.enabled);
}

#[test]
fn blend_mixes_by_mask_and_opacity() {
    let mut base = flat(2, 1, 0.0);
    let top = flat(2, 1, 1.0);
    let mask = MaskRaster {
        width: 2,
        height: 1,
        alpha: vec![1.0, 0.5],
    };
    blend_layer(&mut base, &top, &mask, 0.5).unwrap();
    assert!((base.data[0] - 0.5).abs() < 1e-6);
    assert!((base.data[4] - 0.25).abs() < 1e-6);
    assert_eq!(base.data[3], 1.0);
}

#[test]
fn blend_rejects_size_mismatch() {
    let mut base = flat(2, 2, 0.0);
    let err = blend_layer(&mut base, &flat(2, 1, 1.0), &MaskRaster::new(2, 2), 1.0).unwrap_err();
    assert_eq!(err.failed_stage(), Some(RenderStage::Local));
}

#[test]
fn mask_key_tracks_the_composite_only_when_ranges_apply() {
    let plain = layer("a", 10.0);
    assert_eq!(mask_key(&plain, (4, 4), "x"), mask_key(&plain, (4, 4), "y"));
    assert_ne!(mask_key(&plain, (4, 4), "x"), mask_key(&plain, (8, 4), "x"));

    let mut ranged = plain.clone();
    ranged.mask.range = MaskRange {
        luma_min: 0.3,
        ..MaskRange::default()
    };
    assert_ne!(mask_key(&ranged, (4, 4), "x"), mask_key(&ranged, (4, 4), "y"));
}

#[test]
fn layer_mask_is_cached_until_its_key_changes() {
    let mut local = layer("a", 10.0);
    local.mask = LocalMask {
        shape: MaskShape::Radial {
            center_x: 0.5,
            center_y: 0.5,
            radius_x: 0.5,
            radius_y: 0.5,
            feather: 0.0,
        },
        ..LocalMask::default()
    };
    let composite = flat(8, 8, 0.5);
    let mut cache = None;
    let first = layer_mask(&mut cache, &local, &composite, "k1").unwrap().clone();
    let cached_key = cache.as_ref().unwrap().key.clone();
    layer_mask(&mut cache, &local, &composite, "k2").unwrap();
    assert_eq!(cache.as_ref().unwrap().key, cached_key);

    local.mask.invert = true;
    let flipped = layer_mask(&mut cache, &local, &composite, "k2").unwrap();
    assert_eq!(flipped.at(4, 4), 1.0 - first.at(4, 4));
}
