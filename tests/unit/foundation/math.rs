use super::*;

#[test]
fn fnv_seeded_hash_is_stable() {
    let mut a = Fnv1a64::new_default();
    a.write_bytes(b"filmlab");
    let mut b = Fnv1a64::new(Fnv1a64::OFFSET_BASIS);
    b.write_u8(b'f');
    b.write_bytes(b"ilmlab");
    assert_eq!(a.finish(), b.finish());
}

#[test]
fn hash_noise_is_deterministic_and_in_range() {
    for y in 0..8 {
        for x in 0..8 {
            let v = hash2(x, y, 42);
            assert!((0.0..1.0).contains(&v));
            assert_eq!(v, hash2(x, y, 42));
        }
    }
    assert_ne!(hash2(3, 5, 1), hash2(3, 5, 2));
}

#[test]
fn smoothstep_is_clamped_hermite() {
    assert_eq!(smoothstep(0.2, 0.8, 0.0), 0.0);
    assert_eq!(smoothstep(0.2, 0.8, 1.0), 1.0);
    assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
    assert_eq!(smoothstep(0.5, 0.5, 0.6), 1.0);
}

#[test]
fn srgb_transfer_roundtrips_within_tolerance() {
    for i in 0..=20 {
        let v = i as f32 / 20.0;
        let back = linear_to_srgb(srgb_to_linear(v));
        assert!((back - v).abs() < 1e-4, "{v} -> {back}");
    }
}

#[test]
fn hsl_conversion_recovers_primaries() {
    let (h, s, l) = rgb_to_hsl(1.0, 0.0, 0.0);
    assert!((h - 0.0).abs() < 1e-4 && (s - 1.0).abs() < 1e-4 && (l - 0.5).abs() < 1e-4);
    let (h, _, _) = rgb_to_hsl(0.0, 0.0, 1.0);
    assert!((h - 240.0).abs() < 1e-3);
    let (r, g, b) = hsl_to_rgb(120.0, 1.0, 0.5);
    assert!(r.abs() < 1e-4 && (g - 1.0).abs() < 1e-4 && b.abs() < 1e-4);
}

#[test]
fn hue_distance_wraps() {
    assert_eq!(hue_distance(350.0, 10.0), 20.0);
    assert_eq!(hue_distance(0.0, 180.0), 180.0);
}

#[test]
fn key_encoding_folds_negative_zero() {
    assert_eq!(key_f32(-0.0), "0.0000");
    assert_eq!(key_f32(-0.00001), "0.0000");
    assert_eq!(key_f32(1.23456), "1.2346");
    assert_eq!(key_f32(f32::NAN), "0.0000");
}
