use super::*;

#[test]
fn rgba8_conversion_roundtrips_exactly() {
    let bytes: Vec<u8> = (0..16u8).map(|i| i * 17).collect();
    let s = Surface::from_rgba8(2, 2, &bytes).unwrap();
    assert_eq!(s.to_rgba8(), bytes);
}

#[test]
fn from_rgba8_rejects_wrong_length() {
    let err = Surface::from_rgba8(2, 2, &[0u8; 15]).unwrap_err();
    assert!(err.to_string().contains("does not match"));
}

#[test]
fn pixel_reads_clamp_to_edges() {
    let mut s = Surface::new(2, 1);
    s.data[4..8].copy_from_slice(&[1.0, 0.5, 0.25, 1.0]);
    assert_eq!(s.pixel(5, -3), [1.0, 0.5, 0.25, 1.0]);
}

#[test]
fn bilinear_sample_at_pixel_center_is_exact() {
    let bytes = [0, 0, 0, 255, 255, 255, 255, 255];
    let s = Surface::from_rgba8(2, 1, &bytes).unwrap();
    assert_eq!(s.sample_bilinear(0.5, 0.5)[0], 0.0);
    assert_eq!(s.sample_bilinear(1.5, 0.5)[0], 1.0);
    assert!((s.sample_bilinear(1.0, 0.5)[0] - 0.5).abs() < 1e-6);
}

#[test]
fn slot_keys_partition_mode_and_local_layers() {
    let preview = SlotKey::new(RenderMode::Preview, "main");
    let export = SlotKey::new(RenderMode::Export, "main");
    assert_ne!(preview, export);
    assert_eq!(preview.local("a1").to_string(), "preview:main:local:a1");
}

#[test]
fn quantize_handles_out_of_range_and_nan() {
    assert_eq!(quantize_u8(-1.0), 0);
    assert_eq!(quantize_u8(2.0), 255);
    assert_eq!(quantize_u8(f32::NAN), 0);
    assert_eq!(quantize_u8(0.5), 128);
}
