use super::*;

#[test]
fn identity_lut_samples_back_its_input() {
    let lut = HaldLut::identity(4).unwrap();
    for rgb in [[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [0.2, 0.55, 0.9], [0.33, 0.1, 0.7]] {
        let out = lut.sample(rgb);
        for c in 0..3 {
            assert!((out[c] - rgb[c]).abs() < 1e-5, "{rgb:?} -> {out:?}");
        }
    }
}

#[test]
fn hald_layout_is_red_fastest() {
    let lut = HaldLut::identity(2).unwrap();
    let img = lut.to_rgba_image();
    assert_eq!(img.dimensions(), (8, 8));
    // Index 1 is (r=1, g=0, b=0) on a 4-entry axis.
    assert_eq!(img.get_pixel(1, 0).0, [85, 0, 0, 255]);
    // Index 4 is (r=0, g=1, b=0).
    assert_eq!(img.get_pixel(4, 0).0, [0, 85, 0, 255]);
    // Index 16 is (r=0, g=0, b=1), the third row.
    assert_eq!(img.get_pixel(0, 2).0, [0, 0, 85, 255]);
}

#[test]
fn png_roundtrip_preserves_quantized_entries() {
    let lut = generate_stock_lut("portra400", 4).unwrap().unwrap();
    let decoded = HaldLut::decode(&lut.encode_png().unwrap()).unwrap();
    assert_eq!(decoded.level(), 4);
    assert_eq!(decoded, lut);
}

#[test]
fn non_hald_images_are_rejected() {
    assert!(HaldLut::from_rgba8(10, 10, &[0; 400]).is_err());
    assert!(HaldLut::from_rgba8(8, 4, &[0; 128]).is_err());
}

#[test]
fn stock_grades_have_their_character() {
    let mid = [0.5, 0.5, 0.5];
    let portra = generate_stock_lut("portra400", 4).unwrap().unwrap().sample(mid);
    assert!(portra[0] > portra[2], "portra should warm greys: {portra:?}");

    let cinestill = generate_stock_lut("cinestill800t", 4)
        .unwrap()
        .unwrap()
        .sample([0.1, 0.1, 0.1]);
    assert!(cinestill[2] > cinestill[0], "cinestill shadows lean teal: {cinestill:?}");

    let trix = generate_stock_lut("trix400", 4).unwrap().unwrap().sample([0.9, 0.1, 0.2]);
    assert!((trix[0] - trix[1]).abs() < 0.03 && (trix[1] - trix[2]).abs() < 0.03);

    assert!(generate_stock_lut("kodachrome", 4).is_none());
}

#[test]
fn cache_generates_stock_paths_without_a_source() {
    let mut cache = LutCache::new(None, 2);
    let a = cache.get("luts/stocks/velvia50.png").unwrap();
    let b = cache.get("/luts/stocks/velvia50.png").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.len(), 1);
    assert!(cache.get("/luts/custom/missing.png").is_err());
}

#[test]
fn cache_prefers_source_files_and_evicts_lru() {
    let mut mem = MemoryLutSource::new();
    let identity = HaldLut::identity(2).unwrap();
    mem.insert("/luts/stocks/trix400.png", identity.encode_png().unwrap());
    mem.insert("a.png", identity.encode_png().unwrap());
    mem.insert("b.png", identity.encode_png().unwrap());
    let mut cache = LutCache::new(Some(Box::new(mem)), 2);

    let trix = cache.get("/luts/stocks/trix400.png").unwrap();
    assert_eq!(trix.level(), 2);
    cache.get("/a.png").unwrap();
    cache.get("/b.png").unwrap();
    assert_eq!(cache.len(), 2);
}

#[test]
fn dir_source_rejects_parent_components() {
    let src = DirLutSource::new(std::env::temp_dir());
    assert!(src.load("/../etc/passwd").is_err());
    assert!(src.load("/definitely-missing-filmlab.png").unwrap().is_none());
}
