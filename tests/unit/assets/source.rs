use super::*;

fn surface(w: u32, h: u32) -> Surface {
    Surface::new(w, h)
}

#[test]
fn lru_evicts_oldest_untouched_entry() {
    let mut c = BitmapCache::new(2, usize::MAX);
    drop(c.insert("a".into(), surface(1, 1)));
    drop(c.insert("b".into(), surface(1, 1)));
    assert!(c.get("a").is_some());
    drop(c.insert("c".into(), surface(1, 1)));
    assert!(c.get("b").is_none());
    assert!(c.get("a").is_some());
    assert!(c.get("c").is_some());
    assert_eq!(c.stats().evictions, 1);
}

#[test]
fn byte_budget_evicts_but_keeps_newest() {
    let one = surface(4, 4).byte_len();
    let mut c = BitmapCache::new(8, one);
    drop(c.insert("a".into(), surface(4, 4)));
    drop(c.insert("b".into(), surface(4, 4)));
    assert_eq!(c.stats().entries, 1);
    assert!(c.get("b").is_some());

    drop(c.insert("huge".into(), surface(64, 64)));
    assert_eq!(c.stats().entries, 1);
    assert!(c.get("huge").is_some());
}

#[test]
fn leased_bitmap_survives_eviction_until_released() {
    let mut c = BitmapCache::new(1, usize::MAX);
    let lease = c.insert("a".into(), surface(2, 2));
    drop(c.insert("b".into(), surface(1, 1)));

    let st = c.stats();
    assert_eq!(st.evictions, 1);
    assert_eq!(st.deferred_releases, 1);
    assert_eq!(c.pending_len(), 1);
    assert_eq!(lease.width, 2);

    assert_eq!(c.reap(), 0);
    drop(lease);
    assert_eq!(c.reap(), 1);
    assert_eq!(c.pending_len(), 0);
}

#[test]
fn insert_of_existing_key_returns_cached_lease() {
    let mut c = BitmapCache::new(4, usize::MAX);
    let a = c.insert("k".into(), surface(2, 2));
    let b = c.insert("k".into(), surface(9, 9));
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn loader_decodes_once_per_key() {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    let input = SourceInput::bytes(buf);
    let key = input.cache_key(None).unwrap();

    let loader = SourceLoader::new(4, usize::MAX);
    let cancel = CancellationToken::new();
    let a = loader.load(&input, &key, &cancel).unwrap();
    let b = loader.load(&input, &key, &cancel).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    let st = loader.stats();
    assert_eq!((st.hits, st.misses), (1, 1));
}

#[test]
fn cancelled_load_aborts_before_decoding() {
    let loader = SourceLoader::new(4, usize::MAX);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = loader
        .load(&SourceInput::bytes(vec![1u8, 2, 3]), "k", &cancel)
        .unwrap_err();
    assert!(err.is_abort());
}

#[test]
fn path_key_tracks_missing_files_as_decode_errors() {
    let input = SourceInput::path("/definitely/not/here.png");
    assert!(matches!(input.cache_key(None), Err(FilmError::Decode(_))));
    assert_eq!(
        input.cache_key(Some("asset-9")).unwrap(),
        "src:k#asset-9"
    );
}
