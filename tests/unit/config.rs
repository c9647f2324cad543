use super::*;

#[test]
fn defaults_are_already_sane() {
    let mut opts = RendererOpts::default();
    assert!(opts.sanitize().is_empty());
}

#[test]
fn partial_json_fills_defaults() {
    let opts: RendererOpts =
        serde_json::from_str(r#"{"backend":"cpu","previewMaxDimension":512}"#).unwrap();
    assert_eq!(opts.backend, BackendChoice::Cpu);
    assert_eq!(opts.preview_max_dimension, 512);
    assert_eq!(opts.max_texture_size, RendererOpts::default().max_texture_size);
}

#[test]
fn sanitize_clamps_and_reports() {
    let mut opts = RendererOpts {
        max_texture_size: 10,
        source_cache_entries: 0,
        default_jpeg_quality: 0,
        ..RendererOpts::default()
    };
    let warnings = opts.sanitize();
    assert_eq!(opts.max_texture_size, 256);
    assert_eq!(opts.source_cache_entries, 1);
    assert_eq!(opts.default_jpeg_quality, 1);
    assert!(opts.preview_max_dimension <= opts.max_texture_size);
    assert!(warnings.len() >= 3);
}

#[test]
fn load_reads_explicit_file_and_collects_warnings() {
    let dir = std::env::temp_dir().join(format!("filmlab-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("opts.json");
    std::fs::write(&path, r#"{"defaultJpegQuality":0,"dedupeErrors":false}"#).unwrap();

    let handle = load_opts(Some(&path));
    assert!(handle.source.is_some());
    assert!(!handle.opts.dedupe_errors);
    assert_eq!(handle.opts.default_jpeg_quality, 1);
    assert_eq!(handle.warnings.len(), 1);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn load_falls_back_to_defaults_on_parse_error() {
    let dir = std::env::temp_dir().join(format!("filmlab-config-bad-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("opts.json");
    std::fs::write(&path, "{ not json").unwrap();

    let handle = load_opts(Some(&path));
    assert!(handle.source.is_none());
    assert_eq!(handle.opts, RendererOpts::default());
    assert!(handle.warnings[0].contains("failed to parse"));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_explicit_file_is_reported() {
    let path = std::env::temp_dir().join("filmlab-config-missing/none.json");
    let handle = load_opts(Some(&path));
    assert!(handle.source.is_none());
    assert_eq!(handle.opts, RendererOpts::default());
    assert!(handle.warnings[0].contains("not found"));
}
