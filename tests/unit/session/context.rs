use super::*;

fn request() -> RenderRequest {
    RenderRequest::new(SourceInput::bytes(vec![1u8, 2, 3]), EditingAdjustments::default())
}

#[test]
fn locked_seed_is_the_module_seed() {
    let req = request();
    assert_eq!(module_seed(&req, "src:a", "grain", SeedMode::Locked, 42), 42);
}

#[test]
fn per_asset_seeds_follow_key_and_salt() {
    let mut req = request();
    let a = module_seed(&req, "src:a", "grain", SeedMode::PerAsset, 0);
    assert_eq!(a, module_seed(&req, "src:a", "grain", SeedMode::PerAsset, 0));
    assert_ne!(a, module_seed(&req, "src:b", "grain", SeedMode::PerAsset, 0));
    assert_ne!(a, module_seed(&req, "src:a", "defects", SeedMode::PerAsset, 0));

    req.seed_salt = Some("roll-2".into());
    assert_ne!(a, module_seed(&req, "src:a", "grain", SeedMode::PerAsset, 0));

    req.seed_key = Some("asset-7".into());
    let keyed = module_seed(&req, "src:a", "grain", SeedMode::PerAsset, 0);
    assert_eq!(keyed, module_seed(&req, "src:b", "grain", SeedMode::PerAsset, 0));
}

#[test]
fn explicit_render_and_export_seeds_are_reproducible() {
    let mut req = request();
    req.render_seed = Some(9);
    let r = module_seed(&req, "k", "grain", SeedMode::PerRender, 0);
    assert_eq!(r, module_seed(&req, "k", "grain", SeedMode::PerRender, 0));

    req.mode = RenderMode::Export;
    req.export_seed = Some(9);
    let e = module_seed(&req, "k", "grain", SeedMode::PerExport, 0);
    assert_eq!(e, module_seed(&req, "k", "grain", SeedMode::PerExport, 0));
}

#[test]
fn per_render_exports_fall_back_to_the_export_seed() {
    let mut req = request();
    req.mode = RenderMode::Export;
    req.export_seed = Some(7);
    let a = module_seed(&req, "k", "grain", SeedMode::PerRender, 0);
    assert_eq!(a, module_seed(&req, "k", "grain", SeedMode::PerRender, 0));

    req.render_seed = Some(7);
    assert_eq!(a, module_seed(&req, "k", "grain", SeedMode::PerRender, 0));
    req.render_seed = Some(8);
    assert_ne!(a, module_seed(&req, "k", "grain", SeedMode::PerRender, 0));
}

#[test]
fn per_export_is_stable_in_preview() {
    let req = request();
    assert_eq!(
        module_seed(&req, "k", "grain", SeedMode::PerExport, 0),
        module_seed(&req, "k", "grain", SeedMode::PerAsset, 0),
    );
}

#[test]
fn error_log_collapses_repeats() {
    let mut log = ErrorLog::default();
    assert!(log.admit("boom", true));
    assert!(!log.admit("boom", true));
    assert!(!log.admit("boom", true));
    assert_eq!(log.repeats, 2);
    assert!(log.admit("other", true));
    assert_eq!(log.repeats, 0);
    assert!(log.admit("other", false));
}

#[test]
fn export_mode_is_always_strict() {
    let mut req = request();
    assert!(!req.is_strict());
    req.mode = RenderMode::Export;
    assert!(req.is_strict());
    assert_eq!(req.slot_key().to_string(), "export:main");
}

#[test]
fn interactive_previews_use_the_preview_cap() {
    let ctx = RendererContext::new(RendererOpts {
        backend: crate::config::BackendChoice::Cpu,
        preview_max_dimension: 512,
        export_max_dimension: 0,
        ..RendererOpts::default()
    });
    let mut req = request();
    assert_eq!(ctx.max_dimension(&req), 512);
    req.quality = QualityProfile::Full;
    assert_eq!(ctx.max_dimension(&req), 0);
    req.quality = QualityProfile::Interactive;
    req.mode = RenderMode::Export;
    assert_eq!(ctx.max_dimension(&req), 0);
}

#[test]
fn disposed_context_refuses_work() {
    let ctx = RendererContext::new(RendererOpts {
        backend: crate::config::BackendChoice::Cpu,
        ..RendererOpts::default()
    });
    ctx.dispose();
    let mut canvas = Canvas::default();
    let err = ctx.render_to_canvas(&request(), &mut canvas).unwrap_err();
    assert!(err.is_context_unavailable());
}

#[test]
fn forgotten_sources_decode_again() {
    let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([40, 80, 120, 255]));
    let mut png = std::io::Cursor::new(Vec::new());
    img.write_to(&mut png, image::ImageFormat::Png).unwrap();
    let ctx = RendererContext::new(RendererOpts {
        backend: crate::config::BackendChoice::Cpu,
        ..RendererOpts::default()
    });
    let mut req = RenderRequest::new(
        SourceInput::bytes(png.into_inner()),
        EditingAdjustments::default(),
    );
    req.source_cache_key = Some("asset-1".into());
    let mut canvas = Canvas::default();
    ctx.render_to_canvas(&req, &mut canvas).unwrap();
    assert_eq!(ctx.stats().source_cache.entries, 1);

    ctx.forget_source("asset-1");
    let stats = ctx.stats().source_cache;
    assert_eq!((stats.entries, stats.deferred_releases), (0, 1));

    ctx.dispose_slot(RenderMode::Preview, DEFAULT_SLOT);
    assert_eq!(ctx.stats().source_cache.released, 1);
}

#[test]
fn exports_release_their_slot_caches() {
    let img = image::RgbaImage::from_pixel(6, 4, image::Rgba([200, 120, 40, 255]));
    let mut png = std::io::Cursor::new(Vec::new());
    img.write_to(&mut png, image::ImageFormat::Png).unwrap();
    let ctx = RendererContext::new(RendererOpts {
        backend: crate::config::BackendChoice::Cpu,
        ..RendererOpts::default()
    });
    let mut adjustments = EditingAdjustments::default();
    adjustments.exposure = 10.0;
    adjustments.local_adjustments.push(LocalAdjustment {
        id: "sky".into(),
        adjustments: crate::adjust::model::LocalDelta {
            exposure: 20.0,
            ..Default::default()
        },
        ..LocalAdjustment::default()
    });
    let mut render = RenderRequest::new(SourceInput::bytes(png.into_inner()), adjustments);
    render.render_slot = Some("worker".into());
    let blob = ctx
        .render_image_to_blob(&ExportRequest {
            render: render.clone(),
            mime: "image/png".into(),
            quality: None,
        })
        .unwrap();
    assert!(!blob.is_empty());
    assert_eq!(ctx.slot_count(RenderMode::Export), 0);

    render.mode = RenderMode::Preview;
    let mut canvas = Canvas::default();
    ctx.render_to_canvas(&render, &mut canvas).unwrap();
    assert!(ctx.slot_count(RenderMode::Preview) > 0);
    assert_eq!(ctx.slot_count(RenderMode::Export), 0);
}
