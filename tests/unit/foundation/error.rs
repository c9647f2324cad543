use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        FilmError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(FilmError::decode("x").to_string().contains("decode error:"));
    assert!(FilmError::encode("x").to_string().contains("encode error:"));
    assert!(
        FilmError::context_unavailable("no adapter")
            .to_string()
            .contains("render context unavailable:")
    );
    assert_eq!(FilmError::Abort.to_string(), "render aborted");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = FilmError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn stage_wrapping_keeps_cause_chain() {
    let err = FilmError::stage(
        RenderStage::Detail,
        FilmError::validation("blur radius overflow"),
    );
    assert_eq!(err.failed_stage(), Some(RenderStage::Detail));
    let source = std::error::Error::source(&err).map(|s| s.to_string());
    assert_eq!(
        source.as_deref(),
        Some("validation error: blur radius overflow")
    );
}

#[test]
fn stage_wrapping_never_hides_abort() {
    let err = FilmError::stage(RenderStage::Film, FilmError::Abort);
    assert!(err.is_abort());
}

#[test]
fn context_unavailable_is_detected_through_stage_wrapper() {
    let err = FilmError::stage(
        RenderStage::Upload,
        FilmError::context_unavailable("adapter lost"),
    );
    assert!(err.is_context_unavailable());
    assert!(!FilmError::validation("x").is_context_unavailable());
}
