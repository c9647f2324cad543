use super::*;

#[test]
fn start_message_uses_type_tag_and_camel_case() {
    let json = r#"{
        "type": "start",
        "payload": {
            "taskId": "t1",
            "source": { "kind": "bytes", "data": [1, 2, 3] },
            "outputType": "image/png",
            "maxDimension": 640,
            "exportSeed": 7,
            "renderer": "cpu"
        }
    }"#;
    let WorkerRequest::Start { payload } = serde_json::from_str(json).unwrap();
    assert_eq!(payload.task_id, "t1");
    assert_eq!(payload.renderer, Some(BackendChoice::Cpu));
    assert_eq!(payload.quality, None);

    let export = payload.into_export(CancellationToken::new());
    assert_eq!(export.mime, "image/png");
    assert_eq!(export.render.mode, RenderMode::Export);
    assert!(export.render.strict_errors);
    assert_eq!(export.render.export_seed, Some(7));
    assert_eq!(
        export.render.target_size,
        TargetSize::MaxDimension { max: 640 }
    );
}

#[test]
fn responses_serialize_with_flat_fields() {
    let progress = WorkerResponse::Progress {
        task_id: "t1".into(),
        progress: 0.5,
        stage: ExportStage::Render,
    };
    let v = serde_json::to_value(&progress).unwrap();
    assert_eq!(v["type"], "progress");
    assert_eq!(v["taskId"], "t1");
    assert_eq!(v["stage"], "render");
    assert!(!progress.is_terminal());

    let error = WorkerResponse::Error {
        task_id: "t1".into(),
        message: "boom".into(),
    };
    let v = serde_json::to_value(&error).unwrap();
    assert_eq!(v["type"], "error");
    assert_eq!(v["message"], "boom");
    assert!(error.is_terminal());
    assert_eq!(error.task_id(), "t1");
}

#[test]
fn zero_max_dimension_keeps_source_size() {
    let payload = StartPayload {
        task_id: "t".into(),
        source: SourceInput::bytes(vec![0u8]),
        output_type: "image/jpeg".into(),
        quality: Some(80),
        max_dimension: Some(0),
        adjustments: EditingAdjustments::default(),
        film_profile: None,
        seed_key: None,
        seed_salt: None,
        export_seed: None,
        renderer: None,
    };
    let export = payload.into_export(CancellationToken::new());
    assert_eq!(export.render.target_size, TargetSize::Source);
    assert_eq!(export.quality, Some(80));
}
