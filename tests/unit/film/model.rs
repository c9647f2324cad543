use super::*;

#[test]
fn modules_serialize_in_canonical_order() {
    let p = FilmProfile::default();
    let v = serde_json::to_value(&p).unwrap();
    let ids: Vec<&str> = v["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, FilmModule::IDS);
}

#[test]
fn missing_modules_are_filled_with_defaults() {
    let p: FilmProfile = serde_json::from_str(
        r#"{"id":"x","modules":[{"id":"grain","amount":40,"params":{"amount":0.5}}]}"#,
    )
    .unwrap();
    assert_eq!(p.version, 1);
    assert_eq!(p.modules.grain.amount, 40.0);
    assert_eq!(p.modules.grain.params.amount, 0.5);
    assert_eq!(p.modules.grain.params.size, 1.0);
    assert_eq!(p.modules.scan.params.halation_threshold, 0.9);
    assert!(p.modules.tone.enabled);
}

#[test]
fn input_dispatches_on_version() {
    let v1: FilmProfileInput = serde_json::from_str(r#"{"id":"a","modules":[]}"#).unwrap();
    assert!(matches!(v1, FilmProfileInput::V1(_)));
    let v2: FilmProfileInput =
        serde_json::from_str(r#"{"id":"b","version":2,"lut":{"path":"x.png"}}"#).unwrap();
    match v2 {
        FilmProfileInput::V2(p) => {
            assert_eq!(p.lut.map(|l| l.size), Some(8));
            assert_eq!(p.tone_response.shoulder, ToneResponse::DEFAULT_SHOULDER);
        }
        FilmProfileInput::V1(_) => panic!("expected v2"),
    }
    let err = serde_json::from_str::<FilmProfileInput>(r#"{"version":7}"#).unwrap_err();
    assert!(err.to_string().contains("unsupported film profile version 7"));
}

#[test]
fn profile_mode_uses_wire_names() {
    assert_eq!(
        serde_json::to_string(&ProfileMode::LegacyV1).unwrap(),
        "\"legacy-v1\""
    );
    assert_eq!(serde_json::to_string(&ProfileMode::V2).unwrap(), "\"v2\"");
}

#[test]
fn strength_is_zero_when_disabled() {
    let mut m = FilmModuleConfig::<GrainParams> {
        amount: 50.0,
        ..FilmModuleConfig::default()
    };
    assert_eq!(m.strength(), 0.5);
    m.enabled = false;
    assert_eq!(m.strength(), 0.0);
}
